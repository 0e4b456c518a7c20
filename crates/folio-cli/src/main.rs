//! `folio`: edit, save, export and sync portfolio content from the shell

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use folio_store::DEFAULT_CONFIG_FILE;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "FOLIO_LOG";

#[derive(Debug, Parser)]
#[command(name = "folio", version)]
#[command(about = "Edit and sync portfolio content")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the whole tree, or the node at PATH
    Show { path: Option<String> },

    /// Write VALUE at PATH and save locally
    ///
    /// VALUE is parsed as JSON; anything that is not valid JSON is stored as
    /// a string.
    Set { path: String, value: String },

    /// Return to the seed and delete saved content
    Reset,

    /// Write an export blob to a file or stdout
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace content with an export blob and save locally
    Import { file: PathBuf },

    /// Push current content to the remote record
    Push,

    /// Replace content with the remote record and save locally
    Pull,

    /// Print each remote change until interrupted
    Watch,

    /// List top-level sections and which known ones are missing
    Sections,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    commands::run(&cli.config, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn config_defaults() {
        let cli = Cli::try_parse_from(["folio", "sections"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("folio.toml"));
        assert!(!cli.log_json);
        assert!(matches!(cli.command, Command::Sections));
    }

    #[test]
    fn set_takes_path_and_value() {
        let cli =
            Cli::try_parse_from(["folio", "--config", "x.toml", "set", "hero.title.first", "Ada"])
                .unwrap();
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        match cli.command {
            Command::Set { path, value } => {
                assert_eq!(path, "hero.title.first");
                assert_eq!(value, "Ada");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn export_out_flag() {
        let cli = Cli::try_parse_from(["folio", "export", "--out", "blob.json"]).unwrap();
        assert!(matches!(cli.command, Command::Export { out: Some(_) }));
    }

    #[test]
    fn subcommand_required() {
        assert!(Cli::try_parse_from(["folio"]).is_err());
    }
}
