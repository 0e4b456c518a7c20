use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use folio_content::{ContentNode, ContentPath, ContentTree};
use folio_store::{iso8601, ContentSession, FolioConfig, SystemClock};

use crate::Command;

pub(crate) async fn run(config_path: &Path, command: Command) -> anyhow::Result<()> {
    let config = FolioConfig::load_or_default(config_path)?;
    let session = ContentSession::from_config(&config, Arc::new(SystemClock))?;
    session.open().await;

    match command {
        Command::Show { path } => show(&session.store().current(), path.as_deref()),
        Command::Set { path, value } => {
            let path = ContentPath::parse(&path)?;
            session.store().update_at(&path, parse_value(&value));
            session.save_local().await?;
            tracing::info!(%path, "value saved");
            Ok(())
        }
        Command::Reset => {
            session.reset();
            session.clear_local().await?;
            println!("content reset to seed");
            Ok(())
        }
        Command::Export { out } => {
            let blob = session.export()?;
            match out {
                Some(file) => std::fs::write(&file, blob)
                    .with_context(|| format!("failed to write {}", file.display()))?,
                None => println!("{blob}"),
            }
            Ok(())
        }
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            session.import(&raw)?;
            session.save_local().await?;
            println!("imported {}", file.display());
            Ok(())
        }
        Command::Push => {
            let at = session.push().await?;
            println!("pushed at {}", iso8601(at));
            Ok(())
        }
        Command::Pull => {
            if session.pull().await? {
                session.save_local().await?;
                println!("pulled remote content");
            } else {
                println!("no remote content");
            }
            Ok(())
        }
        Command::Watch => watch(&session).await,
        Command::Sections => {
            let tree = session.store().current();
            for name in tree.section_names() {
                println!("{name}");
            }
            for missing in tree.missing_sections() {
                println!("missing: {missing}");
            }
            Ok(())
        }
    }
}

fn show(tree: &ContentTree, path: Option<&str>) -> anyhow::Result<()> {
    let rendered = match path {
        None => tree.to_json_pretty()?,
        Some(raw) => {
            let path = ContentPath::parse(raw)?;
            let node = tree
                .get(&path)
                .with_context(|| format!("nothing at {path}"))?;
            serde_json::to_string_pretty(node)?
        }
    };
    println!("{rendered}");
    Ok(())
}

async fn watch(session: &ContentSession) -> anyhow::Result<()> {
    let store = Arc::clone(session.store());
    let _changes = store.subscribe(|tree| {
        println!("{} sections, fingerprint {}", tree.len(), tree.fingerprint().short());
    });
    let (failed_tx, failed_rx) = tokio::sync::oneshot::channel();
    let _remote = session.watch_remote(move |err| {
        let _ = failed_tx.send(err);
    })?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok(())
        }
        Ok(err) = failed_rx => Err(err.into()),
    }
}

/// JSON when it parses, otherwise the raw text as a string
fn parse_value(raw: &str) -> ContentNode {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(ContentNode::from)
        .unwrap_or_else(|_| ContentNode::from(raw))
}
