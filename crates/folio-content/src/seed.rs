//! Built-in seed content
//!
//! The tree a store starts from (and returns to on reset) when no seed file
//! is configured.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::tree::{ContentTree, TreeError};

/// Default portfolio content with every known section present
#[must_use]
pub fn default_seed() -> ContentTree {
    let value = json!({
        "personalInfo": {
            "name": {"first": "Alex", "last": "Morgan"},
            "email": "hello@example.com",
            "tagline": "Software Engineer"
        },
        "socialLinks": [],
        "navigation": [
            {"id": "about", "label": "About"},
            {"id": "skills", "label": "Skills"},
            {"id": "projects", "label": "Projects"},
            {"id": "experience", "label": "Experience"},
            {"id": "certifications", "label": "Certifications"},
            {"id": "contact", "label": "Contact"}
        ],
        "hero": {
            "title": {"first": "Alex", "last": "Morgan"},
            "description": "I build reliable systems and the tools around them.",
            "buttons": {
                "primary": {"text": "Get in touch", "action": "contact"},
                "secondary": {"text": "See projects", "action": "projects"}
            }
        },
        "about": {
            "title": "About Me",
            "description": "",
            "secondParagraph": "",
            "kpiCards": [],
            "keyTechnologies": [],
            "education": []
        },
        "skills": {"title": "Skills", "categories": []},
        "projects": {"title": "Projects", "filterCategories": [], "projects": []},
        "experience": {"title": "Experience", "experiences": []},
        "certifications": {"title": "Certifications", "certifications": []},
        "contact": {
            "title": "Contact",
            "subtitle": "Get in touch",
            "description": "",
            "bulletPoints": [],
            "email": "hello@example.com",
            "emailCard": {"title": "Email Me"},
            "form": {
                "title": "Send a message",
                "fields": {
                    "firstName": {"label": "First Name", "placeholder": "John"},
                    "lastName": {"label": "Last Name", "placeholder": "Doe"},
                    "email": {"label": "Email", "placeholder": "john@example.com"},
                    "subject": {"label": "Subject", "placeholder": "Hello"},
                    "message": {"label": "Message", "placeholder": "Your message"}
                },
                "submitButton": {"text": "Send"}
            }
        }
    });

    ContentTree::try_from(value).unwrap_or_default()
}

/// Read a seed tree from a JSON file
///
/// # Errors
/// Returns error if the file cannot be read or does not hold a JSON object
pub fn load_seed(path: impl AsRef<Path>) -> Result<ContentTree, SeedError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ContentTree::from_json(&text).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Errors loading a seed file
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: TreeError,
    },
}
