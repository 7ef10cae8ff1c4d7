//! The subset of the workflow event payload the trigger reads.
//!
//! The runner writes the full webhook payload to `$GITHUB_EVENT_PATH`; only
//! `repository.url` is needed.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EventPayload {
    pub repository: Option<EventRepository>,
}

#[derive(Debug, Deserialize)]
pub struct EventRepository {
    pub url: Option<String>,
}

impl EventPayload {
    /// Reads and parses the payload file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event payload at {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse event payload at {}", path.display()))
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.repository
            .as_ref()
            .and_then(|r| r.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}
