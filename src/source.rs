//! Update sources feeding refresh cycles
//!
//! Fetching and diffing live pages happens outside this crate. A source only
//! hands over the resulting `Website` records for one cycle.

use crate::errors::{MonitorError, Result};
use crate::model::Website;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Producer of website records for a refresh cycle
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn fetch_updates(&self) -> Result<Vec<Website>>;
}

/// Source that hands out a fixed list of records every cycle
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    websites: Vec<Website>,
}

impl StaticSource {
    pub fn new(websites: Vec<Website>) -> Self {
        Self { websites }
    }
}

#[async_trait]
impl UpdateSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_updates(&self) -> Result<Vec<Website>> {
        Ok(self.websites.clone())
    }
}

/// Source reading a JSON array of website records written by an external
/// fetch/diff worker.
///
/// A whole snapshot document (`{"websites": [...], "lastUpdate": ...}`) is
/// accepted too; only its websites are used.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum UpdateDocument {
    List(Vec<Website>),
    Snapshot { websites: Vec<Website> },
}

/// Parse the body of an update feed
pub fn parse_updates(body: &str) -> Result<Vec<Website>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: UpdateDocument = serde_json::from_str(body)?;
    Ok(match document {
        UpdateDocument::List(websites) => websites,
        UpdateDocument::Snapshot { websites } => websites,
    })
}

#[async_trait]
impl UpdateSource for JsonFileSource {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn fetch_updates(&self) -> Result<Vec<Website>> {
        let body = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            MonitorError::Source(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        let websites = parse_updates(&body)?;
        debug!(
            "Read {} website records from {}",
            websites.len(),
            self.path.display()
        );

        Ok(websites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WebsiteStatus;
    use std::io::Write;

    const FEED: &str = r#"[
        {
            "url": "https://www.fibonacciskills.com",
            "status": "changed",
            "lastChecked": "2024-11-02T12:30:00Z",
            "changeHistory": [{"date": "2024-11-02T12:30:00Z", "type": "Content Update"}]
        },
        {
            "url": "https://www.cde.ca.gov/sp/cd/re/psframework.asp",
            "status": "unchanged",
            "lastChecked": "2024-11-02T12:30:00Z"
        }
    ]"#;

    #[test]
    fn test_parse_list() {
        let websites = parse_updates(FEED).unwrap();
        assert_eq!(websites.len(), 2);
        assert_eq!(websites[0].status, WebsiteStatus::Changed);
        assert_eq!(websites[0].change_history[0].change_type, "Content Update");
        assert!(websites[1].change_history.is_empty());
    }

    #[test]
    fn test_parse_snapshot_document() {
        let body = format!(r#"{{"websites": {}, "lastUpdate": "2024-11-02T12:30:00Z"}}"#, FEED);
        assert_eq!(parse_updates(&body).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert!(parse_updates("  ").unwrap().is_empty());
        assert!(matches!(parse_updates("{oops"), Err(MonitorError::Json(_))));
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticSource::new(parse_updates(FEED).unwrap());
        assert_eq!(source.fetch_updates().await.unwrap().len(), 2);
        assert_eq!(source.name(), "static");
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FEED.as_bytes()).unwrap();

        let source = JsonFileSource::new(file.path());
        let websites = source.fetch_updates().await.unwrap();
        assert_eq!(websites.len(), 2);
        assert_eq!(websites[0].url, "https://www.fibonacciskills.com");
    }

    #[tokio::test]
    async fn test_json_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileSource::new(dir.path().join("missing.json"));

        let result = source.fetch_updates().await;
        assert!(matches!(result, Err(MonitorError::Source(_))));
    }
}
