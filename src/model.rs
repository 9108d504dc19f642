//! Monitoring data structures: tracked websites, their change history and the
//! whole-store snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a website's content relative to its last known state.
///
/// Values outside the known set are kept verbatim in `Unrecognized` so that a
/// record from a misbehaving fetcher is never dropped. Display logic should go
/// through [`WebsiteStatus::effective`], which folds them into `Uncertain`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebsiteStatus {
    Unchanged,
    Changed,
    Uncertain,
    Unrecognized(String),
}

impl WebsiteStatus {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, WebsiteStatus::Unrecognized(_))
    }

    /// Status used for icons and grouping; anything unrecognized is uncertain.
    pub fn effective(&self) -> WebsiteStatus {
        match self {
            WebsiteStatus::Unrecognized(_) => WebsiteStatus::Uncertain,
            known => known.clone(),
        }
    }

    /// Human readable label shown next to the status icon.
    pub fn label(&self) -> &'static str {
        match self {
            WebsiteStatus::Changed => "Changed",
            WebsiteStatus::Unchanged => "Unchanged",
            WebsiteStatus::Uncertain => "Uncertain",
            WebsiteStatus::Unrecognized(_) => "Unknown",
        }
    }

    /// Wire value, as stored in the snapshot.
    pub fn as_str(&self) -> &str {
        match self {
            WebsiteStatus::Changed => "changed",
            WebsiteStatus::Unchanged => "unchanged",
            WebsiteStatus::Uncertain => "uncertain",
            WebsiteStatus::Unrecognized(raw) => raw,
        }
    }
}

impl Default for WebsiteStatus {
    fn default() -> Self {
        WebsiteStatus::Unrecognized(String::new())
    }
}

impl std::fmt::Display for WebsiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for WebsiteStatus {
    fn from(s: &str) -> Self {
        match s {
            "changed" => WebsiteStatus::Changed,
            "unchanged" => WebsiteStatus::Unchanged,
            "uncertain" => WebsiteStatus::Uncertain,
            _ => WebsiteStatus::Unrecognized(s.to_string()),
        }
    }
}

impl From<String> for WebsiteStatus {
    fn from(s: String) -> Self {
        WebsiteStatus::from(s.as_str())
    }
}

impl From<WebsiteStatus> for String {
    fn from(status: WebsiteStatus) -> Self {
        match status {
            WebsiteStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// One detected content change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub change_type: String,
}

impl ChangeEvent {
    pub fn new(date: DateTime<Utc>, change_type: impl Into<String>) -> Self {
        Self {
            date,
            change_type: change_type.into(),
        }
    }
}

/// One tracked target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub url: String,
    #[serde(default)]
    pub status: WebsiteStatus,
    pub last_checked: DateTime<Utc>,
    #[serde(default)]
    pub change_history: Vec<ChangeEvent>,
}

impl Website {
    pub fn new(url: impl Into<String>, status: WebsiteStatus, last_checked: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            status,
            last_checked,
            change_history: Vec::new(),
        }
    }

    pub fn with_change(mut self, event: ChangeEvent) -> Self {
        self.change_history.push(event);
        self
    }

    pub fn with_changes(mut self, events: impl IntoIterator<Item = ChangeEvent>) -> Self {
        self.change_history.extend(events);
        self
    }

    /// Most recently recorded change, if any.
    pub fn latest_change(&self) -> Option<&ChangeEvent> {
        self.change_history.last()
    }
}

/// The whole monitoring state as seen by readers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSnapshot {
    pub websites: Vec<Website>,
    pub last_update: DateTime<Utc>,
}

impl MonitoringSnapshot {
    pub fn empty(last_update: DateTime<Utc>) -> Self {
        Self {
            websites: Vec::new(),
            last_update,
        }
    }

    pub fn get(&self, url: &str) -> Option<&Website> {
        self.websites.iter().find(|w| w.url == url)
    }

    pub fn len(&self) -> usize {
        self.websites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.websites.is_empty()
    }
}
