//! Change notification text for a refresh cycle

use crate::model::MonitoringSnapshot;
use crate::refresh::RefreshReport;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DIGEST_SUBJECT: &str = "Website Changes Detected";

/// One changed website in a digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestEntry {
    pub url: String,
    pub change_type: Option<String>,
    pub detected_at: Option<DateTime<Utc>>,
}

/// Notification for the websites that changed during one refresh cycle.
/// Rendering only; delivery is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeDigest {
    pub recipient: Option<String>,
    pub subject: String,
    pub entries: Vec<DigestEntry>,
}

impl ChangeDigest {
    /// Build a digest for `report`, or `None` when nothing changed.
    pub fn from_report(
        report: &RefreshReport,
        snapshot: &MonitoringSnapshot,
        recipient: Option<String>,
    ) -> Option<Self> {
        if !report.has_changes() {
            return None;
        }

        let entries = report
            .outcome
            .changed_urls
            .iter()
            .map(|url| {
                let latest = snapshot.get(url).and_then(|w| w.latest_change());
                DigestEntry {
                    url: url.clone(),
                    change_type: latest.map(|e| e.change_type.clone()),
                    detected_at: latest.map(|e| e.date),
                }
            })
            .collect();

        Some(Self {
            recipient,
            subject: DIGEST_SUBJECT.to_string(),
            entries,
        })
    }

    pub fn body(&self) -> String {
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|entry| match (&entry.change_type, entry.detected_at) {
                (Some(kind), Some(at)) => {
                    format!("{} ({} at {})", entry.url, kind, at.to_rfc3339())
                }
                _ => entry.url.clone(),
            })
            .collect();

        format!(
            "The following websites have changed since the last scan:\n\n{}",
            lines.join("\n")
        )
    }
}
