//! Monitoring store: the single source of truth for tracked websites

use crate::errors::{MonitorError, Result};
use crate::model::{ChangeEvent, MonitoringSnapshot, Website, WebsiteStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handle for a refresh cycle that is currently in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
}

/// Summary of what a single `apply_update` call did to the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub updated: usize,
    pub inserted: usize,
    pub stale: usize,
    /// Known websites that recorded new change events or moved to `changed`.
    pub changed_urls: Vec<String>,
}

impl ApplyOutcome {
    pub fn total(&self) -> usize {
        self.updated + self.inserted + self.stale
    }
}

/// Holds the current snapshot plus the refreshing flag.
///
/// Writes take `&mut self`; callers sharing the store across tasks wrap it in
/// a lock (see [`crate::refresh::SharedStore`]) so a whole refresh cycle is
/// applied under one write.
#[derive(Debug)]
pub struct MonitoringStore {
    snapshot: MonitoringSnapshot,
    index: HashMap<String, usize>,
    refreshing: Option<RefreshTicket>,
}

impl MonitoringStore {
    /// Create an empty store
    pub fn new(last_update: DateTime<Utc>) -> Self {
        Self {
            snapshot: MonitoringSnapshot::empty(last_update),
            index: HashMap::new(),
            refreshing: None,
        }
    }

    /// Create a store from initial records. Duplicate URLs are merged with the
    /// same rules as `apply_update`.
    pub fn with_websites(
        websites: impl IntoIterator<Item = Website>,
        last_update: DateTime<Utc>,
    ) -> Self {
        let mut store = Self::new(last_update);
        let mut outcome = ApplyOutcome::default();
        for website in websites {
            store.apply_one(website, &mut outcome);
        }
        store
    }

    pub fn snapshot(&self) -> &MonitoringSnapshot {
        &self.snapshot
    }

    pub fn get(&self, url: &str) -> Option<&Website> {
        self.index.get(url).map(|&pos| &self.snapshot.websites[pos])
    }

    pub fn len(&self) -> usize {
        self.snapshot.websites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.websites.is_empty()
    }

    /// Apply a batch of website records, stamping `last_update` with the
    /// current time.
    pub fn apply_update(&mut self, updates: impl IntoIterator<Item = Website>) -> ApplyOutcome {
        self.apply_update_at(updates, Utc::now())
    }

    /// Apply a batch of website records and set `last_update` to `now` once
    /// every record has been merged.
    pub fn apply_update_at(
        &mut self,
        updates: impl IntoIterator<Item = Website>,
        now: DateTime<Utc>,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        for website in updates {
            self.apply_one(website, &mut outcome);
        }

        self.snapshot.last_update = now;

        info!(
            "Applied {} website records ({} updated, {} inserted, {} stale, {} changed)",
            outcome.total(),
            outcome.updated,
            outcome.inserted,
            outcome.stale,
            outcome.changed_urls.len()
        );

        outcome
    }

    fn apply_one(&mut self, website: Website, outcome: &mut ApplyOutcome) {
        let Website {
            url,
            status,
            last_checked,
            change_history,
        } = website;

        let existing = self.index.get(&url).copied();
        let Some(pos) = existing else {
            debug!("Tracking new website {}", url);
            self.index.insert(url.clone(), self.snapshot.websites.len());
            self.snapshot.websites.push(Website {
                url,
                status,
                last_checked,
                change_history,
            });
            outcome.inserted += 1;
            return;
        };

        let current = &mut self.snapshot.websites[pos];
        let added = merge_history(&mut current.change_history, change_history);
        let mut became_changed = false;

        if last_checked < current.last_checked {
            warn!(
                "Ignoring stale check for {} ({} is older than {})",
                url, last_checked, current.last_checked
            );
            outcome.stale += 1;
        } else {
            became_changed =
                status == WebsiteStatus::Changed && current.status != WebsiteStatus::Changed;
            current.status = status;
            current.last_checked = last_checked;
            outcome.updated += 1;
        }

        if added > 0 || became_changed {
            debug!("{} recorded {} new change events", url, added);
            if !outcome.changed_urls.contains(&url) {
                outcome.changed_urls.push(url);
            }
        }
    }

    /// Mark a refresh cycle as started. Only one cycle may run at a time.
    pub fn begin_refresh(&mut self) -> Result<RefreshTicket> {
        if let Some(active) = &self.refreshing {
            warn!(
                "Rejected refresh request, cycle {} still running since {}",
                active.cycle_id, active.started_at
            );
            return Err(MonitorError::RefreshInProgress);
        }

        let ticket = RefreshTicket {
            cycle_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        };
        debug!("Refresh cycle {} started", ticket.cycle_id);
        self.refreshing = Some(ticket.clone());

        Ok(ticket)
    }

    /// Clear the refreshing flag, returning the cycle that was running.
    pub fn end_refresh(&mut self) -> Option<RefreshTicket> {
        let ended = self.refreshing.take();
        match &ended {
            Some(ticket) => debug!("Refresh cycle {} ended", ticket.cycle_id),
            None => debug!("end_refresh called with no cycle running"),
        }
        ended
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.is_some()
    }

    pub fn current_refresh(&self) -> Option<&RefreshTicket> {
        self.refreshing.as_ref()
    }
}

/// Merge an incoming history into the stored one without ever truncating it.
///
/// An incoming history that starts with the stored one replaces it; otherwise
/// events dated at or after the last stored event are appended unless an
/// identical event is already recorded.
fn merge_history(current: &mut Vec<ChangeEvent>, incoming: Vec<ChangeEvent>) -> usize {
    if incoming.starts_with(current.as_slice()) {
        let added = incoming.len() - current.len();
        *current = incoming;
        return added;
    }

    let cutoff = current.last().map(|event| event.date);
    let before = current.len();
    for event in incoming {
        let recent = cutoff.is_none_or(|last| event.date >= last);
        if recent && !current.contains(&event) {
            current.push(event);
        }
    }

    current.len() - before
}
