//! Derived dashboard views: filtering, ordering and per-status counts

use crate::model::{MonitoringSnapshot, Website, WebsiteStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use tracing::warn;

/// Status selection made in the dashboard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Changed,
    Unchanged,
    Uncertain,
}

impl StatusFilter {
    /// Filters in the order the dashboard shows its buttons
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Changed,
        StatusFilter::Unchanged,
        StatusFilter::Uncertain,
    ];

    /// Whether a website holding `status` passes this filter. Unrecognized
    /// statuses only pass `All`.
    pub fn matches(&self, status: &WebsiteStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Changed => *status == WebsiteStatus::Changed,
            StatusFilter::Unchanged => *status == WebsiteStatus::Unchanged,
            StatusFilter::Uncertain => *status == WebsiteStatus::Uncertain,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Changed => "Changed",
            StatusFilter::Unchanged => "Unchanged",
            StatusFilter::Uncertain => "Uncertain",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Changed => "changed",
            StatusFilter::Unchanged => "unchanged",
            StatusFilter::Uncertain => "uncertain",
        }
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unknown values fall back to `All` so a bad selection never hides data.
impl From<&str> for StatusFilter {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "all" => StatusFilter::All,
            "changed" => StatusFilter::Changed,
            "unchanged" => StatusFilter::Unchanged,
            "uncertain" => StatusFilter::Uncertain,
            other => {
                warn!("Unknown status filter '{}', showing all websites", other);
                StatusFilter::All
            }
        }
    }
}

impl FromStr for StatusFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StatusFilter::from(s))
    }
}

/// Websites passing `filter`, most recently checked first.
///
/// Ties keep snapshot order (`sort_by` is stable).
pub fn project<'a>(snapshot: &'a MonitoringSnapshot, filter: StatusFilter) -> Vec<&'a Website> {
    let mut websites: Vec<&Website> = snapshot
        .websites
        .iter()
        .filter(|website| filter.matches(&website.status))
        .collect();

    websites.sort_by(|a, b| b.last_checked.cmp(&a.last_checked));
    websites
}

/// Number of websites per status
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub uncertain: usize,
    /// Websites whose status is outside the known set; part of `all` only.
    pub unrecognized: usize,
}

impl StatusCounts {
    /// Count shown on the button for `filter`
    pub fn count_for(&self, filter: StatusFilter) -> usize {
        match filter {
            StatusFilter::All => self.all,
            StatusFilter::Changed => self.changed,
            StatusFilter::Unchanged => self.unchanged,
            StatusFilter::Uncertain => self.uncertain,
        }
    }

    pub fn named_total(&self) -> usize {
        self.changed + self.unchanged + self.uncertain
    }
}

pub fn status_counts(snapshot: &MonitoringSnapshot) -> StatusCounts {
    snapshot
        .websites
        .iter()
        .fold(StatusCounts::default(), |mut counts, website| {
            counts.all += 1;
            match website.status {
                WebsiteStatus::Changed => counts.changed += 1,
                WebsiteStatus::Unchanged => counts.unchanged += 1,
                WebsiteStatus::Uncertain => counts.uncertain += 1,
                WebsiteStatus::Unrecognized(_) => counts.unrecognized += 1,
            }
            counts
        })
}

/// One filter button: label, value and count
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub filter: StatusFilter,
    pub label: &'static str,
    pub count: usize,
    pub selected: bool,
}

/// One row of the dashboard
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteRow<'a> {
    #[serde(flatten)]
    pub website: &'a Website,
    pub status_label: &'static str,
    pub display_status: WebsiteStatus,
}

impl<'a> From<&'a Website> for WebsiteRow<'a> {
    fn from(website: &'a Website) -> Self {
        Self {
            website,
            status_label: website.status.label(),
            display_status: website.status.effective(),
        }
    }
}

/// Everything the render layer needs for one frame
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView<'a> {
    pub last_update: DateTime<Utc>,
    pub refreshing: bool,
    pub filter: StatusFilter,
    pub filters: Vec<FilterOption>,
    pub counts: StatusCounts,
    pub websites: Vec<WebsiteRow<'a>>,
}

impl<'a> DashboardView<'a> {
    pub fn build(snapshot: &'a MonitoringSnapshot, filter: StatusFilter, refreshing: bool) -> Self {
        let counts = status_counts(snapshot);
        let filters = StatusFilter::ALL
            .iter()
            .map(|&option| FilterOption {
                filter: option,
                label: option.label(),
                count: counts.count_for(option),
                selected: option == filter,
            })
            .collect();

        Self {
            last_update: snapshot.last_update,
            refreshing,
            filter,
            filters,
            counts,
            websites: project(snapshot, filter)
                .into_iter()
                .map(WebsiteRow::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeEvent;
    use crate::seed::{
        default_websites, ALABAMA_PREK_URL, CALIFORNIA_FRAMEWORK_URL, FIBONACCI_SKILLS_URL,
    };
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 2, 12, 0, 0).unwrap()
    }

    fn seed_snapshot() -> MonitoringSnapshot {
        MonitoringSnapshot {
            websites: default_websites(now()),
            last_update: now(),
        }
    }

    fn urls(websites: &[&Website]) -> Vec<String> {
        websites.iter().map(|w| w.url.clone()).collect()
    }

    /// Snapshot mixing every status, including ties and an unknown value
    fn mixed_snapshot() -> MonitoringSnapshot {
        let t = now();
        MonitoringSnapshot {
            websites: vec![
                Website::new("https://a.example", WebsiteStatus::Changed, t - Duration::minutes(10)),
                Website::new("https://b.example", WebsiteStatus::Unchanged, t),
                Website::new("https://c.example", WebsiteStatus::Changed, t),
                Website::new("https://d.example", WebsiteStatus::from("weird"), t),
                Website::new("https://e.example", WebsiteStatus::Uncertain, t - Duration::minutes(10)),
                Website::new("https://f.example", WebsiteStatus::Unchanged, t - Duration::hours(1)),
            ],
            last_update: t,
        }
    }

    #[test]
    fn test_seed_counts() {
        let counts = status_counts(&seed_snapshot());
        assert_eq!(
            counts,
            StatusCounts {
                all: 3,
                changed: 1,
                unchanged: 1,
                uncertain: 1,
                unrecognized: 0,
            }
        );
    }

    #[test]
    fn test_seed_projection_all_is_most_recent_first() {
        let snapshot = seed_snapshot();
        let projected = project(&snapshot, StatusFilter::All);
        assert_eq!(
            urls(&projected),
            vec![ALABAMA_PREK_URL, CALIFORNIA_FRAMEWORK_URL, FIBONACCI_SKILLS_URL]
        );
    }

    #[test]
    fn test_seed_projection_changed() {
        let snapshot = seed_snapshot();
        let projected = project(&snapshot, StatusFilter::Changed);

        assert_eq!(projected.len(), 1);
        assert_eq!(projected[0].url, CALIFORNIA_FRAMEWORK_URL);
        assert_eq!(
            projected[0].change_history,
            vec![ChangeEvent::new(now() - Duration::hours(1), "Content Update")]
        );
    }

    #[test]
    fn test_projection_only_returns_matching_status() {
        let snapshot = mixed_snapshot();
        for filter in StatusFilter::ALL {
            let projected = project(&snapshot, filter);
            assert!(projected.iter().all(|w| filter.matches(&w.status)));
            assert_eq!(
                projected.len(),
                snapshot.websites.iter().filter(|w| filter.matches(&w.status)).count()
            );
        }
        assert_eq!(project(&snapshot, StatusFilter::All).len(), snapshot.len());
    }

    #[test]
    fn test_projection_is_stable_for_equal_timestamps() {
        let snapshot = mixed_snapshot();
        let projected = project(&snapshot, StatusFilter::All);
        assert_eq!(
            urls(&projected),
            vec![
                "https://b.example",
                "https://c.example",
                "https://d.example",
                "https://a.example",
                "https://e.example",
                "https://f.example",
            ]
        );
    }

    #[test]
    fn test_projection_is_idempotent() {
        let snapshot = mixed_snapshot();
        let before = snapshot.clone();
        for filter in StatusFilter::ALL {
            assert_eq!(project(&snapshot, filter), project(&snapshot, filter));
        }
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_unrecognized_status_only_in_all() {
        let snapshot = mixed_snapshot();
        let uncertain = project(&snapshot, StatusFilter::Uncertain);
        assert_eq!(urls(&uncertain), vec!["https://e.example"]);

        let counts = status_counts(&snapshot);
        assert_eq!(counts.all, 6);
        assert_eq!(counts.unrecognized, 1);
        assert_eq!(counts.named_total(), 5);
        assert!(counts.named_total() < counts.all);
    }

    #[test]
    fn test_counts_sum_to_total_when_all_recognized() {
        let counts = status_counts(&seed_snapshot());
        assert_eq!(counts.named_total(), counts.all);
    }

    #[test]
    fn test_filter_parsing_fails_open() {
        assert_eq!(StatusFilter::from("changed"), StatusFilter::Changed);
        assert_eq!(StatusFilter::from("Uncertain"), StatusFilter::Uncertain);
        assert_eq!(StatusFilter::from("chnaged"), StatusFilter::All);
        assert_eq!(StatusFilter::from(""), StatusFilter::All);
        assert_eq!("unchanged".parse::<StatusFilter>(), Ok(StatusFilter::Unchanged));

        let snapshot = seed_snapshot();
        assert_eq!(project(&snapshot, StatusFilter::from("typo")).len(), 3);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MonitoringSnapshot::empty(now());
        assert!(project(&snapshot, StatusFilter::All).is_empty());
        assert_eq!(status_counts(&snapshot), StatusCounts::default());
    }

    #[test]
    fn test_dashboard_view() {
        let snapshot = mixed_snapshot();
        let view = DashboardView::build(&snapshot, StatusFilter::Changed, true);

        assert!(view.refreshing);
        assert_eq!(view.websites.len(), 2);
        assert_eq!(view.websites[0].website.url, "https://c.example");

        let buttons: Vec<(&str, usize, bool)> = view
            .filters
            .iter()
            .map(|f| (f.label, f.count, f.selected))
            .collect();
        assert_eq!(
            buttons,
            vec![
                ("All", 6, false),
                ("Changed", 2, true),
                ("Unchanged", 2, false),
                ("Uncertain", 1, false),
            ]
        );
    }

    #[test]
    fn test_dashboard_row_for_unknown_status() {
        let snapshot = mixed_snapshot();
        let view = DashboardView::build(&snapshot, StatusFilter::All, false);
        let row = view
            .websites
            .iter()
            .find(|row| row.website.url == "https://d.example")
            .unwrap();

        assert_eq!(row.status_label, "Unknown");
        assert_eq!(row.display_status, WebsiteStatus::Uncertain);

        let json = serde_json::to_value(row).unwrap();
        assert_eq!(json["status"], "weird");
        assert_eq!(json["statusLabel"], "Unknown");
        assert_eq!(json["displayStatus"], "uncertain");
    }
}
