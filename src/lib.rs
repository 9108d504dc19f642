//! Website Monitor Library
//!
//! Holds the monitoring state of a set of tracked websites and derives the
//! filtered, sorted and aggregated views a dashboard renders. Fetching and
//! diffing pages is left to an external worker that feeds records in through
//! an [`UpdateSource`].

pub mod config;
pub mod digest;
pub mod errors;
pub mod model;
pub mod projector;
pub mod refresh;
pub mod seed;
pub mod source;
pub mod store;

pub use config::Config;
pub use digest::ChangeDigest;
pub use errors::{MonitorError, Result};
pub use model::{ChangeEvent, MonitoringSnapshot, Website, WebsiteStatus};
pub use projector::{project, status_counts, DashboardView, StatusCounts, StatusFilter};
pub use refresh::{RefreshCoordinator, RefreshReport, SharedStore};
pub use source::{JsonFileSource, StaticSource, UpdateSource};
pub use store::{ApplyOutcome, MonitoringStore, RefreshTicket};
