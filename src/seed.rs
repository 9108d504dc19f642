//! Default set of tracked websites

use crate::model::{ChangeEvent, Website, WebsiteStatus};
use chrono::{DateTime, Duration, Utc};

pub const ALABAMA_PREK_URL: &str = "https://www.children.alabama.gov/first-class-prek/aseld/";
pub const CALIFORNIA_FRAMEWORK_URL: &str = "https://www.cde.ca.gov/sp/cd/re/psframework.asp";
pub const FIBONACCI_SKILLS_URL: &str = "https://www.fibonacciskills.com";

/// The websites tracked out of the box, with check times relative to `now`.
pub fn default_websites(now: DateTime<Utc>) -> Vec<Website> {
    let one_hour_ago = now - Duration::hours(1);
    let two_hours_ago = now - Duration::hours(2);

    vec![
        Website::new(ALABAMA_PREK_URL, WebsiteStatus::Unchanged, now),
        Website::new(CALIFORNIA_FRAMEWORK_URL, WebsiteStatus::Changed, one_hour_ago)
            .with_change(ChangeEvent::new(one_hour_ago, "Content Update")),
        Website::new(FIBONACCI_SKILLS_URL, WebsiteStatus::Uncertain, two_hours_ago),
    ]
}
