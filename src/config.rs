//! Configuration management for the website monitor

use crate::projector::StatusFilter;
use serde::Serialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Time between refresh cycles
    pub refresh_interval: Duration,

    /// Upper bound for a single update source fetch
    pub source_timeout: Duration,

    /// Filter selected when the dashboard opens
    pub default_filter: StatusFilter,

    /// Address change digests are meant for
    pub digest_recipient: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            source_timeout: Duration::from_secs(30),
            default_filter: StatusFilter::All,
            digest_recipient: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(interval) = lookup("MONITOR_REFRESH_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.refresh_interval = Duration::from_secs(seconds);
            }
        }

        if let Some(timeout) = lookup("MONITOR_SOURCE_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.source_timeout = Duration::from_secs(seconds);
            }
        }

        if let Some(filter) = lookup("MONITOR_FILTER") {
            config.default_filter = StatusFilter::from(filter.as_str());
        }

        if let Some(recipient) = lookup("MONITOR_DIGEST_RECIPIENT") {
            let recipient = recipient.trim();
            if !recipient.is_empty() {
                config.digest_recipient = Some(recipient.to_string());
            }
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.refresh_interval.is_zero() {
            return Err("refresh_interval must be greater than 0".to_string());
        }

        if self.source_timeout.is_zero() {
            return Err("source_timeout must be greater than 0".to_string());
        }

        if self.source_timeout > self.refresh_interval {
            return Err("source_timeout cannot exceed refresh_interval".to_string());
        }

        if let Some(recipient) = &self.digest_recipient {
            if !recipient.contains('@') {
                return Err(format!("digest_recipient '{}' is not an email address", recipient));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.default_filter, StatusFilter::All);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("MONITOR_REFRESH_INTERVAL_SECONDS", "60"),
            ("MONITOR_SOURCE_TIMEOUT_SECONDS", "5"),
            ("MONITOR_FILTER", "changed"),
            ("MONITOR_DIGEST_RECIPIENT", " ops@example.org "),
        ]));

        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.source_timeout, Duration::from_secs(5));
        assert_eq!(config.default_filter, StatusFilter::Changed);
        assert_eq!(config.digest_recipient.as_deref(), Some("ops@example.org"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("MONITOR_REFRESH_INTERVAL_SECONDS", "soon"),
            ("MONITOR_FILTER", "everything"),
        ]));

        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.default_filter, StatusFilter::All);
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.source_timeout = Duration::from_secs(600);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.refresh_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.digest_recipient = Some("nobody".to_string());
        assert!(config.validate().is_err());
    }
}
