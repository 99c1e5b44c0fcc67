//! Engine configuration.
//!
//! [`DiscoveryConfig`] deserializes from any serde format with every field
//! defaulted, or can be read from `LOCUS_*` environment variables:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `LOCUS_MAX_PAGE_SIZE` | `max_page_size` | 100 |
//! | `LOCUS_DEFAULT_PAGE_SIZE` | `default_page_size` | 20 |
//! | `LOCUS_SEARCH_TIMEOUT` | `search_timeout` | `5s` |
//! | `LOCUS_MAX_UPDATE_RETRIES` | `max_update_retries` | 5 |
//! | `LOCUS_GRID_CELL_DEGREES` | `grid_cell_degrees` | 0.25 |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backends::memory::DEFAULT_CELL_DEGREES;
use crate::types::MAX_PAGE_SIZE;

#[cfg(feature = "sqlite")]
pub use crate::backends::sqlite::SqliteStoreConfig;

/// Settings shared by the search engine and the projection maintainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Largest accepted page size; never above [`MAX_PAGE_SIZE`].
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Page size used when a request does not name one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Deadline applied by [`SearchEngine::search_with_default_timeout`](crate::engine::SearchEngine::search_with_default_timeout).
    #[serde(with = "humantime_serde", default = "default_search_timeout")]
    pub search_timeout: Duration,

    /// Read-modify-write attempts before a mutation gives up on conflicts.
    #[serde(default = "default_max_update_retries")]
    pub max_update_retries: u32,

    /// Grid cell edge for the in-memory spatial index, in degrees.
    #[serde(default = "default_grid_cell_degrees")]
    pub grid_cell_degrees: f64,
}

fn default_max_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_page_size() -> u32 {
    20
}

fn default_search_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_update_retries() -> u32 {
    5
}

fn default_grid_cell_degrees() -> f64 {
    DEFAULT_CELL_DEGREES
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            default_page_size: default_page_size(),
            search_timeout: default_search_timeout(),
            max_update_retries: default_max_update_retries(),
            grid_cell_degrees: default_grid_cell_degrees(),
        }
    }
}

impl DiscoveryConfig {
    /// Reads the configuration from `LOCUS_*` environment variables.
    ///
    /// Missing variables keep their defaults; unparsable ones are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, "LOCUS_MAX_PAGE_SIZE", |s| s.parse::<u32>().ok()) {
            config.max_page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "LOCUS_DEFAULT_PAGE_SIZE", |s| s.parse::<u32>().ok()) {
            config.default_page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "LOCUS_SEARCH_TIMEOUT", |s| {
            humantime::parse_duration(s).ok()
        }) {
            config.search_timeout = v;
        }
        if let Some(v) = parse_var(&lookup, "LOCUS_MAX_UPDATE_RETRIES", |s| s.parse::<u32>().ok()) {
            config.max_update_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "LOCUS_GRID_CELL_DEGREES", |s| s.parse::<f64>().ok()) {
            config.grid_cell_degrees = v;
        }

        config
    }

    /// Page-size bound after clamping to [`MAX_PAGE_SIZE`].
    pub fn effective_max_page_size(&self) -> u32 {
        self.max_page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.max_page_size == 0 {
            errors.push("Max page size cannot be 0".to_string());
        }
        if self.max_page_size > MAX_PAGE_SIZE {
            errors.push(format!("Max page size cannot exceed {}", MAX_PAGE_SIZE));
        }
        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }
        if self.default_page_size > self.effective_max_page_size() {
            errors.push("Default page size cannot exceed max page size".to_string());
        }
        if self.search_timeout.is_zero() {
            errors.push("Search timeout cannot be 0".to_string());
        }
        if self.max_update_retries == 0 {
            errors.push("Max update retries cannot be 0".to_string());
        }
        if !(self.grid_cell_degrees.is_finite() && self.grid_cell_degrees > 0.0) {
            errors.push("Grid cell size must be a positive number of degrees".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            search_timeout: Duration::from_millis(500),
            max_update_retries: 10,
            ..Default::default()
        }
    }
}

fn parse_var<F, T, P>(lookup: &F, key: &str, parse: P) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
    }
    parsed
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.search_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: DiscoveryConfig =
            serde_json::from_str(r#"{"search_timeout": "250ms", "max_page_size": 50}"#).unwrap();
        assert_eq!(config.search_timeout, Duration::from_millis(250));
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.max_update_retries, 5);
    }

    #[test]
    fn test_serialize_humantime() {
        let json = serde_json::to_value(DiscoveryConfig::default()).unwrap();
        assert_eq!(json["search_timeout"], "5s");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("LOCUS_MAX_PAGE_SIZE", "40"),
            ("LOCUS_SEARCH_TIMEOUT", "1s 500ms"),
            ("LOCUS_MAX_UPDATE_RETRIES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = DiscoveryConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.max_page_size, 40);
        assert_eq!(config.search_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_update_retries, 5);
    }

    #[test]
    fn test_validate_invalid() {
        let config = DiscoveryConfig {
            max_page_size: 500,
            default_page_size: 0,
            max_update_retries: 0,
            grid_cell_degrees: -1.0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(config.effective_max_page_size(), 100);
    }
}
