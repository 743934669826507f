//! Engine configuration loading and defaults

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Tunables for the cache and query layers.
///
/// Every field has a default, so a partial YAML document (or none at all)
/// yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// TTL for cached view pages, in seconds
    pub page_ttl_secs: u64,

    /// TTL for cached status-count aggregates, in seconds
    pub counts_ttl_secs: u64,

    /// Upper bound on the page size a caller may request
    pub max_page_size: usize,

    /// Page size used when callers do not pick one
    pub default_page_size: usize,

    /// Buffer capacity of the broadcast audit sink
    pub audit_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_ttl_secs: 300,
            counts_ttl_secs: 300,
            max_page_size: 100,
            default_page_size: 20,
            audit_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn page_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.page_ttl_secs as i64)
    }

    pub fn counts_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.counts_ttl_secs as i64)
    }
}
