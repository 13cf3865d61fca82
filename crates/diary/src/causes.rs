//! Cause menu configuration.
//!
//! Maps alert condition ids to the root causes offered in the
//! acknowledgment form. Loaded once at startup and injected into the
//! [`AckWorkflow`](crate::ack::AckWorkflow).
//!
//! ```yaml
//! causes:
//!   - condition_id: 7
//!     options: [disk_full, noisy-neighbour]
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error::CauseMenuError;

/// Causes configured for one alert condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CauseEntry {
    pub condition_id: i64,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Condition id to cause list mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CauseMenu {
    #[serde(default)]
    causes: Vec<CauseEntry>,
}

impl CauseMenu {
    #[must_use]
    pub fn new(causes: Vec<CauseEntry>) -> Self {
        Self { causes }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, CauseMenuError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, CauseMenuError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CauseMenuError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Number of configured conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.causes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// Display-ready causes for a condition, in configuration order.
    #[must_use]
    pub fn options_for(&self, condition_id: i64) -> Vec<String> {
        self.causes
            .iter()
            .filter(|entry| entry.condition_id == condition_id)
            .flat_map(|entry| entry.options.iter())
            .map(|option| display_cause(option))
            .collect()
    }
}

/// Replace `_` and `-` separators with spaces.
#[must_use]
pub fn display_cause(raw: &str) -> String {
    raw.replace(['_', '-'], " ")
}
