//! Runtime options for a quiz session
//!
//! Limits that never change live in [`crate::constants`]; the values here
//! can be chosen per deployment and are validated before use.

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{constants, game::Rules, store::MemoryStorage};

/// Options shared by every session of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Storage key announcing which room changed last
    #[garde(length(min = 1))]
    pub sentinel_key: String,
    /// Rules rooms are played with
    #[garde(dive)]
    pub rules: Rules,
    /// Byte limit of the in-memory storage, unlimited if absent
    #[garde(range(min = 1))]
    pub storage_quota: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sentinel_key: constants::storage::SENTINEL_KEY.to_owned(),
            rules: Rules::default(),
            storage_quota: None,
        }
    }
}

/// Errors that can occur while loading a configuration
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not a valid configuration document
    #[error("configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A value is out of its allowed range
    #[error("configuration is invalid: {0}")]
    Invalid(String),
}

impl Config {
    /// Parses and validates a JSON configuration
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the input cannot be parsed and
    /// `Error::Invalid` if a value fails validation.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config
            .validate()
            .map_err(|report| Error::Invalid(report.to_string()))?;
        Ok(config)
    }

    /// Creates an empty in-memory storage honoring the configured quota
    pub fn memory_storage(&self) -> MemoryStorage {
        self.storage_quota
            .map_or_else(MemoryStorage::new, MemoryStorage::with_quota)
    }
}
