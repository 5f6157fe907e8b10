//! Configuration Module
//!
//! Scheduler settings, embeddable in a host application's own configuration.

use serde::{Deserialize, Serialize};

/// Name of the expiration field when none is configured.
pub const DEFAULT_EXPIRY_FIELD: &str = "maxAge";

/// What to do with an entry whose expiration timestamp cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidExpiryPolicy {
    /// Treat the entry as already expired and evict it immediately
    #[default]
    Evict,
    /// Leave the entry in place; it never expires
    Keep,
}

/// Scheduler configuration parameters.
///
/// Every field has a default, so a partial (or empty) document deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Field holding the expiration timestamp (Unix milliseconds)
    pub expiry_field: String,
    /// Handling of missing or non-numeric expiration timestamps
    pub invalid_expiry: InvalidExpiryPolicy,
}

impl Config {
    /// Creates a Config reading expirations from `field`.
    pub fn with_field(field: impl Into<String>) -> Self {
        Self {
            expiry_field: field.into(),
            ..Self::default()
        }
    }

    /// Returns the config with the given invalid-expiry policy.
    pub fn invalid_expiry(mut self, policy: InvalidExpiryPolicy) -> Self {
        self.invalid_expiry = policy;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            expiry_field: DEFAULT_EXPIRY_FIELD.to_string(),
            invalid_expiry: InvalidExpiryPolicy::Evict,
        }
    }
}
