//! Timestamped Entry Module
//!
//! Defines a value wrapper carrying its own expiration timestamp.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::cache::MaxAge;

// == Timestamped ==
/// A payload together with the instant it expires at.
///
/// Serializes with the expiration under `maxAge`, so JSON documents
/// produced from it can also be watched through [`crate::cache::FieldExpiry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    /// The stored payload
    pub data: T,
    /// Expiration timestamp (Unix milliseconds)
    #[serde(rename = "maxAge")]
    pub max_age: i64,
}

impl<T> Timestamped<T> {
    // == Constructors ==
    /// Creates an entry expiring `ttl` from now.
    pub fn new(data: T, ttl: Duration) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            data,
            max_age: now_ms().saturating_add(ttl_ms),
        }
    }

    /// Creates an entry expiring at the given Unix millisecond timestamp.
    pub fn expires_at(data: T, max_age: i64) -> Self {
        Self { data, max_age }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: the entry is expired once the current time is
    /// greater than or equal to `max_age`.
    pub fn is_expired(&self) -> bool {
        now_ms() >= self.max_age
    }

    // == Time To Live ==
    /// Returns the remaining lifetime in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        u64::try_from(self.max_age.saturating_sub(now_ms())).unwrap_or(0)
    }
}

impl<T> MaxAge for Timestamped<T> {
    fn max_age(&self) -> i64 {
        self.max_age
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
