//! Map Age Cleaner - self-expiring ordered maps
//!
//! Entries carry their own expiration timestamp and are removed once it
//! passes. A single timer is live per map at any time: it watches the oldest
//! inserted entry, and a sweep walks on to the next one when it fires.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{
    attach, attach_field, now_ms, CleanerStats, ExpiringMap, Expiry, FieldExpiry, MaxAge,
    MaxAgeExpiry, OrderedMap, OrderedStore, Timestamped,
};
pub use config::{Config, InvalidExpiryPolicy};
pub use error::{CleanerError, Result};
