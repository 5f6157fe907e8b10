//! Cache Module
//!
//! Ordered storage, expiration accessors and the self-expiring map built on
//! top of them.

mod entry;
mod expiring_map;
mod expiry;
mod order;
mod stats;
mod store;


// Re-export public types
pub use entry::{now_ms, Timestamped};
pub use expiring_map::{attach, attach_field, ExpiringMap};
pub use expiry::{Expiry, FieldExpiry, MaxAge, MaxAgeExpiry};
pub use stats::CleanerStats;
pub use store::{OrderedMap, OrderedStore};

pub(crate) use expiring_map::Inner;
pub(crate) use order::InsertionOrder;
