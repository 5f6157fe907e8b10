//! Background Tasks Module
//!
//! Tasks spawned by an [`crate::ExpiringMap`] to evict entries on time.
//!
//! # Tasks
//! - Sweep: walks the map in insertion order, one pass at a time
//! - Timer: sleeps until the watched entry expires, then evicts it

mod cleanup;

pub(crate) use cleanup::{spawn_sweep, SchedulerState};
pub use cleanup::WaitOutcome;
