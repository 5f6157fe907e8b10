//! Expiration Sweep Task
//!
//! Walks the container in insertion order, evicting expired entries and
//! waiting on a single timer for the first entry that has not expired yet.
//!
//! At most one sweep pass is active per map. The pass is suspended on a
//! oneshot channel that resolves either when the watched entry's timer fires
//! ([`WaitOutcome::Fired`], keep walking) or when the watched key is
//! re-inserted ([`WaitOutcome::Canceled`], abandon the pass; the insertion
//! starts a new one).

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::cache::{now_ms, CleanerStats, Inner, OrderedMap};
use crate::config::InvalidExpiryPolicy;

// == Wait Outcome ==
/// How a suspended sweep pass was resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The watched entry's timer fired and the entry was removed
    Fired,
    /// The watched key was re-inserted; the pass must stop
    Canceled,
}

// == Scheduler State ==
/// Container plus the bookkeeping of the (single) live timer.
///
/// `watched`, `timer` and `pending` are set together when a timer starts.
/// The timer clears `timer` and takes `pending` when it fires; `watched`
/// stays set until the pass moves on, so sweep requests keep coalescing.
pub(crate) struct SchedulerState<K, M> {
    pub(crate) map: M,
    /// Key the live timer counts down for
    pub(crate) watched: Option<K>,
    /// Live timer task
    pub(crate) timer: Option<JoinHandle<()>>,
    /// Resolves the suspended pass
    pub(crate) pending: Option<oneshot::Sender<WaitOutcome>>,
    /// Bumped by every reset; stale timers and passes compare against it
    pub(crate) epoch: u64,
    /// Keys with unreadable expirations passed over by the current pass
    pub(crate) skipped: HashSet<K>,
    pub(crate) stats: CleanerStats,
}

impl<K: Eq + Hash, M> SchedulerState<K, M> {
    pub(crate) fn new(map: M) -> Self {
        Self {
            map,
            watched: None,
            timer: None,
            pending: None,
            epoch: 0,
            skipped: HashSet::new(),
            stats: CleanerStats::new(),
        }
    }

    /// Returns true while a sweep pass is in progress.
    pub(crate) fn is_sweeping(&self) -> bool {
        self.watched.is_some()
    }

    // == Reset ==
    /// Cancels the live timer and the suspended pass.
    pub(crate) fn reset(&mut self) {
        self.watched = None;
        self.epoch = self.epoch.wrapping_add(1);

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        if let Some(pending) = self.pending.take() {
            // The pass may already be gone; nothing to notify then.
            let _ = pending.send(WaitOutcome::Canceled);
        }

        self.stats.record_reset();
    }
}

// == Spawn Sweep ==
/// Starts a sweep pass on the map's runtime.
///
/// The task only holds a weak reference, so a pending sweep never keeps the
/// map alive. If a pass is already running the new task returns at once.
pub(crate) fn spawn_sweep<K, V, M>(inner: &Arc<Inner<K, V, M>>)
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Send + 'static,
    M: OrderedMap<K, V>,
{
    inner.runtime.spawn(sweep(Arc::downgrade(inner)));
}

async fn sweep<K, V, M>(weak: Weak<Inner<K, V, M>>)
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Send + 'static,
    M: OrderedMap<K, V>,
{
    let mut pass_epoch: Option<u64> = None;

    loop {
        let wait = {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut state = inner.state.lock();

            match pass_epoch {
                None => {
                    if state.is_sweeping() {
                        trace!("Sweep already in progress");
                        return;
                    }
                    state.stats.record_sweep();
                    state.skipped.clear();
                    pass_epoch = Some(state.epoch);
                    debug!(entries = state.map.len(), "Starting sweep pass");
                }
                Some(epoch) if epoch != state.epoch => {
                    trace!("Sweep pass superseded by a reset");
                    return;
                }
                Some(_) => {}
            }

            let next = watch_next(&inner, &mut *state);
            match next {
                Some(wait) => wait,
                None => {
                    state.watched = None;
                    debug!(entries = state.map.len(), "Sweep pass complete");
                    return;
                }
            }
        };

        match wait.await {
            Ok(WaitOutcome::Fired) => continue,
            // A dropped sender means the map itself is gone.
            Ok(WaitOutcome::Canceled) | Err(_) => return,
        }
    }
}

// == Watch Next ==
/// Evicts expired entries from the front of the container and starts a timer
/// for the first one still alive.
///
/// Returns `None` once the container holds nothing left to watch.
fn watch_next<K, V, M>(
    inner: &Arc<Inner<K, V, M>>,
    state: &mut SchedulerState<K, M>,
) -> Option<oneshot::Receiver<WaitOutcome>>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Send + 'static,
    M: OrderedMap<K, V>,
{
    loop {
        let (key, expires_at) = {
            let skipped = &state.skipped;
            let (key, value) = state.map.iter().find(|(key, _)| !skipped.contains(*key))?;
            (key.clone(), inner.expiry.expires_at(value))
        };

        let delay = match expires_at {
            Ok(expires_at) => expires_at.saturating_sub(now_ms()),
            Err(err) => {
                state.stats.record_invalid_expiry();
                match inner.config.invalid_expiry {
                    InvalidExpiryPolicy::Evict => {
                        warn!(?key, %err, "Evicting entry with unreadable expiration");
                        0
                    }
                    InvalidExpiryPolicy::Keep => {
                        warn!(?key, %err, "Keeping entry with unreadable expiration");
                        state.skipped.insert(key);
                        continue;
                    }
                }
            }
        };

        if delay <= 0 {
            state.map.remove(&key);
            state.stats.record_immediate_eviction();
            state.stats.set_total_entries(state.map.len());
            debug!(?key, "Evicted expired entry");
            continue;
        }

        let (tx, rx) = oneshot::channel();
        let timer = inner.runtime.spawn(fire_after(
            Arc::downgrade(inner),
            key.clone(),
            state.epoch,
            Duration::from_millis(delay.unsigned_abs()),
        ));

        debug!(?key, delay_ms = delay, "Watching entry");
        state.watched = Some(key);
        state.timer = Some(timer);
        state.pending = Some(tx);
        return Some(rx);
    }
}

// == Timer ==
/// Removes `key` after `delay` and resumes the suspended pass.
///
/// A reset aborts this task, and also bumps the epoch so a timer that
/// already woke up but lost the race for the lock does nothing.
async fn fire_after<K, V, M>(weak: Weak<Inner<K, V, M>>, key: K, epoch: u64, delay: Duration)
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Send + 'static,
    M: OrderedMap<K, V>,
{
    tokio::time::sleep(delay).await;

    let Some(inner) = weak.upgrade() else {
        return;
    };
    let mut guard = inner.state.lock();
    let state = &mut *guard;

    if state.epoch != epoch || state.watched.as_ref() != Some(&key) {
        trace!(?key, "Ignoring stale timer");
        return;
    }

    state.timer = None;
    if state.map.remove(&key).is_some() {
        state.stats.record_timer_eviction();
        state.stats.set_total_entries(state.map.len());
        debug!(?key, "Evicted entry on timer");
    }

    if let Some(pending) = state.pending.take() {
        let _ = pending.send(WaitOutcome::Fired);
    }
}
