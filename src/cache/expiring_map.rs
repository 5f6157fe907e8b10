//! Expiring Map Module
//!
//! Wraps an ordered container so that every insertion goes through the
//! expiration scheduler.

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::cache::{
    CleanerStats, Expiry, FieldExpiry, MaxAge, MaxAgeExpiry, OrderedMap, OrderedStore,
};
use crate::config::Config;
use crate::error::{CleanerError, Result};
use crate::tasks::{spawn_sweep, SchedulerState};

// == Shared Interior ==
/// Shared interior of an [`ExpiringMap`].
pub(crate) struct Inner<K, V, M> {
    pub(crate) state: Mutex<SchedulerState<K, M>>,
    pub(crate) expiry: Box<dyn Expiry<V>>,
    pub(crate) config: Config,
    /// Runtime the sweep and timer tasks are spawned on
    pub(crate) runtime: Handle,
}

impl<K, V, M> Drop for Inner<K, V, M> {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
    }
}

// == Expiring Map ==
/// An ordered map whose entries remove themselves once they expire.
///
/// Cloning yields another handle to the same map. Sweep and timer tasks
/// hold weak references only; dropping the last handle stops scheduling.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use map_age_cleaner::{attach, OrderedStore, Timestamped};
///
/// # #[tokio::main]
/// # async fn main() -> map_age_cleaner::error::Result<()> {
/// let sessions = attach(OrderedStore::new())?;
/// sessions.insert("alice", Timestamped::new("token", Duration::from_millis(50)));
/// assert!(sessions.contains_key(&"alice"));
///
/// tokio::time::sleep(Duration::from_millis(150)).await;
/// assert!(!sessions.contains_key(&"alice"));
/// # Ok(())
/// # }
/// ```
pub struct ExpiringMap<K, V, M = OrderedStore<K, V>> {
    inner: Arc<Inner<K, V, M>>,
}

impl<K, V, M> Clone for ExpiringMap<K, V, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, M> ExpiringMap<K, V, M>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Send + 'static,
    M: OrderedMap<K, V>,
{
    // == Constructors ==
    /// Attaches the scheduler to `container`, reading expirations with
    /// `expiry`.
    ///
    /// Entries already in the container are swept right away.
    ///
    /// # Errors
    /// [`CleanerError::NoRuntime`] when called outside a Tokio runtime.
    pub fn with_expiry(container: M, expiry: impl Expiry<V>) -> Result<Self> {
        Self::with_config(container, expiry, Config::default())
    }

    /// Like [`ExpiringMap::with_expiry`], with explicit configuration.
    ///
    /// Only `config.invalid_expiry` affects scheduling. `config.expiry_field`
    /// is read by [`FieldExpiry::from_config`] and nothing else; with any
    /// other accessor it is ignored.
    pub fn with_config(container: M, expiry: impl Expiry<V>, config: Config) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| CleanerError::NoRuntime)?;

        let mut state = SchedulerState::new(container);
        state.stats.set_total_entries(state.map.len());
        info!(
            entries = state.map.len(),
            policy = ?config.invalid_expiry,
            "Attached expiration scheduler"
        );

        let inner = Arc::new(Inner {
            state: Mutex::new(state),
            expiry: Box::new(expiry),
            config,
            runtime,
        });
        spawn_sweep(&inner);

        Ok(Self { inner })
    }

    // == Insert ==
    /// Inserts or replaces an entry.
    ///
    /// The key always lands at the back of the iteration order. Replacing
    /// the entry the live timer watches cancels that timer, and a sweep is
    /// started unless one is already running.
    pub fn insert(&self, key: K, value: V) -> &Self {
        let idle = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if state.map.contains_key(&key) {
                state.map.remove(&key);
            }
            state.map.insert(key.clone(), value);
            state.skipped.remove(&key);
            state.stats.set_total_entries(state.map.len());

            if state.watched.as_ref() == Some(&key) {
                debug!(?key, "Watched key re-inserted, resetting timer");
                state.reset();
            }
            !state.is_sweeping()
        };

        // A running pass reaches the new entry on its own.
        if idle {
            spawn_sweep(&self.inner);
        }
        self
    }

    // == Get ==
    /// Returns a copy of the value stored for `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.state.lock().map.get(key).cloned()
    }

    // == Contains ==
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.state.lock().map.contains_key(key)
    }

    // == Remove ==
    /// Removes an entry without waiting for it to expire.
    ///
    /// Removing the watched key leaves its timer running; the pass moves on
    /// when it fires.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let removed = state.map.remove(key);
        state.skipped.remove(key);
        state.stats.set_total_entries(state.map.len());
        removed
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.inner.state.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().map.is_empty()
    }

    // == Snapshots ==
    /// Keys in iteration order.
    pub fn keys(&self) -> Vec<K> {
        self.inner
            .state
            .lock()
            .map
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Entries in iteration order.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.inner
            .state
            .lock()
            .map
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    // == Scheduler Introspection ==
    /// The key the live timer is counting down for, if any.
    pub fn watched_key(&self) -> Option<K> {
        self.inner.state.lock().watched.clone()
    }

    /// Current scheduler statistics.
    pub fn stats(&self) -> CleanerStats {
        let state = self.inner.state.lock();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.map.len());
        stats
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

impl<K, V, M> Debug for ExpiringMap<K, V, M>
where
    K: Debug,
    M: OrderedMap<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ExpiringMap")
            .field("len", &state.map.len())
            .field("watched", &state.watched)
            .finish()
    }
}

// == Attach ==
/// Attaches the scheduler to a container of [`MaxAge`] values.
///
/// # Errors
/// [`CleanerError::NoRuntime`] when called outside a Tokio runtime.
pub fn attach<K, V, M>(container: M) -> Result<ExpiringMap<K, V, M>>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: MaxAge + Send + 'static,
    M: OrderedMap<K, V>,
{
    ExpiringMap::with_expiry(container, MaxAgeExpiry)
}

/// Attaches the scheduler to a container of JSON objects, reading the
/// expiration timestamp from `field`.
///
/// # Errors
/// [`CleanerError::NoRuntime`] when called outside a Tokio runtime.
pub fn attach_field<K, M>(
    container: M,
    field: impl Into<String>,
) -> Result<ExpiringMap<K, Value, M>>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    M: OrderedMap<K, Value>,
{
    let config = Config::with_field(field);
    debug!(field = %config.expiry_field, "Reading expirations from JSON field");
    ExpiringMap::with_config(container, FieldExpiry::from_config(&config), config)
}
