//! Integration Tests for automatic expiry
//!
//! Drives self-expiring maps on a real clock and checks which keys are
//! present at each point in time.

use std::time::Duration;

use map_age_cleaner::{
    attach, attach_field, now_ms, ExpiringMap, OrderedMap, OrderedStore, Timestamped,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

type Entry = Timestamped<&'static str>;

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "map_age_cleaner=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Entry expiring `ms` milliseconds from now
fn entry(data: &'static str, ms: u64) -> Entry {
    Timestamped::new(data, Duration::from_millis(ms))
}

async fn delay(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn empty_map() -> ExpiringMap<&'static str, Entry> {
    attach(OrderedStore::new()).unwrap()
}

// == Basic Expiry ==

#[tokio::test]
async fn test_auto_removal_on_initial_map() {
    init_tracing();
    let store: OrderedStore<&str, Entry> = vec![("unicorn", entry("🦄", 1000))].into_iter().collect();
    let map = attach(store).unwrap();

    assert!(map.contains_key(&"unicorn"));

    delay(400).await;
    assert!(map.contains_key(&"unicorn"));

    delay(800).await;
    assert!(!map.contains_key(&"unicorn"));
}

#[tokio::test]
async fn test_auto_removal() {
    init_tracing();
    let map = empty_map();
    map.insert("unicorn", entry("🦄", 1000));

    assert!(map.contains_key(&"unicorn"));

    delay(400).await;
    assert!(map.contains_key(&"unicorn"));

    delay(800).await;
    assert!(!map.contains_key(&"unicorn"));
    assert_eq!(map.stats().timer_evictions, 1);
}

#[tokio::test]
async fn test_entries_inserted_while_watching() {
    init_tracing();
    let map = empty_map();
    map.insert("a", entry("a", 1000));

    delay(500).await;
    map.insert("b", entry("b", 500));

    delay(300).await;
    assert_eq!(map.len(), 2);

    delay(400).await;
    assert_eq!(map.len(), 0);
}

#[tokio::test]
async fn test_use_other_property_name() {
    init_tracing();
    let store: OrderedStore<&str, Value> = vec![(
        "unicorn",
        json!({"timestamp": now_ms() + 1000, "data": "🦄"}),
    )]
    .into_iter()
    .collect();
    let map = attach_field(store, "timestamp").unwrap();

    assert_eq!(map.config().expiry_field, "timestamp");
    assert!(map.contains_key(&"unicorn"));

    delay(400).await;
    assert!(map.contains_key(&"unicorn"));

    delay(800).await;
    assert!(!map.contains_key(&"unicorn"));
}

#[tokio::test]
async fn test_past_expiry_removed_without_waiting() {
    init_tracing();
    let map = empty_map();
    map.insert("stale", Timestamped::expires_at("old", now_ms() - 5_000));

    delay(20).await;

    assert!(map.is_empty());
    assert_eq!(map.stats().immediate_evictions, 1);
    assert_eq!(map.watched_key(), None);
}

// == Ordering and Resets ==

#[tokio::test]
async fn test_order_on_reset() {
    init_tracing();
    let map = empty_map();

    map.insert("unicorn", entry("🦄", 1000));
    delay(400).await;
    map.insert("rainbow", entry("🌈", 1000));
    delay(100).await;
    map.insert("hooray", entry("🎉", 1000));
    delay(300).await;
    // Not the watched key: moves to the back, no reset.
    map.insert("rainbow", entry("🌈🦄", 1000));
    assert_eq!(map.keys(), vec!["unicorn", "hooray", "rainbow"]);

    delay(400).await;
    assert!(!map.contains_key(&"unicorn"));
    assert!(map.contains_key(&"rainbow"));
    assert!(map.contains_key(&"hooray"));
    assert_eq!(map.len(), 2);

    delay(450).await;
    assert!(!map.contains_key(&"unicorn"));
    assert!(map.contains_key(&"rainbow"));
    assert!(!map.contains_key(&"hooray"));
    assert_eq!(map.len(), 1);

    delay(350).await;
    assert!(map.is_empty());
    assert_eq!(map.stats().resets, 0);
}

#[tokio::test]
async fn test_reset_currently_processed_item() {
    init_tracing();
    let map = empty_map();

    map.insert("unicorn", entry("🦄", 1000));
    delay(200).await;
    map.insert("unicorn", entry("🦄🦄", 1000));
    delay(200).await;
    map.insert("unicorn", entry("🦄🦄🦄", 1000));
    delay(400).await;
    map.insert("unicorn", entry("🦄🦄🦄🦄", 1000));
    delay(300).await;

    // Past the first expiration, kept alive by the resets.
    assert!(map.contains_key(&"unicorn"));
    assert_eq!(map.get(&"unicorn").map(|e| e.data), Some("🦄🦄🦄🦄"));
    assert_eq!(map.stats().resets, 3);

    delay(900).await;
    assert!(!map.contains_key(&"unicorn"));
}

#[tokio::test]
async fn test_reset_currently_processed_item_and_process_next() {
    init_tracing();
    let map = empty_map();

    map.insert("unicorn", entry("🦄", 1000));
    delay(500).await;
    map.insert("rainbow", entry("🌈", 1000));

    delay(200).await;
    map.insert("unicorn", entry("🦄🦄", 1000));
    delay(20).await;
    assert_eq!(map.watched_key(), Some("rainbow"));

    delay(180).await;
    map.insert("unicorn", entry("🦄🦄", 1000));
    delay(400).await;

    assert!(map.contains_key(&"unicorn"));
    assert!(map.contains_key(&"rainbow"));
    assert_eq!(map.len(), 2);

    delay(350).await;
    assert!(map.contains_key(&"unicorn"));
    assert!(!map.contains_key(&"rainbow"));
    assert_eq!(map.len(), 1);

    delay(450).await;
    assert!(map.is_empty());
    assert_eq!(map.stats().resets, 1);
}

#[tokio::test]
async fn test_cleanup_items_with_same_expiration_timestamp() {
    init_tracing();
    let max_age = now_ms() + 1000;
    let store: OrderedStore<&str, Entry> = vec![
        ("unicorn", Timestamped::expires_at("🦄", max_age)),
        ("rainbow", Timestamped::expires_at("🌈", max_age)),
    ]
    .into_iter()
    .collect();
    let map = attach(store).unwrap();

    assert_eq!(map.len(), 2);

    delay(1200).await;
    assert_eq!(map.len(), 0);
    assert_eq!(map.stats().total_evictions(), 2);
}

// == Coalescing ==

#[tokio::test]
async fn test_rapid_insertions_share_one_sweep() {
    init_tracing();
    let map: ExpiringMap<usize, Entry> = attach(OrderedStore::new()).unwrap();
    map.insert(0, entry("first", 60_000));
    delay(20).await;

    for key in 1..50 {
        map.insert(key, entry("later", 60_000));
    }
    delay(20).await;

    assert_eq!(map.watched_key(), Some(0));
    assert_eq!(map.len(), 50);
    let stats = map.stats();
    assert_eq!(stats.sweeps, 1);
    assert_eq!(stats.resets, 0);
    assert_eq!(stats.total_evictions(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_insertions_all_expire() {
    init_tracing();
    let map: ExpiringMap<(usize, usize), Entry> = attach(OrderedStore::new()).unwrap();

    let writers: Vec<_> = (0..4)
        .map(|writer| {
            let map = map.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    map.insert((writer, i), entry("x", 100));
                    if i % 5 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }
    assert!(map.len() <= 100);

    delay(600).await;
    assert!(map.is_empty());
    assert_eq!(map.stats().total_evictions(), 100);
    assert_eq!(map.watched_key(), None);
}

// == Custom Container ==

/// Minimal container backed by a Vec, used to check the scheduler only
/// relies on the ordered-map contract.
struct VecMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> VecMap<K, V> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K, V> OrderedMap<K, V> for VecMap<K, V>
where
    K: PartialEq + Send + 'static,
    V: Send + 'static,
{
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

#[tokio::test]
async fn test_custom_container() {
    init_tracing();
    let map: ExpiringMap<&str, i64, VecMap<&str, i64>> =
        ExpiringMap::with_expiry(VecMap::new(), |expires_at: &i64| *expires_at).unwrap();

    map.insert("short", now_ms() + 200);
    map.insert("long", now_ms() + 60_000);
    map.insert("short", now_ms() + 300);
    assert_eq!(map.keys(), vec!["long", "short"]);

    delay(100).await;
    assert_eq!(map.watched_key(), Some("long"));

    // Removing the watched key alone keeps its timer; re-inserting it resets
    // the pass, which then starts over from the front.
    map.remove(&"long");
    map.insert("long", now_ms() + 100);
    assert_eq!(map.keys(), vec!["short", "long"]);
    delay(20).await;
    assert_eq!(map.watched_key(), Some("short"));
    assert_eq!(map.stats().resets, 1);

    delay(400).await;
    assert!(map.is_empty());
}
