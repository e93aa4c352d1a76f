use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::oneshot;

use super::error::{LoadError, LoadResult};
use super::LoaderConfig;
use crate::metrics::{LOADER_BATCH_SIZE, LOADER_CACHE_HITS, LOADER_DISPATCHES, LOADER_FAILURES};

// Fetches one batch of distinct keys.
//
// Keys missing from the returned map resolve to `V::default()`, so a batch
// function only reports what it found. A per-key `Err` fails that key alone;
// an outer `Err` fails every key of the batch.
#[async_trait]
pub trait BatchFn<K, V>: Send + Sync + 'static
where
    K: Send + Sync + 'static,
    V: Send + 'static,
{
    async fn load(&self, keys: &[K]) -> Result<HashMap<K, LoadResult<V>>, LoadError>;
}

// Request-scoped coalescing cache in front of a [`BatchFn`].
//
// Every `load` issued before the next dispatch boundary joins the same
// batch. A key is fetched at most once per loader: later calls are answered
// from the cache, or attach to the dispatch already carrying the key.
pub struct BatchLoader<K, V, F> {
    inner: Arc<Inner<K, V, F>>,
}

struct Inner<K, V, F> {
    name: &'static str,
    config: LoaderConfig,
    batch_fn: F,
    state: Mutex<State<K, V>>,
}

struct State<K, V> {
    // Keys waiting for the next dispatch
    queued: Vec<K>,
    // Callers of every key that is queued or in flight
    waiters: HashMap<K, Vec<oneshot::Sender<LoadResult<V>>>>,
    cache: HashMap<K, LoadResult<V>>,
}

enum Action<K> {
    Wait,
    Schedule,
    DispatchNow(Vec<K>),
}

enum Ticket<V> {
    Ready(LoadResult<V>),
    Pending(oneshot::Receiver<LoadResult<V>>),
}

impl<V> Ticket<V> {
    async fn resolve(self) -> LoadResult<V> {
        match self {
            Ticket::Ready(result) => result,
            // The sender only disappears without a value when the dispatch is torn down
            Ticket::Pending(rx) => rx.await.unwrap_or(Err(LoadError::Cancelled)),
        }
    }
}

impl<K, V, F> BatchLoader<K, V, F>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Default + Send + 'static,
    F: BatchFn<K, V>,
{
    pub fn new(name: &'static str, batch_fn: F, config: LoaderConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                config,
                batch_fn,
                state: Mutex::new(State {
                    queued: Vec::new(),
                    waiters: HashMap::new(),
                    cache: HashMap::new(),
                }),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    // Loads the value for `key`, joining the current batch if needed.
    pub async fn load(&self, key: K) -> LoadResult<V> {
        self.enqueue(key).resolve().await
    }

    // Loads several keys at once. Results follow the order of `keys`,
    // duplicates included.
    pub async fn load_many<I>(&self, keys: I) -> Vec<LoadResult<V>>
    where
        I: IntoIterator<Item = K>,
    {
        // Register every key before the first suspension so they share a batch
        let tickets: Vec<Ticket<V>> = keys.into_iter().map(|key| self.enqueue(key)).collect();

        let mut results = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            results.push(ticket.resolve().await);
        }
        results
    }

    // Seeds the cache. An existing entry for `key` is left untouched.
    pub fn prime(&self, key: K, value: V) {
        self.inner.lock().cache.entry(key).or_insert(Ok(value));
    }

    fn enqueue(&self, key: K) -> Ticket<V> {
        let (rx, action) = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;

            if let Some(hit) = state.cache.get(&key) {
                LOADER_CACHE_HITS.with_label_values(&[self.inner.name]).inc();
                return Ticket::Ready(hit.clone());
            }

            let (tx, rx) = oneshot::channel();
            let action = match state.waiters.entry(key) {
                // Already queued or in flight: share its fetch
                Entry::Occupied(mut entry) => {
                    entry.get_mut().push(tx);
                    Action::Wait
                }
                Entry::Vacant(entry) => {
                    state.queued.push(entry.key().clone());
                    entry.insert(vec![tx]);

                    if state.queued.len() >= self.inner.config.max_batch_size.max(1) {
                        Action::DispatchNow(mem::take(&mut state.queued))
                    } else if state.queued.len() == 1 {
                        Action::Schedule
                    } else {
                        Action::Wait
                    }
                }
            };
            (rx, action)
        };

        match action {
            Action::DispatchNow(keys) => {
                tokio::spawn(self.inner.clone().dispatch(keys));
            }
            Action::Schedule => {
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    inner.coalesce().await;
                    let keys = mem::take(&mut inner.lock().queued);
                    // A full batch may already have taken everything
                    if !keys.is_empty() {
                        inner.dispatch(keys).await;
                    }
                });
            }
            Action::Wait => {}
        }

        Ticket::Pending(rx)
    }
}

impl<K, V, F> Inner<K, V, F>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Default + Send + 'static,
    F: BatchFn<K, V>,
{
    fn lock(&self) -> MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn coalesce(&self) {
        if self.config.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.config.delay).await;
        }
    }

    async fn dispatch(self: Arc<Self>, keys: Vec<K>) {
        let mut teardown = Teardown {
            inner: &self,
            keys: &keys,
            armed: true,
        };

        LOADER_DISPATCHES.with_label_values(&[self.name]).inc();
        LOADER_BATCH_SIZE
            .with_label_values(&[self.name])
            .observe(keys.len() as f64);
        debug!("{}: dispatching batch of {} keys", self.name, keys.len());

        let outcome = self.batch_fn.load(&keys).await;
        teardown.armed = false;
        self.resolve(&keys, outcome);
    }

    fn resolve(&self, keys: &[K], outcome: Result<HashMap<K, LoadResult<V>>, LoadError>) {
        let cache_failures = self.config.cache_failures;
        let mut state = self.lock();

        match outcome {
            Ok(mut found) => {
                for key in keys {
                    let result = found.remove(key).unwrap_or_else(|| Ok(V::default()));
                    if let Err(err) = &result {
                        LOADER_FAILURES.with_label_values(&[self.name]).inc();
                        warn!("{}: key {:?} failed: {}", self.name, key, err);
                    }
                    state.settle(key, result, cache_failures);
                }
            }
            Err(err) => {
                LOADER_FAILURES
                    .with_label_values(&[self.name])
                    .inc_by(keys.len() as u64);
                warn!("{}: batch of {} keys failed: {}", self.name, keys.len(), err);
                for key in keys {
                    state.settle(key, Err(err.clone()), cache_failures);
                }
            }
        }
    }
}

impl<K, V> State<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn settle(&mut self, key: &K, result: LoadResult<V>, cache_failures: bool) {
        if result.is_ok() || cache_failures {
            self.cache
                .entry(key.clone())
                .or_insert_with(|| result.clone());
        }
        for tx in self.waiters.remove(key).into_iter().flatten() {
            // The caller may have gone away; nothing to do then
            let _ = tx.send(result.clone());
        }
    }
}

// Drops the waiters of a dispatch that never reached `resolve` (panicking
// batch function, aborted task), which wakes them with `Cancelled`.
struct Teardown<'a, K, V, F>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Default + Send + 'static,
    F: BatchFn<K, V>,
{
    inner: &'a Inner<K, V, F>,
    keys: &'a [K],
    armed: bool,
}

impl<K, V, F> Drop for Teardown<'_, K, V, F>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Default + Send + 'static,
    F: BatchFn<K, V>,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(
            "{}: dispatch of {} keys cancelled",
            self.inner.name,
            self.keys.len()
        );
        let mut state = self.inner.lock();
        for key in self.keys {
            state.waiters.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::database::StoreError;

    // Echoes each key back as its value and journals every batch it sees
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Vec<i32>>>,
        skip: Vec<i32>,
        fail: bool,
        latency: Duration,
    }

    #[async_trait]
    impl BatchFn<i32, Option<i32>> for Arc<Recorder> {
        async fn load(&self, keys: &[i32]) -> Result<HashMap<i32, LoadResult<Option<i32>>>, LoadError> {
            let mut sorted = keys.to_vec();
            sorted.sort();
            self.calls.lock().unwrap().push(sorted);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            if self.fail {
                return Err(StoreError::Unavailable("connection refused".into()).into());
            }
            Ok(keys
                .iter()
                .filter(|key| !self.skip.contains(key))
                .map(|key| (*key, Ok(Some(key * 10))))
                .collect())
        }
    }

    impl Recorder {
        fn calls(&self) -> Vec<Vec<i32>> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn loader(recorder: &Arc<Recorder>, config: LoaderConfig) -> BatchLoader<i32, Option<i32>, Arc<Recorder>> {
        BatchLoader::new("test", recorder.clone(), config)
    }

    #[tokio::test]
    async fn test_duplicate_keys_share_one_fetch() {
        let recorder = Arc::new(Recorder::default());
        let loader = loader(&recorder, LoaderConfig::default());

        let (a, b, c) = tokio::join!(loader.load(7), loader.load(3), loader.load(7));

        assert_eq!(recorder.calls(), vec![vec![3, 7]]);
        assert_eq!(a.unwrap(), Some(70));
        assert_eq!(b.unwrap(), Some(30));
        assert_eq!(c.unwrap(), Some(70));
    }

    #[tokio::test]
    async fn test_resolved_key_is_served_from_cache() {
        let recorder = Arc::new(Recorder::default());
        let loader = loader(&recorder, LoaderConfig::default());

        assert_eq!(loader.load(5).await.unwrap(), Some(50));
        assert_eq!(loader.load(5).await.unwrap(), Some(50));
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_resolves_to_empty_value() {
        let recorder = Arc::new(Recorder {
            skip: vec![7],
            ..Default::default()
        });
        let loader = loader(&recorder, LoaderConfig::default());

        let (three, seven) = tokio::join!(loader.load(3), loader.load(7));

        assert_eq!(three.unwrap(), Some(30));
        assert_eq!(seven.unwrap(), None);
    }

    #[tokio::test]
    async fn test_batch_failure_reaches_every_waiter() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let loader = loader(&recorder, LoaderConfig::default());

        let (three, seven) = tokio::join!(loader.load(3), loader.load(7));

        let three = three.unwrap_err().to_string();
        let seven = seven.unwrap_err().to_string();
        assert!(three.contains("connection refused"));
        assert_eq!(three, seven);
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached_by_default() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let loader = loader(&recorder, LoaderConfig::default());

        assert!(loader.load(1).await.is_err());
        assert!(loader.load(1).await.is_err());
        assert_eq!(recorder.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failures_can_be_cached() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let config = LoaderConfig {
            cache_failures: true,
            ..Default::default()
        };
        let loader = loader(&recorder, config);

        assert!(loader.load(1).await.is_err());
        assert!(loader.load(1).await.is_err());
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_full_batch_dispatches_before_new_keys() {
        let recorder = Arc::new(Recorder::default());
        let config = LoaderConfig {
            max_batch_size: 2,
            ..Default::default()
        };
        let loader = loader(&recorder, config);

        let results = loader.load_many([1, 2, 3]).await;

        assert_eq!(recorder.calls(), vec![vec![1, 2], vec![3]]);
        assert_eq!(
            results.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
            vec![Some(10), Some(20), Some(30)]
        );
    }

    #[tokio::test]
    async fn test_load_many_keeps_order_and_duplicates() {
        let recorder = Arc::new(Recorder::default());
        let loader = loader(&recorder, LoaderConfig::default());

        let results = loader.load_many([4, 2, 4]).await;

        assert_eq!(recorder.calls(), vec![vec![2, 4]]);
        assert_eq!(
            results.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
            vec![Some(40), Some(20), Some(40)]
        );
    }

    #[tokio::test]
    async fn test_primed_key_skips_fetch() {
        let recorder = Arc::new(Recorder::default());
        let loader = loader(&recorder, LoaderConfig::default());

        loader.prime(9, Some(1));
        assert_eq!(loader.load(9).await.unwrap(), Some(1));
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_delay_still_coalesces() {
        let recorder = Arc::new(Recorder::default());
        let config = LoaderConfig {
            delay: Duration::ZERO,
            ..Default::default()
        };
        let loader = loader(&recorder, config);

        let _ = tokio::join!(loader.load(1), loader.load(2), loader.load(1));
        assert_eq!(recorder.calls(), vec![vec![1, 2]]);
    }

    #[tokio::test]
    async fn test_in_flight_key_is_joined() {
        let recorder = Arc::new(Recorder {
            latency: Duration::from_millis(50),
            ..Default::default()
        });
        let loader = Arc::new(loader(&recorder, LoaderConfig::default()));

        let first = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load(1).await }
        });
        // Wait until the batch function holds key 1
        while recorder.calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert_eq!(loader.load(1).await.unwrap(), Some(10));
        assert_eq!(first.await.unwrap().unwrap(), Some(10));
        assert_eq!(recorder.calls(), vec![vec![1]]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_loads_fetch_each_key_once() {
        let recorder = Arc::new(Recorder::default());
        let loader = Arc::new(loader(&recorder, LoaderConfig::default()));

        let handles: Vec<_> = (0..2000)
            .map(|i| {
                let loader = loader.clone();
                tokio::spawn(async move { (i % 97, loader.load(i % 97).await) })
            })
            .collect();
        for handle in handles {
            let (key, result) = handle.await.unwrap();
            assert_eq!(result.unwrap(), Some(key * 10));
        }

        let mut fetched: Vec<i32> = recorder.calls().into_iter().flatten().collect();
        fetched.sort();
        let total = fetched.len();
        fetched.dedup();
        assert_eq!(total, fetched.len());
        assert_eq!(fetched, (0..97).collect::<Vec<_>>());
    }

    struct Panicking(AtomicUsize);

    #[async_trait]
    impl BatchFn<i32, Option<i32>> for Arc<Panicking> {
        async fn load(&self, _keys: &[i32]) -> Result<HashMap<i32, LoadResult<Option<i32>>>, LoadError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            panic!("batch function blew up");
        }
    }

    #[tokio::test]
    async fn test_torn_down_dispatch_cancels_waiters() {
        let batch_fn = Arc::new(Panicking(AtomicUsize::new(0)));
        let loader: BatchLoader<i32, Option<i32>, _> =
            BatchLoader::new("panicking", batch_fn.clone(), LoaderConfig::default());

        let (a, b) = tokio::join!(loader.load(1), loader.load(2));

        assert!(matches!(a, Err(LoadError::Cancelled)));
        assert!(matches!(b, Err(LoadError::Cancelled)));
        assert_eq!(batch_fn.0.load(Ordering::SeqCst), 1);
    }
}
