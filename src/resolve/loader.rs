//! Per-request key batching and caching
//!
//! A [`BatchLoader`] collects the keys submitted during a short window and
//! hands them to its [`BatchFn`] in a single call. Results (errors
//! included) are cached for the lifetime of the loader, so a loader should
//! live no longer than the request it serves.
//!
//! Phases: Idle -> Accumulating (first key queued, window timer armed) ->
//! Dispatching (keys handed to the batch function) -> Idle. A batch is
//! dispatched when its window elapses or when it reaches `batch_size`,
//! whichever comes first.

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use std::mem;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-key failure; cloned to every caller waiting on the key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("load failed: {0}")]
    Failed(String),

    #[error("batch function returned no result for this key")]
    MissingResult,

    #[error("request cancelled while waiting for batch")]
    Cancelled,
}

pub type LoadResult<V> = Result<V, LoadError>;

/// Bulk lookup invoked once per batch.
///
/// Must accept any subset of keys, unknown ones included, and return one
/// result per key in the same order as `keys`.
#[async_trait]
pub trait BatchFn<K, V>: Send + Sync {
    async fn load_batch(&self, keys: &[K]) -> Vec<LoadResult<V>>;
}

/// Batching parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Dispatch as soon as this many distinct keys are queued
    pub batch_size: usize,
    /// How long the first key of a batch waits for company
    pub window: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            window: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoaderPhase {
    Idle,
    Accumulating,
    Dispatching,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderStats {
    pub batches_dispatched: u64,
    pub keys_dispatched: u64,
}

type Waiter<V> = oneshot::Sender<LoadResult<V>>;

/// Keys handed to the batch function in one call
struct Batch<K> {
    id: u64,
    keys: Vec<K>,
}

struct LoaderState<K, V> {
    cache: FxHashMap<K, LoadResult<V>>,
    /// Keys of the batch currently accumulating, in submission order
    pending: Vec<K>,
    /// Callers per key, for both accumulating and in-flight keys
    waiters: FxHashMap<K, Vec<Waiter<V>>>,
    /// Batch each in-flight key belongs to
    in_flight_keys: FxHashMap<K, u64>,
    /// Callers of in-flight keys cleared before their batch returned,
    /// by batch id. They still get that batch's result; the cache does not.
    detached: FxHashMap<u64, Vec<(K, Vec<Waiter<V>>)>>,
    batch_started: Option<Instant>,
    /// Bumped per accumulating batch so stale timers do nothing
    generation: u64,
    last_batch_id: u64,
    in_flight: usize,
    stats: LoaderStats,
}

impl<K, V> Default for LoaderState<K, V> {
    fn default() -> Self {
        Self {
            cache: FxHashMap::default(),
            pending: Vec::new(),
            waiters: FxHashMap::default(),
            in_flight_keys: FxHashMap::default(),
            detached: FxHashMap::default(),
            batch_started: None,
            generation: 0,
            last_batch_id: 0,
            in_flight: 0,
            stats: LoaderStats::default(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> LoaderState<K, V> {
    /// Close the accumulating batch and mark it in flight
    fn take_batch(&mut self) -> Batch<K> {
        self.batch_started = None;
        self.in_flight += 1;
        self.last_batch_id += 1;
        let id = self.last_batch_id;
        let keys = mem::take(&mut self.pending);
        for key in &keys {
            self.in_flight_keys.insert(key.clone(), id);
        }
        Batch { id, keys }
    }

    /// Unhook an in-flight key so the next load of it starts a fresh batch
    fn detach(&mut self, key: &K) {
        if let Some(batch_id) = self.in_flight_keys.remove(key) {
            let waiters = self.waiters.remove(key).unwrap_or_default();
            self.detached
                .entry(batch_id)
                .or_default()
                .push((key.clone(), waiters));
        }
    }
}

struct LoaderInner<K, V> {
    batch_fn: Arc<dyn BatchFn<K, V>>,
    config: LoaderConfig,
    state: Mutex<LoaderState<K, V>>,
}

impl<K, V> LoaderInner<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, LoaderState<K, V>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fires once the window of batch `generation` has elapsed
    async fn run_timer(self: Arc<Self>, generation: u64) {
        tokio::time::sleep(self.config.window).await;
        let batch = {
            let mut state = self.lock();
            if state.generation != generation || state.pending.is_empty() {
                return;
            }
            state.take_batch()
        };
        self.dispatch(batch).await;
    }

    /// Run one batch against the batch function and fan results out
    async fn dispatch(self: Arc<Self>, batch: Batch<K>) {
        let started = Instant::now();
        debug!("Dispatching batch of {} keys", batch.keys.len());

        let outcome = AssertUnwindSafe(self.batch_fn.load_batch(&batch.keys))
            .catch_unwind()
            .await;
        let results = match outcome {
            Ok(results) => {
                if results.len() != batch.keys.len() {
                    warn!(
                        "Batch function returned {} results for {} keys",
                        results.len(),
                        batch.keys.len()
                    );
                }
                Some(results)
            }
            Err(_) => {
                warn!("Batch function panicked; failing {} keys", batch.keys.len());
                None
            }
        };

        self.complete(batch, results);
        debug!("Batch completed in {:?}", started.elapsed());
    }

    /// Deliver a batch's outcome. `None` means the batch function panicked:
    /// every caller gets `Failed` and nothing is cached.
    fn complete(&self, batch: Batch<K>, results: Option<Vec<LoadResult<V>>>) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.stats.batches_dispatched += 1;
        state.stats.keys_dispatched += batch.keys.len() as u64;

        let mut detached: FxHashMap<K, Vec<Waiter<V>>> = state
            .detached
            .remove(&batch.id)
            .unwrap_or_default()
            .into_iter()
            .collect();
        let cacheable = results.is_some();
        let mut results = results.map(Vec::into_iter);

        for key in batch.keys {
            let result = match results.as_mut() {
                Some(results) => results.next().unwrap_or(Err(LoadError::MissingResult)),
                None => Err(LoadError::Failed("batch function panicked".to_string())),
            };

            let current = state.in_flight_keys.get(&key) == Some(&batch.id);
            let waiters = if current {
                state.in_flight_keys.remove(&key);
                state.waiters.remove(&key).unwrap_or_default()
            } else {
                detached.remove(&key).unwrap_or_default()
            };
            for waiter in waiters {
                // receiver gone means the caller was cancelled
                let _ = waiter.send(result.clone());
            }

            if current && cacheable {
                state.cache.insert(key, result);
            }
        }
    }
}

/// Coalesces single-key loads into batched calls, with a per-instance cache
pub struct BatchLoader<K, V> {
    inner: Arc<LoaderInner<K, V>>,
}

impl<K, V> Clone for BatchLoader<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> BatchLoader<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a loader; a zero batch size is treated as one
    pub fn new(batch_fn: Arc<dyn BatchFn<K, V>>, config: LoaderConfig) -> Self {
        let config = LoaderConfig {
            batch_size: config.batch_size.max(1),
            window: config.window,
        };
        Self {
            inner: Arc::new(LoaderInner {
                batch_fn,
                config,
                state: Mutex::new(LoaderState::default()),
            }),
        }
    }

    pub fn config(&self) -> LoaderConfig {
        self.inner.config
    }

    /// Load one key. Never cancelled; see [`BatchLoader::load_cancellable`].
    pub async fn load(&self, key: K) -> LoadResult<V> {
        self.load_cancellable(key, &CancellationToken::new()).await
    }

    /// Load one key, giving up with [`LoadError::Cancelled`] when `cancel`
    /// fires. A batch already handed to the batch function still runs to
    /// completion and its results are cached.
    pub async fn load_cancellable(&self, key: K, cancel: &CancellationToken) -> LoadResult<V> {
        let receiver = match self.enqueue(key) {
            Enqueued::Cached(result) => return result,
            Enqueued::Waiting(receiver) => receiver,
        };

        tokio::select! {
            result = receiver => result.unwrap_or(Err(LoadError::Cancelled)),
            _ = cancel.cancelled() => {
                debug!("Load cancelled while waiting for batch");
                Err(LoadError::Cancelled)
            }
        }
    }

    /// Load several keys; they share batches with each other and with any
    /// concurrent callers. Results are positionally aligned with `keys`.
    pub async fn load_many(&self, keys: &[K]) -> Vec<LoadResult<V>> {
        join_all(keys.iter().cloned().map(|key| self.load(key))).await
    }

    pub async fn load_many_cancellable(
        &self,
        keys: &[K],
        cancel: &CancellationToken,
    ) -> Vec<LoadResult<V>> {
        join_all(
            keys.iter()
                .cloned()
                .map(|key| self.load_cancellable(key, cancel)),
        )
        .await
    }

    fn enqueue(&self, key: K) -> Enqueued<V> {
        let inner = &self.inner;
        let mut state = inner.lock();

        if let Some(hit) = state.cache.get(&key) {
            return Enqueued::Cached(hit.clone());
        }

        let (sender, receiver) = oneshot::channel();
        if let Some(waiters) = state.waiters.get_mut(&key) {
            waiters.push(sender);
            return Enqueued::Waiting(receiver);
        }

        // A batch whose window already elapsed goes out before this key
        // starts the next one.
        let window_elapsed = state
            .batch_started
            .map_or(false, |started| started.elapsed() >= inner.config.window);
        if window_elapsed && !state.pending.is_empty() {
            let batch = state.take_batch();
            tokio::spawn(Arc::clone(inner).dispatch(batch));
        }

        state.waiters.insert(key.clone(), vec![sender]);
        state.pending.push(key);

        if state.pending.len() == 1 {
            state.batch_started = Some(Instant::now());
            state.generation += 1;
            tokio::spawn(Arc::clone(inner).run_timer(state.generation));
        }

        if state.pending.len() >= inner.config.batch_size {
            let batch = state.take_batch();
            tokio::spawn(Arc::clone(inner).dispatch(batch));
        }

        Enqueued::Waiting(receiver)
    }

    /// Seed the cache without a batch call; an existing entry wins
    pub fn prime(&self, key: K, value: V) {
        self.inner.lock().cache.entry(key).or_insert(Ok(value));
    }

    /// Forget one cached key. A batch already in flight for it still
    /// answers its current callers, but later loads start a fresh batch.
    pub fn clear(&self, key: &K) {
        let mut state = self.inner.lock();
        state.cache.remove(key);
        state.detach(key);
    }

    /// Forget every cached key, detaching in-flight ones as in [`BatchLoader::clear`]
    pub fn clear_all(&self) {
        let mut state = self.inner.lock();
        state.cache.clear();
        let in_flight: Vec<K> = state.in_flight_keys.keys().cloned().collect();
        for key in &in_flight {
            state.detach(key);
        }
    }

    pub fn is_cached(&self, key: &K) -> bool {
        self.inner.lock().cache.contains_key(key)
    }

    pub fn phase(&self) -> LoaderPhase {
        let state = self.inner.lock();
        if !state.pending.is_empty() {
            LoaderPhase::Accumulating
        } else if state.in_flight > 0 {
            LoaderPhase::Dispatching
        } else {
            LoaderPhase::Idle
        }
    }

    pub fn stats(&self) -> LoaderStats {
        self.inner.lock().stats
    }
}

enum Enqueued<V> {
    Cached(LoadResult<V>),
    Waiting(oneshot::Receiver<LoadResult<V>>),
}
