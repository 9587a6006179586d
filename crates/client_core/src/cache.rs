//! Keyed cache over a remote collection with revalidation.

use std::sync::Arc;

use shared::error::ApiError;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::CollectionFetcher;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const TASK_ERROR_CODE: &str = "task";

/// Snapshot of what the cache currently knows about its collection.
///
/// `is_loading` is only set while a request is in flight and no data has
/// been received yet. `is_validating` is set whenever any request is in
/// flight, so a refresh over existing data never looks like a first load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionState<T> {
    pub data: Option<Vec<T>>,
    pub is_loading: bool,
    pub is_validating: bool,
    pub error: Option<ApiError>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_validating: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchTrigger {
    Initial,
    Revalidate,
}

struct CacheInner<T> {
    state: CollectionState<T>,
    initialized: bool,
    next_seq: u64,
    applied_seq: u64,
    in_flight: usize,
}

impl<T> CacheInner<T> {
    fn refresh_flags(&mut self) {
        self.state.is_validating = self.in_flight > 0;
        self.state.is_loading = self.in_flight > 0 && self.state.data.is_none();
    }
}

pub struct CollectionCache<T> {
    key: String,
    fetcher: Arc<dyn CollectionFetcher<T>>,
    inner: Arc<Mutex<CacheInner<T>>>,
    events: broadcast::Sender<CollectionState<T>>,
}

impl<T> CollectionCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(key: impl Into<String>, fetcher: Arc<dyn CollectionFetcher<T>>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            key: key.into(),
            fetcher,
            inner: Arc::new(Mutex::new(CacheInner {
                state: CollectionState::default(),
                initialized: false,
                next_seq: 0,
                applied_seq: 0,
                in_flight: 0,
            })),
            events,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Performs the activation fetch.
    ///
    /// Only the first call issues a request; later calls (including ones
    /// racing the in-flight initial load) return the current snapshot.
    pub async fn initialize(&self) -> CollectionState<T> {
        {
            let mut guard = self.inner.lock().await;
            if guard.initialized {
                debug!(key = %self.key, "initial load already triggered");
                return guard.state.clone();
            }
            guard.initialized = true;
        }
        self.run_fetch(FetchTrigger::Initial).await
    }

    /// Re-fetches the collection regardless of any request already in flight.
    pub async fn revalidate(&self) -> CollectionState<T> {
        {
            let mut guard = self.inner.lock().await;
            guard.initialized = true;
        }
        self.run_fetch(FetchTrigger::Revalidate).await
    }

    pub async fn current_state(&self) -> CollectionState<T> {
        self.inner.lock().await.state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionState<T>> {
        self.events.subscribe()
    }

    /// Runs one fetch on its own task so the response settles the state
    /// even when the caller stops waiting for it.
    async fn run_fetch(&self, trigger: FetchTrigger) -> CollectionState<T> {
        let seq = {
            let mut guard = self.inner.lock().await;
            guard.next_seq += 1;
            guard.in_flight += 1;
            guard.refresh_flags();
            publish(&self.events, guard.state.clone());
            guard.next_seq
        };
        debug!(key = %self.key, seq, ?trigger, "fetching collection");

        let key = self.key.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let result = fetcher.fetch(&key).await;
            settle(&key, &inner, &events, seq, result).await
        });

        match task.await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let failure =
                    ApiError::new(TASK_ERROR_CODE, format!("collection fetch aborted: {err}"));
                settle(&self.key, &self.inner, &self.events, seq, Err(failure)).await
            }
        }
    }
}

async fn settle<T: Clone>(
    key: &str,
    inner: &Mutex<CacheInner<T>>,
    events: &broadcast::Sender<CollectionState<T>>,
    seq: u64,
    result: Result<Vec<T>, ApiError>,
) -> CollectionState<T> {
    let mut guard = inner.lock().await;
    guard.in_flight = guard.in_flight.saturating_sub(1);
    if seq > guard.applied_seq {
        guard.applied_seq = seq;
        match result {
            Ok(items) => {
                info!(key, seq, count = items.len(), "collection fetched");
                guard.state.data = Some(items);
                guard.state.error = None;
            }
            Err(err) => {
                warn!(
                    key,
                    seq,
                    code = %err.code,
                    "collection fetch failed: {}",
                    err.message
                );
                guard.state.error = Some(err);
            }
        }
    } else {
        debug!(
            key,
            seq,
            applied = guard.applied_seq,
            "discarding response older than the applied one"
        );
    }
    guard.refresh_flags();
    let snapshot = guard.state.clone();
    drop(guard);

    publish(events, snapshot.clone());
    snapshot
}

fn publish<T>(events: &broadcast::Sender<CollectionState<T>>, state: CollectionState<T>) {
    let _ = events.send(state);
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
