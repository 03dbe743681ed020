//! Per-query fetch cache.
//!
//! Keyed by a stable query key (operation name + parameters). Concurrent
//! subscriptions to the same key attach to the one in-flight request
//! instead of dispatching another. Results are held until refetched or
//! until the last interested handle drops, which cancels any in-flight
//! fetch and evicts the slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::ApiError;

/// Tagged state of an async read.
#[derive(Debug, Clone)]
pub enum QueryState<T> {
    Pending,
    Success(T),
    Failure(ApiError),
}

impl<T> QueryState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, QueryState::Pending)
    }
}

type Loader<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;
type Slots<T> = Arc<Mutex<HashMap<String, Slot<T>>>>;

struct Slot<T> {
    tx: watch::Sender<QueryState<T>>,
    cancel: CancellationToken,
    loader: Loader<T>,
    interest: usize,
}

/// Cache of asynchronous reads, one slot per query key.
///
/// One cache instance serves one payload type; the session manager holds a
/// `QueryCache<User>`, the dashboard a `QueryCache<Vec<FeedbackItem>>`.
pub struct QueryCache<T> {
    slots: Slots<T>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QueryCache<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns true if a slot exists for the key.
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.slots).contains_key(key)
    }
}

impl<T: Clone + Send + Sync + 'static> QueryCache<T> {
    /// Subscribes to a query, registering interest in its key.
    ///
    /// If the key is already cached (pending or completed) the handle
    /// attaches to the existing slot; otherwise the loader is invoked once
    /// in a background task. The loader is retained for [`Self::refetch`].
    pub fn subscribe<F>(&self, key: &str, loader: F) -> QueryHandle<T>
    where
        F: Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync + 'static,
    {
        let mut slots = lock(&self.slots);

        if let Some(slot) = slots.get_mut(key) {
            slot.interest += 1;
            return QueryHandle {
                key: key.to_string(),
                rx: slot.tx.subscribe(),
                slots: Arc::clone(&self.slots),
            };
        }

        let (tx, rx) = watch::channel(QueryState::Pending);
        let cancel = CancellationToken::new();
        let loader: Loader<T> = Arc::new(loader);

        spawn_fetch(key, tx.clone(), Arc::clone(&loader), cancel.clone());
        slots.insert(
            key.to_string(),
            Slot {
                tx,
                cancel,
                loader,
                interest: 1,
            },
        );

        QueryHandle {
            key: key.to_string(),
            rx,
            slots: Arc::clone(&self.slots),
        }
    }

    /// Re-invokes the stored loader for a key, replacing the cached result
    /// when it resolves.
    ///
    /// Returns false if the key is unknown or a fetch is already in flight
    /// (deduplication applies to refetches too).
    pub fn refetch(&self, key: &str) -> bool {
        let mut slots = lock(&self.slots);
        let Some(slot) = slots.get_mut(key) else {
            return false;
        };
        if slot.tx.borrow().is_pending() {
            return false;
        }

        // The previous fetch already completed; a fresh token scopes the new one.
        slot.cancel = CancellationToken::new();
        let _ = slot.tx.send(QueryState::Pending);
        spawn_fetch(key, slot.tx.clone(), Arc::clone(&slot.loader), slot.cancel.clone());
        true
    }
}

/// Runs one fetch to completion unless cancelled first.
///
/// A cancelled fetch never writes a result back; the slot is gone by then.
fn spawn_fetch<T: Clone + Send + Sync + 'static>(
    key: &str,
    tx: watch::Sender<QueryState<T>>,
    loader: Loader<T>,
    cancel: CancellationToken,
) {
    let key = key.to_string();
    tokio::spawn(async move {
        let fut = loader();
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(key, "query cancelled before completion");
            }
            result = fut => {
                let state = match result {
                    Ok(value) => QueryState::Success(value),
                    Err(e) => {
                        debug!(key, error = %e, "query failed");
                        QueryState::Failure(e)
                    }
                };
                let _ = tx.send(state);
            }
        }
    });
}

/// A consumer's interest in one cached query.
///
/// Dropping the last handle for a key cancels any in-flight fetch and
/// evicts the slot.
pub struct QueryHandle<T> {
    key: String,
    rx: watch::Receiver<QueryState<T>>,
    slots: Slots<T>,
}

impl<T: Clone> QueryHandle<T> {
    /// Returns the current state without waiting.
    pub fn current(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the next settled state (success or failure).
    pub async fn wait(&mut self) -> QueryState<T> {
        loop {
            {
                let state = self.rx.borrow_and_update();
                if !state.is_pending() {
                    return state.clone();
                }
            }
            if self.rx.changed().await.is_err() {
                // Sender gone; whatever is left is final.
                return self.rx.borrow().clone();
            }
        }
    }
}

impl<T> Drop for QueryHandle<T> {
    fn drop(&mut self) {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.interest -= 1;
            if slot.interest == 0 {
                slot.cancel.cancel();
                slots.remove(&self.key);
            }
        }
    }
}

fn lock<T>(slots: &Slots<T>) -> MutexGuard<'_, HashMap<String, Slot<T>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::FutureExt;
    use tokio::sync::Notify;

    use super::*;

    /// Test: a default-constructed cache works for any payload type and
    /// starts empty.
    #[test]
    fn test_default_cache_is_empty() {
        struct NotClone;
        let typed: QueryCache<NotClone> = QueryCache::default();
        assert!(!typed.contains("anything"));

        let cache: QueryCache<u32> = QueryCache::default();
        assert!(!cache.contains("answer"));
    }

    /// Test: two concurrent subscriptions dispatch exactly one request.
    #[tokio::test]
    async fn test_dedup_single_dispatch() {
        let cache: QueryCache<u32> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let loader = {
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    Ok(7)
                }
                .boxed()
            }
        };

        let mut first = cache.subscribe("answer", loader.clone());
        let mut second = cache.subscribe("answer", loader);
        assert!(first.current().is_pending());
        assert!(second.current().is_pending());

        gate.notify_one();

        assert!(matches!(first.wait().await, QueryState::Success(7)));
        assert!(matches!(second.wait().await, QueryState::Success(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Test: loader failures surface as Failure, not a panic.
    #[tokio::test]
    async fn test_failure_captured() {
        let cache: QueryCache<u32> = QueryCache::new();
        let mut handle = cache.subscribe("broken", || {
            async { Err(ApiError::Network("connection refused".to_string())) }.boxed()
        });

        match handle.wait().await {
            QueryState::Failure(ApiError::Network(msg)) => {
                assert!(msg.contains("connection refused"));
            }
            other => panic!("expected network failure, got {other:?}"),
        }
    }

    /// Test: a completed result is served from cache to later subscribers.
    #[tokio::test]
    async fn test_completed_result_served_from_cache() {
        let cache: QueryCache<u32> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let loader = {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(1) }.boxed()
            }
        };

        let mut first = cache.subscribe("once", loader.clone());
        assert!(matches!(first.wait().await, QueryState::Success(1)));

        let second = cache.subscribe("once", loader);
        assert!(matches!(second.current(), QueryState::Success(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Test: refetch re-invokes the loader and replaces the result.
    #[tokio::test]
    async fn test_refetch_replaces_result() {
        let cache: QueryCache<usize> = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let loader = {
            let calls = Arc::clone(&calls);
            move || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n) }.boxed()
            }
        };

        let mut handle = cache.subscribe("counter", loader);
        assert!(matches!(handle.wait().await, QueryState::Success(1)));

        assert!(cache.refetch("counter"));
        assert!(matches!(handle.wait().await, QueryState::Success(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Test: refetch is a no-op while the key is still pending.
    #[tokio::test]
    async fn test_refetch_dedups_pending() {
        let cache: QueryCache<u32> = QueryCache::new();
        let gate = Arc::new(Notify::new());

        let loader = {
            let gate = Arc::clone(&gate);
            move || {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    Ok(0)
                }
                .boxed()
            }
        };

        let mut handle = cache.subscribe("slow", loader);
        assert!(!cache.refetch("slow"));
        assert!(!cache.refetch("missing-key"));

        gate.notify_one();
        assert!(matches!(handle.wait().await, QueryState::Success(0)));
    }

    /// Test: dropping the last handle cancels the fetch and evicts the slot.
    #[tokio::test]
    async fn test_last_drop_evicts_and_cancels() {
        let cache: QueryCache<u32> = QueryCache::new();

        let never = || std::future::pending().boxed();
        let first = cache.subscribe("stuck", never);
        let second = cache.subscribe("stuck", never);
        assert!(cache.contains("stuck"));

        drop(first);
        assert!(cache.contains("stuck"), "one handle still interested");

        drop(second);
        assert!(!cache.contains("stuck"), "last drop evicts the slot");

        // A fresh subscription starts a fresh fetch.
        let mut retry = cache.subscribe("stuck", || async { Ok(9) }.boxed());
        assert!(matches!(retry.wait().await, QueryState::Success(9)));
    }
}
