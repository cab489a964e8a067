//! Keyed cache of asynchronous queries.
//!
//! A query is identified by a [`QueryKey`] and owns a fetcher plus an
//! enabled predicate. Its state walks `idle -> pending -> success | error` and
//! can re-enter `pending` on every refetch. Consumers either read snapshots
//! with [`Query::state`] or follow changes through [`Query::watch`].

use crate::result::{CloudError, CloudResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, CloudResult<T>> + Send + Sync>;
type Enabled = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub name: &'static str,
    pub user_id: Option<String>,
}

impl QueryKey {
    pub fn new(name: &'static str, user_id: Option<String>) -> Self {
        Self { name, user_id }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user_id {
            Some(user_id) => write!(f, "{}:{}", self.name, user_id),
            None => f.write_str(self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Idle,
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    /// Last successful payload; kept while a refetch is pending or failed.
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip)]
    pub fetch_count: u64,
}

impl<T> QueryState<T> {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            fetch_count: 0,
        }
    }

    /// Same state with the payload transformed, e.g. narrowed to one tenant.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        QueryState {
            status: self.status,
            data: self.data.map(f),
            error: self.error,
            fetch_count: self.fetch_count,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    pub fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Never fetched, or the last fetch failed.
    fn wants_fetch(&self) -> bool {
        self.is_idle() || self.is_error()
    }
}

struct QueryEntry<T> {
    key: QueryKey,
    state: watch::Sender<QueryState<T>>,
    fetcher: Fetcher<T>,
    enabled: Enabled,
    fetch_lock: Mutex<()>,
    // Refetch requests handed out so far.
    requested: AtomicU64,
    // Requests already covered by the most recent fetch to start.
    covered: AtomicU64,
    cancel: CancellationToken,
}

impl<T: Clone + Send + Sync + 'static> QueryEntry<T> {
    /// `force == false` only fetches while the state is still idle or failed
    /// once the fetch lock is held.
    async fn fetch(&self, force: bool) -> QueryState<T> {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = self.fetch_lock.lock().await;

        let still_wanted = self.state.borrow().wants_fetch();
        if self.covered.load(Ordering::SeqCst) >= ticket || (!force && !still_wanted) {
            tracing::trace!(key = %self.key, "Refetch coalesced into a newer fetch");
            return self.state.borrow().clone();
        }

        if self.cancel.is_cancelled() || !(self.enabled)() {
            return self.state.borrow().clone();
        }

        self.covered
            .store(self.requested.load(Ordering::SeqCst), Ordering::SeqCst);
        self.state.send_modify(|s| s.status = QueryStatus::Pending);
        tracing::debug!(key = %self.key, "Fetching query");

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CloudError::Cancelled),
            result = (self.fetcher)() => result,
        };

        match result {
            Err(CloudError::Cancelled) if self.cancel.is_cancelled() => {
                tracing::debug!(key = %self.key, "Query fetch cancelled");
            }
            Ok(data) => self.state.send_modify(|s| {
                s.status = QueryStatus::Success;
                s.data = Some(data);
                s.error = None;
                s.fetch_count += 1;
            }),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Query fetch failed");
                self.state.send_modify(|s| {
                    s.status = QueryStatus::Error;
                    s.error = Some(e.to_string());
                    s.fetch_count += 1;
                });
            }
        }

        self.state.borrow().clone()
    }
}

/// Handle to one cached query.
pub struct Query<T> {
    entry: Arc<QueryEntry<T>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Query<T> {
    pub fn key(&self) -> &QueryKey {
        &self.entry.key
    }

    pub fn state(&self) -> QueryState<T> {
        self.entry.state.borrow().clone()
    }

    /// Inspect the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&QueryState<T>) -> R) -> R {
        f(&self.entry.state.borrow())
    }

    pub fn watch(&self) -> watch::Receiver<QueryState<T>> {
        self.entry.state.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        (self.entry.enabled)()
    }

    /// Fetch now, unless disabled. Concurrent calls share fetches: a caller
    /// waits for the running fetch and only starts another one when nothing
    /// has started since its own request.
    pub async fn refetch(&self) -> QueryState<T> {
        self.entry.fetch(true).await
    }

    /// Fetch if the query has never run or its last fetch failed; otherwise
    /// return the current state untouched.
    pub async fn ensure(&self) -> QueryState<T> {
        let wanted = self.entry.state.borrow().wants_fetch();
        if wanted {
            return self.entry.fetch(false).await;
        }
        self.state()
    }
}

struct Slot {
    entry: Arc<dyn Any + Send + Sync>,
    cancel: CancellationToken,
}

/// Session-scoped collection of queries.
#[derive(Default)]
pub struct QueryCache {
    entries: DashMap<QueryKey, Slot>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the query stored under `key`, creating it with `fetcher` and
    /// `enabled` when absent. Nothing is fetched here.
    pub fn subscribe<T, F, Fut, E>(&self, key: QueryKey, fetcher: F, enabled: E) -> Query<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CloudResult<T>> + Send + 'static,
        E: Fn() -> bool + Send + Sync + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || fetcher().boxed());
        let enabled: Enabled = Arc::new(enabled);
        let build = |key: QueryKey| {
            let cancel = CancellationToken::new();
            let entry = Arc::new(QueryEntry {
                key,
                state: watch::channel(QueryState::idle()).0,
                fetcher: fetcher.clone(),
                enabled: enabled.clone(),
                fetch_lock: Mutex::new(()),
                requested: AtomicU64::new(0),
                covered: AtomicU64::new(0),
                cancel: cancel.clone(),
            });
            (entry, cancel)
        };

        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if let Ok(entry) = occupied.get().entry.clone().downcast::<QueryEntry<T>>() {
                    return Query { entry };
                }
                tracing::warn!(key = %key, "Query key reused with a different type, replacing");
                let (entry, cancel) = build(key);
                let old = occupied.insert(Slot {
                    entry: entry.clone(),
                    cancel,
                });
                old.cancel.cancel();
                Query { entry }
            }
            Entry::Vacant(vacant) => {
                let (entry, cancel) = build(key);
                vacant.insert(Slot {
                    entry: entry.clone(),
                    cancel,
                });
                Query { entry }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every query, cancelling in-flight fetches. Handles held by callers
    /// stay readable but never fetch again.
    pub fn clear(&self) {
        for slot in self.entries.iter() {
            slot.cancel.cancel();
        }
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    fn counting_fetcher(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn() -> BoxFuture<'static, CloudResult<usize>> + Send + Sync + 'static {
        move || {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn disabled_query_stays_idle() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let query = cache.subscribe(
            QueryKey::new("q", None),
            counting_fetcher(calls.clone()),
            || false,
        );

        let state = query.refetch().await;
        assert!(state.is_idle());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refetch_goes_through_pending_to_success() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let query = cache.subscribe(
            QueryKey::new("q", Some("u1".to_string())),
            counting_fetcher(calls.clone()),
            || true,
        );
        let mut rx = query.watch();

        let handle = tokio::spawn({
            let query = query.clone();
            async move { query.refetch().await }
        });

        rx.changed().await.unwrap();
        assert!(rx.borrow().is_pending());

        let state = handle.await.unwrap();
        assert!(state.is_success());
        assert_eq!(state.data, Some(1));
        assert_eq!(state.fetch_count, 1);
    }

    #[tokio::test]
    async fn error_keeps_previous_data() {
        let cache = QueryCache::new();
        let fail = Arc::new(AtomicBool::new(false));
        let query = cache.subscribe(
            QueryKey::new("q", None),
            {
                let fail = fail.clone();
                move || {
                    let fail = fail.load(Ordering::SeqCst);
                    async move {
                        if fail {
                            Err(CloudError::NoToken)
                        } else {
                            Ok("payload")
                        }
                    }
                }
            },
            || true,
        );

        assert!(query.refetch().await.is_success());
        fail.store(true, Ordering::SeqCst);

        let state = query.refetch().await;
        assert!(state.is_error());
        assert_eq!(state.error.as_deref(), Some("No token available"));
        assert_eq!(state.data, Some("payload"));
    }

    #[tokio::test]
    async fn ensure_retries_after_failure() {
        let cache = QueryCache::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let query = cache.subscribe(
            QueryKey::new("q", None),
            {
                let attempts = attempts.clone();
                move || {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt == 0 {
                            Err(CloudError::Network("refused".to_string()))
                        } else {
                            Ok(attempt)
                        }
                    }
                }
            },
            || true,
        );

        assert!(query.ensure().await.is_error());

        let state = query.ensure().await;
        assert!(state.is_success());
        assert_eq!(state.data, Some(1));

        query.ensure().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn subscribe_returns_existing_entry() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("q", None);

        let first = cache.subscribe(key.clone(), counting_fetcher(calls.clone()), || true);
        first.refetch().await;

        let second = cache.subscribe(key, counting_fetcher(calls.clone()), || true);
        assert_eq!(second.ensure().await.data, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn different_user_gets_separate_entry() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .subscribe(
                QueryKey::new("q", Some("a".to_string())),
                counting_fetcher(calls.clone()),
                || true,
            )
            .ensure()
            .await;
        let other = cache.subscribe(
            QueryKey::new("q", Some("b".to_string())),
            counting_fetcher(calls.clone()),
            || true,
        );

        assert!(other.state().is_idle());
        other.ensure().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_refetches_are_coalesced() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let query = cache.subscribe(
            QueryKey::new("q", None),
            counting_fetcher(calls.clone()),
            || true,
        );

        let (a, b, c) = tokio::join!(query.refetch(), query.refetch(), query.refetch());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.data, Some(1));
        assert_eq!(b.data, Some(2));
        assert_eq!(c.data, Some(2));
    }

    #[tokio::test]
    async fn concurrent_ensures_fetch_once() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let query = cache.subscribe(
            QueryKey::new("q", None),
            counting_fetcher(calls.clone()),
            || true,
        );

        let (a, b) = tokio::join!(query.ensure(), query.ensure());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.data, Some(1));
        assert_eq!(b.data, Some(1));
    }

    #[tokio::test]
    async fn clear_cancels_in_flight_fetch() {
        let cache = Arc::new(QueryCache::new());
        let query = cache.subscribe(
            QueryKey::new("slow", None),
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(1u8)
            },
            || true,
        );

        let handle = tokio::spawn({
            let query = query.clone();
            async move { query.refetch().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        cache.clear();
        let state = handle.await.unwrap();

        assert!(cache.is_empty());
        assert!(state.data.is_none());
        assert_ne!(state.status, QueryStatus::Success);
        assert!(query.refetch().await.data.is_none());
    }
}
