//! Memo table for query results.
//!
//! # Design
//! - Entries are keyed by `QueryKey`, which embeds every parameter that
//!   affects the response. Different pages never share an entry.
//! - Per key at most one fetch runs; callers queued behind it take its
//!   outcome instead of issuing their own request.
//! - A successful entry is served without refetching until it is older than
//!   the staleness window or has been invalidated.
//! - Values are type-erased so one table serves every resource type.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};
use tunedeck_api_models::{PageParams, ResourceKind};

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{ApiError, FetchError};
use crate::state::QueryState;

/// Which endpoint family a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryScope {
    /// Token validation.
    Token,
    /// Saved-library collection.
    Library(ResourceKind),
    /// Unpaginated browse collection.
    Browse(ResourceKind),
    /// One page of a paginated browse collection.
    BrowsePage(ResourceKind),
    /// Tracks of a single playlist.
    PlaylistTracks,
    /// Saved-library counts.
    SavedCounts,
}

/// Normalized identity of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    scope: QueryScope,
    id: Option<String>,
    limit: Option<u32>,
    page: Option<PageParams>,
}

impl QueryKey {
    const fn scoped(scope: QueryScope) -> Self {
        Self {
            scope,
            id: None,
            limit: None,
            page: None,
        }
    }

    /// Key of the token validation query.
    #[must_use]
    pub const fn token() -> Self {
        Self::scoped(QueryScope::Token)
    }

    /// Key of a saved-library query.
    #[must_use]
    pub const fn library(kind: ResourceKind, limit: Option<u32>) -> Self {
        Self {
            scope: QueryScope::Library(kind),
            id: None,
            limit,
            page: None,
        }
    }

    /// Key of an unpaginated browse query.
    #[must_use]
    pub const fn browse(kind: ResourceKind) -> Self {
        Self::scoped(QueryScope::Browse(kind))
    }

    /// Key of one page of a paginated browse query.
    #[must_use]
    pub const fn browse_page(kind: ResourceKind, params: PageParams) -> Self {
        Self {
            scope: QueryScope::BrowsePage(kind),
            id: None,
            limit: None,
            page: Some(params),
        }
    }

    /// Key of a playlist tracks query.
    #[must_use]
    pub fn playlist_tracks(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::scoped(QueryScope::PlaylistTracks)
        }
    }

    /// Key of the saved counts query.
    #[must_use]
    pub const fn saved_counts() -> Self {
        Self::scoped(QueryScope::SavedCounts)
    }

    /// Endpoint family.
    #[must_use]
    pub const fn scope(&self) -> QueryScope {
        self.scope
    }

    /// Entity identifier, for single-entity queries.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Page parameters, for paginated queries.
    #[must_use]
    pub const fn page(&self) -> Option<PageParams> {
        self.page
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.scope {
            QueryScope::Token => f.write_str("token")?,
            QueryScope::Library(kind) => write!(f, "{kind}")?,
            QueryScope::Browse(kind) => write!(f, "{kind}-browser")?,
            QueryScope::BrowsePage(kind) => write!(f, "browser/{kind}")?,
            QueryScope::PlaylistTracks => f.write_str("playlist")?,
            QueryScope::SavedCounts => f.write_str("saved-counts")?,
        }
        if let Some(id) = &self.id {
            write!(f, "/{id}")?;
        }
        if let Some(limit) = self.limit {
            write!(f, "?limit={limit}")?;
        }
        if let Some(page) = self.page {
            write!(f, "?page={}&page_size={}", page.page, page.page_size)?;
        }
        Ok(())
    }
}

/// Freshness and retry settings applied to one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Age after which a cached success is refetched.
    pub stale_time: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl CachePolicy {
    /// Policy for generic resource queries.
    #[must_use]
    pub const fn from_config(config: &ClientConfig) -> Self {
        Self {
            stale_time: config.stale_time,
            retry: config.retry,
        }
    }

    /// Policy for token validation: same staleness, never retried.
    #[must_use]
    pub const fn token_validation(config: &ClientConfig) -> Self {
        Self {
            stale_time: config.stale_time,
            retry: RetryPolicy::none(),
        }
    }
}

type CachedValue = Arc<dyn Any + Send + Sync>;

enum Outcome {
    Ready {
        value: CachedValue,
        fetched_at: Instant,
    },
    Failed(FetchError),
}

#[derive(Default)]
struct SlotState {
    outcome: Option<Outcome>,
    generation: u64,
    fetching: bool,
    invalidated: bool,
}

#[derive(Default)]
struct Slot {
    gate: tokio::sync::Mutex<()>,
    state: Mutex<SlotState>,
}

impl Slot {
    fn state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.state().generation
    }

    fn fresh<T: Send + Sync + 'static>(&self, stale_time: Duration) -> Option<Arc<T>> {
        let state = self.state();
        if state.invalidated {
            return None;
        }
        match &state.outcome {
            Some(Outcome::Ready { value, fetched_at }) if fetched_at.elapsed() < stale_time => {
                Arc::clone(value).downcast::<T>().ok()
            }
            _ => None,
        }
    }

    fn latest<T: Send + Sync + 'static>(&self) -> Option<Result<Arc<T>, FetchError>> {
        match &self.state().outcome {
            Some(Outcome::Ready { value, .. }) => Arc::clone(value).downcast::<T>().ok().map(Ok),
            Some(Outcome::Failed(error)) => Some(Err(error.clone())),
            None => None,
        }
    }

    /// Outcome a caller holding the gate can reuse instead of fetching: a
    /// fresh value, or whatever a fetch completed after `observed` recorded.
    fn settled_since<T: Send + Sync + 'static>(
        &self,
        observed: u64,
        stale_time: Duration,
    ) -> Option<Result<Arc<T>, FetchError>> {
        if let Some(value) = self.fresh::<T>(stale_time) {
            return Some(Ok(value));
        }
        if self.generation() == observed {
            return None;
        }
        self.latest::<T>()
    }

    fn finish<T: Send + Sync + 'static>(
        &self,
        result: Result<T, ApiError>,
    ) -> Result<Arc<T>, FetchError> {
        let mut state = self.state();
        state.generation += 1;
        state.invalidated = false;
        match result {
            Ok(value) => {
                let value = Arc::new(value);
                let erased: CachedValue = value.clone();
                state.outcome = Some(Outcome::Ready {
                    value: erased,
                    fetched_at: Instant::now(),
                });
                Ok(value)
            }
            Err(err) => {
                let error = FetchError::from(&err);
                state.outcome = Some(Outcome::Failed(error.clone()));
                Err(error)
            }
        }
    }
}

struct FetchingGuard<'a>(&'a Slot);

impl<'a> FetchingGuard<'a> {
    fn enter(slot: &'a Slot) -> Self {
        slot.state().fetching = true;
        Self(slot)
    }
}

impl Drop for FetchingGuard<'_> {
    fn drop(&mut self) {
        self.0.state().fetching = false;
    }
}

/// Process-wide memo table shared by every query.
#[derive(Default)]
pub struct QueryCache {
    slots: Mutex<HashMap<QueryKey, Arc<Slot>>>,
}

impl Debug for QueryCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl QueryCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<QueryKey, Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, key: &QueryKey) -> Arc<Slot> {
        Arc::clone(self.slots().entry(key.clone()).or_default())
    }

    fn existing(&self, key: &QueryKey) -> Option<Arc<Slot>> {
        self.slots().get(key).cloned()
    }

    /// Return the cached value for `key`, or run `fetcher` to produce it.
    ///
    /// Transient failures are retried per `policy.retry`. The final outcome,
    /// success or failure, is recorded for the key and handed to every caller
    /// that queued behind the fetch.
    ///
    /// # Errors
    ///
    /// Returns the recorded fetch error when the final attempt failed.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        policy: &CachePolicy,
        fetcher: F,
    ) -> Result<Arc<T>, FetchError>
    where
        T: Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let slot = self.slot(&key);
        if let Some(value) = slot.fresh::<T>(policy.stale_time) {
            debug!(%key, "serving cached result");
            return Ok(value);
        }

        let observed = slot.generation();
        let _gate = slot.gate.lock().await;
        if let Some(shared) = slot.settled_since::<T>(observed, policy.stale_time) {
            debug!(%key, "sharing result of concurrent fetch");
            return shared;
        }

        let _fetching = FetchingGuard::enter(&slot);
        debug!(%key, "fetching");
        let result = run_with_retry(&key, &policy.retry, fetcher).await;
        if let Err(err) = &result {
            warn!(%key, error = %err, status = ?err.status(), "query failed");
        }
        slot.finish(result)
    }

    /// Current state for `key` without fetching.
    #[must_use]
    pub fn state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<Arc<T>> {
        match self.existing(key).and_then(|slot| slot.latest::<T>()) {
            Some(Ok(value)) => QueryState::Success(value),
            Some(Err(error)) => QueryState::Error(error),
            None => QueryState::Loading,
        }
    }

    /// Whether a fetch for `key` is in flight.
    #[must_use]
    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.existing(key).is_some_and(|slot| slot.state().fetching)
    }

    /// Mark `key` stale so the next read refetches. Returns whether an entry
    /// existed.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        self.invalidate_where(|candidate| candidate == key) > 0
    }

    /// Mark every entry matching `predicate` stale. Returns the count.
    pub fn invalidate_where(&self, predicate: impl Fn(&QueryKey) -> bool) -> usize {
        let slots = self.slots();
        let mut count = 0;
        for (key, slot) in slots.iter().filter(|(key, _)| predicate(key)) {
            slot.state().invalidated = true;
            debug!(%key, "invalidated");
            count += 1;
        }
        count
    }

    /// Mark every entry stale.
    pub fn invalidate_all(&self) -> usize {
        self.invalidate_where(|_| true)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.slots().clear();
    }

    /// Number of keys with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// Whether no key has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }
}

async fn run_with_retry<T, F, Fut>(
    key: &QueryKey,
    retry: &RetryPolicy,
    mut fetcher: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retry.max_retries && err.is_transient() => {
                let delay = retry.delay_for(attempt);
                attempt += 1;
                warn!(
                    %key,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "retrying query"
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
