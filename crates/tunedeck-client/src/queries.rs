//! Per-resource queries over the shared cache, plus the token validator.
//!
//! # Design
//! - Every query reads the token at call time and runs through `QueryCache`,
//!   so a missing token is recorded as an error without touching the network.
//! - Generic queries use the configured staleness and retry policy; token
//!   validation never retries.
//! - Replacing the token drops every cached entry.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use tunedeck_api_models::{
    LibraryCounts, PageParams, PaginatedResponse, PlaylistDetail, Resource, ResourceKind,
    TokenValidation,
};

use crate::cache::{CachePolicy, QueryCache, QueryKey};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::fetch::ApiClient;
use crate::state::QueryState;
use crate::token::{TokenStore, TokenStoreError};

/// Entry point for every dashboard query.
#[derive(Debug)]
pub struct LibraryQueries {
    api: ApiClient,
    tokens: Arc<TokenStore>,
    cache: QueryCache,
    policy: CachePolicy,
    token_policy: CachePolicy,
}

impl LibraryQueries {
    /// Assemble queries over an existing client and token store.
    #[must_use]
    pub fn new(api: ApiClient, tokens: Arc<TokenStore>, config: &ClientConfig) -> Self {
        Self {
            api,
            tokens,
            cache: QueryCache::new(),
            policy: CachePolicy::from_config(config),
            token_policy: CachePolicy::token_validation(config),
        }
    }

    /// Build the HTTP client from `config` and assemble queries over it.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        Ok(Self::new(ApiClient::new(config)?, tokens, config))
    }

    /// Token store backing every query.
    #[must_use]
    pub const fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Shared result cache.
    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Saved-library collection for `kind`.
    pub async fn library<T>(
        &self,
        kind: ResourceKind,
        limit: Option<u32>,
    ) -> QueryState<Arc<Resource<T>>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let token = self.tokens.get_token();
        let api = &self.api;
        self.cache
            .fetch(QueryKey::library(kind, limit), &self.policy, || {
                let token = token.clone();
                async move { api.fetch_resource::<T>(kind, token.as_deref(), limit).await }
            })
            .await
            .into()
    }

    /// Unpaginated browse collection for `kind`.
    pub async fn browse<T>(&self, kind: ResourceKind) -> QueryState<Arc<Resource<T>>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let token = self.tokens.get_token();
        let api = &self.api;
        self.cache
            .fetch(QueryKey::browse(kind), &self.policy, || {
                let token = token.clone();
                async move { api.browse_resource::<T>(kind, token.as_deref()).await }
            })
            .await
            .into()
    }

    /// One page of the paginated browse collection for `kind`.
    pub async fn paginated_browser<T>(
        &self,
        kind: ResourceKind,
        params: PageParams,
    ) -> QueryState<Arc<PaginatedResponse<T>>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let token = self.tokens.get_token();
        let api = &self.api;
        self.cache
            .fetch(QueryKey::browse_page(kind, params), &self.policy, || {
                let token = token.clone();
                async move { api.browse_paginated::<T>(kind, token.as_deref(), params).await }
            })
            .await
            .into()
    }

    /// Playlist header and tracks.
    pub async fn playlist_tracks(&self, id: &str) -> QueryState<Arc<PlaylistDetail>> {
        let token = self.tokens.get_token();
        let api = &self.api;
        self.cache
            .fetch(QueryKey::playlist_tracks(id), &self.policy, || {
                let token = token.clone();
                async move { api.fetch_playlist_tracks(id, token.as_deref()).await }
            })
            .await
            .into()
    }

    /// Saved-library counts.
    pub async fn saved_counts(&self) -> QueryState<Arc<LibraryCounts>> {
        let token = self.tokens.get_token();
        let api = &self.api;
        self.cache
            .fetch(QueryKey::saved_counts(), &self.policy, || {
                let token = token.clone();
                async move { api.fetch_saved_counts(token.as_deref()).await }
            })
            .await
            .into()
    }

    /// Current state for `key` without fetching.
    #[must_use]
    pub fn state_of<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<Arc<T>> {
        self.cache.state(key)
    }

    /// Whether a fetch for `key` is in flight.
    #[must_use]
    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.cache.is_fetching(key)
    }

    /// Mark `key` stale.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        self.cache.invalidate(key)
    }

    /// Mark every entry stale.
    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate_all()
    }

    /// Store a new token and drop every cached result fetched with the old one.
    ///
    /// The cache is cleared after the new token is in place, even when
    /// persisting it fails.
    ///
    /// # Errors
    ///
    /// Returns an error when the token cannot be persisted.
    pub fn replace_token(&self, token: impl Into<String>) -> Result<(), TokenStoreError> {
        let stored = self.tokens.set_token(token);
        self.cache.clear();
        info!("token replaced; cache cleared");
        stored
    }

    /// Forget the token and drop every cached result.
    ///
    /// # Errors
    ///
    /// Returns an error when the persisted token cannot be removed.
    pub fn clear_token(&self) -> Result<(), TokenStoreError> {
        let cleared = self.tokens.clear();
        self.cache.clear();
        cleared
    }
}

/// Periodic token validation.
///
/// When the backend hands back a different token than the one sent, the new
/// value replaces the stored one.
#[derive(Debug)]
pub struct TokenValidator {
    queries: Arc<LibraryQueries>,
    interval: Duration,
    last_validated: Mutex<Option<DateTime<Utc>>>,
}

impl TokenValidator {
    /// Validator over `queries`, ticking at the configured interval.
    #[must_use]
    pub fn new(queries: Arc<LibraryQueries>, config: &ClientConfig) -> Self {
        Self {
            queries,
            interval: config.validation_interval,
            last_validated: Mutex::new(None),
        }
    }

    /// Validation outcome, served from cache while fresh.
    pub async fn validate(&self) -> QueryState<Arc<TokenValidation>> {
        let queries = &self.queries;
        let token = queries.tokens.get_token();
        let last_validated = &self.last_validated;
        let outcome = queries
            .cache
            .fetch(QueryKey::token(), &queries.token_policy, || {
                let token = token.clone();
                async move {
                    let result = queries.api.validate_token(token.as_deref()).await;
                    if !matches!(result, Err(ApiError::MissingToken)) {
                        *last_validated
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
                    }
                    result
                }
            })
            .await;

        if let Ok(validation) = &outcome {
            self.adopt_token(token.as_deref(), validation);
        }
        outcome.into()
    }

    /// Force a fresh validation regardless of staleness.
    pub async fn revalidate(&self) -> QueryState<Arc<TokenValidation>> {
        self.queries.invalidate(&QueryKey::token());
        self.validate().await
    }

    /// When the backend last answered a validation request.
    #[must_use]
    pub fn last_validated(&self) -> Option<DateTime<Utc>> {
        *self
            .last_validated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-validate on every tick, starting immediately.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.revalidate().await {
                    QueryState::Success(validation) => {
                        debug!(message = %validation.message, "token validated");
                    }
                    QueryState::Error(error) => {
                        warn!(error = %error, "token validation failed");
                    }
                    QueryState::Loading => {}
                }
            }
        })
    }

    fn adopt_token(&self, sent: Option<&str>, validation: &TokenValidation) {
        let returned = validation.token.trim();
        if returned.is_empty() || Some(returned) == sent {
            return;
        }
        match self.queries.replace_token(returned) {
            Ok(()) => info!(message = %validation.message, "stored refreshed token"),
            Err(err) => warn!(error = %err, "failed to persist refreshed token"),
        }
    }
}
