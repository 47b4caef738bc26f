//! HTTP adapters for the library backend.
//!
//! # Design
//! - Every adapter requires a token and fails with `MissingToken` before any
//!   request is built.
//! - Non-success statuses become `ApiError::Http` carrying the reason phrase.
//! - No retries here; the query cache owns retry policy.

use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use tunedeck_api_models::{
    Envelope, LibraryCounts, PageParams, PaginatedResponse, PlaylistDetail, Resource,
    ResourceKind, TokenValidation,
};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Typed client for the library backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ApiError::Client { source })?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Wrap an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Backend base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch a saved-library collection from `/api/library/{kind}`.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is missing, the request fails, or the
    /// body cannot be decoded.
    #[instrument(name = "api.fetch_resource", skip_all, fields(kind = %kind, limit = ?limit))]
    pub async fn fetch_resource<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        token: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Resource<T>, ApiError> {
        let token = require_token(token)?;
        let query: Vec<(&str, String)> = limit
            .map(|limit| vec![("limit", limit.to_string())])
            .unwrap_or_default();
        self.send_json(
            Method::GET,
            &["api", "library", kind.as_str()],
            &query,
            token,
        )
        .await
    }

    /// Fetch a browse collection from `/api/browser/{kind}`.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is missing, the request fails, or the
    /// body cannot be decoded.
    #[instrument(name = "api.browse_resource", skip_all, fields(kind = %kind))]
    pub async fn browse_resource<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        token: Option<&str>,
    ) -> Result<Resource<T>, ApiError> {
        let token = require_token(token)?;
        self.send_json(Method::GET, &["api", "browser", kind.as_str()], &[], token)
            .await
    }

    /// Fetch one page from `/api/v1/browser/{kind}`.
    ///
    /// Pages whose rows or page count disagree with their own metadata are
    /// rejected as decode failures.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is missing, the request fails, the
    /// body cannot be decoded, or the pagination metadata is inconsistent.
    #[instrument(
        name = "api.browse_paginated",
        skip_all,
        fields(kind = %kind, page = params.page, page_size = params.page_size)
    )]
    pub async fn browse_paginated<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        token: Option<&str>,
        params: PageParams,
    ) -> Result<PaginatedResponse<T>, ApiError> {
        let token = require_token(token)?;
        let segments = ["api", "v1", "browser", kind.as_str()];
        let query = [
            ("page", params.page.to_string()),
            ("page_size", params.page_size.to_string()),
        ];
        let page: PaginatedResponse<T> = self
            .send_json(Method::GET, &segments, &query, token)
            .await?;
        page.validate().map_err(|violation| ApiError::Decode {
            path: segments.join("/"),
            detail: violation.to_string(),
        })?;
        Ok(page)
    }

    /// Fetch a playlist and its tracks.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is missing, the request fails, or the
    /// body cannot be decoded.
    #[instrument(name = "api.fetch_playlist_tracks", skip(self, token))]
    pub async fn fetch_playlist_tracks(
        &self,
        id: &str,
        token: Option<&str>,
    ) -> Result<PlaylistDetail, ApiError> {
        let token = require_token(token)?;
        let envelope: Envelope<PlaylistDetail> = self
            .send_json(
                Method::GET,
                &["api", "browser", "playlist", id, "tracks"],
                &[],
                token,
            )
            .await?;
        Ok(envelope.data)
    }

    /// Fetch saved-library counts.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is missing, the request fails, or the
    /// body cannot be decoded.
    #[instrument(name = "api.fetch_saved_counts", skip(self, token))]
    pub async fn fetch_saved_counts(&self, token: Option<&str>) -> Result<LibraryCounts, ApiError> {
        let token = require_token(token)?;
        let envelope: Envelope<LibraryCounts> = self
            .send_json(Method::GET, &["api", "data", "saved"], &[], token)
            .await?;
        Ok(envelope.data)
    }

    /// Ask the backend whether the token is still valid.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is missing, rejected, or the request
    /// fails.
    #[instrument(name = "api.validate_token", skip(self, token))]
    pub async fn validate_token(&self, token: Option<&str>) -> Result<TokenValidation, ApiError> {
        let token = require_token(token)?;
        self.send_json(Method::POST, &["api", "validate"], &[], token)
            .await
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl {
                path: segments.join("/"),
                reason: "base url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        token: &str,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments, query)?;
        let path = url.path().to_string();
        debug!(%method, %path, "sending request");

        let response = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| {
                warn!(%path, error = %source, "request failed before a response");
                ApiError::Transport {
                    path: path.clone(),
                    source,
                }
            })?;

        let response = check_status(response, &path)?;
        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.clone(),
                source,
            })?;
        serde_json::from_slice(&body).map_err(|err| ApiError::Decode {
            path,
            detail: err.to_string(),
        })
    }
}

fn require_token(token: Option<&str>) -> Result<&str, ApiError> {
    token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::MissingToken)
}

fn check_status(response: Response, path: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string);
    warn!(path, status = status.as_u16(), "request returned an error status");
    Err(ApiError::Http {
        code: status.as_u16(),
        message,
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::error::Error;
    use tunedeck_api_models::{BrowserPlaylist, LibraryTrack};

    fn client_for(server: &MockServer) -> Result<ApiClient, Box<dyn Error>> {
        let config = ClientConfig::new(server.base_url().parse()?);
        Ok(ApiClient::new(&config)?)
    }

    #[tokio::test]
    async fn fetch_resource_sends_bearer_and_limit() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/library/tracks")
                .query_param("limit", "5")
                .header("authorization", "Bearer abc");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "data": [{
                        "spotify_id": "t1",
                        "name": "Song",
                        "artist_name": "Artist",
                        "artist_id": "a1",
                        "album_name": "Album",
                        "album_id": "al1",
                        "image_url": "",
                        "duration_ms": 1000,
                        "link": "https://open.spotify.com/track/t1"
                    }]
                }));
        });

        let api = client_for(&server)?;
        let resource: Resource<LibraryTrack> = api
            .fetch_resource(ResourceKind::Tracks, Some("abc"), Some(5))
            .await?;
        mock.assert();
        assert_eq!(resource.data.len(), 1);
        assert_eq!(resource.data[0].name, "Song");
        Ok(())
    }

    #[tokio::test]
    async fn missing_token_sends_nothing() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.any_request();
            then.status(200).json_body(json!({ "data": [] }));
        });

        let api = client_for(&server)?;
        let result = api
            .browse_resource::<serde_json::Value>(ResourceKind::Albums, None)
            .await;
        assert!(matches!(result, Err(ApiError::MissingToken)));
        let blank = api.validate_token(Some("  ")).await;
        assert!(matches!(blank, Err(ApiError::MissingToken)));
        mock.assert_calls(0);
        Ok(())
    }

    #[tokio::test]
    async fn not_found_maps_to_http_error_with_reason() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/browser/playlist/missing/tracks");
            then.status(404);
        });

        let api = client_for(&server)?;
        let result = api.fetch_playlist_tracks("missing", Some("abc")).await;
        mock.assert();
        match result {
            Err(ApiError::Http { code, message, .. }) => {
                assert_eq!(code, 404);
                assert_eq!(message, "Not Found");
            }
            other => return Err(format!("unexpected result: {other:?}").into()),
        }
        Ok(())
    }

    #[tokio::test]
    async fn paginated_browse_sends_page_params() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/browser/playlists")
                .query_param("page", "2")
                .query_param("page_size", "1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "data": [{
                        "id": "p2",
                        "spotify_id": "sp2",
                        "name": "Second",
                        "owner_id": "me",
                        "public": true,
                        "shared": false,
                        "is_synced": true,
                        "is_analyzed": false
                    }],
                    "pagination": { "total": 2, "per_page": 1, "page": 2, "num_pages": 2 }
                }));
        });

        let api = client_for(&server)?;
        let page: PaginatedResponse<BrowserPlaylist> = api
            .browse_paginated(ResourceKind::Playlists, Some("abc"), PageParams::new(2, 1))
            .await?;
        mock.assert();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.data[0].name, "Second");
        Ok(())
    }

    #[tokio::test]
    async fn inconsistent_pagination_is_a_decode_error() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/browser/playlists");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "data": [],
                    "pagination": { "total": 5, "per_page": 2, "page": 1, "num_pages": 7 }
                }));
        });

        let api = client_for(&server)?;
        let result = api
            .browse_paginated::<BrowserPlaylist>(
                ResourceKind::Playlists,
                Some("abc"),
                PageParams::default(),
            )
            .await;
        assert!(matches!(result, Err(ApiError::Decode { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn validate_token_posts_and_decodes() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/validate")
                .header("authorization", "Bearer old");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "message": "Updated token", "token": "new" }));
        });

        let api = client_for(&server)?;
        let validation = api.validate_token(Some("old")).await?;
        mock.assert();
        assert_eq!(validation.token, "new");
        assert_eq!(validation.message, "Updated token");
        Ok(())
    }

    #[tokio::test]
    async fn saved_counts_unwrap_data_envelope() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/data/saved");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "data": { "tracks": 12, "albums": 3 } }));
        });

        let api = client_for(&server)?;
        let counts = api.fetch_saved_counts(Some("abc")).await?;
        assert_eq!(counts.tracks, 12);
        assert_eq!(counts.albums, 3);
        assert_eq!(counts.artists, 0);
        Ok(())
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() -> Result<(), Box<dyn Error>> {
        let api = ApiClient::with_client(Client::new(), "http://host/backend/".parse()?);
        let url = api.endpoint(&["api", "library", "albums"], &[("limit", "3".into())])?;
        assert_eq!(url.as_str(), "http://host/backend/api/library/albums?limit=3");

        let bare = ApiClient::with_client(Client::new(), "http://host".parse()?);
        let url = bare.endpoint(&["api", "browser", "playlist", "a b", "tracks"], &[])?;
        assert_eq!(url.as_str(), "http://host/api/browser/playlist/a%20b/tracks");
        Ok(())
    }
}
