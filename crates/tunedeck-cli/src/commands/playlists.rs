//! Paginated playlist browsing and the playlist detail view.

use tracing::debug;
use tunedeck_client::{
    Navigation, PlaylistDrawer, PlaylistFilters, PlaylistTable, QueryState, Route,
};

use crate::cli::{OutputFormat, PlaylistArgs, PlaylistsArgs};
use crate::client::{AppContext, CliError, CliResult, settled};
use crate::output::{render_playlist_detail, render_playlist_page};

pub(crate) async fn handle_playlists(
    ctx: &AppContext,
    args: PlaylistsArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut table = PlaylistTable::new(PlaylistFilters::with_page_size(args.page_size));
    table.filters_mut().set_page(args.page);
    let state = table.load(&ctx.queries).await;
    let page = settled(state, "playlists")?;
    debug!(
        page = table.filters().page(),
        total = table.filters().total(),
        "playlist page loaded"
    );
    render_playlist_page(&page, table.filters(), format)
}

pub(crate) async fn handle_playlist(
    ctx: &AppContext,
    args: PlaylistArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut navigation = Navigation::new(Route::BrowserPlaylist {
        id: args.id.trim().to_string(),
    });
    let Some(state) = PlaylistDrawer::resolve(&mut navigation, &ctx.queries).await else {
        return Err(CliError::validation("invalid playlist id"));
    };
    if let QueryState::Error(error) = &state
        && !error.is_missing_token()
    {
        eprintln!(
            "Error: {}. Redirecting to {}",
            error.message,
            navigation.current()
        );
    }
    let detail = settled(state, "playlist")?;
    render_playlist_detail(&detail, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use tunedeck_client::{ClientConfig, RetryPolicy, TokenStore};
    use url::Url;

    fn context(server: &MockServer) -> AppContext {
        let url: Url = server.base_url().parse().expect("mock url");
        let tokens = TokenStore::in_memory();
        tokens.set_token("tok").expect("token stored");
        AppContext::new(ClientConfig::new(url).with_retry(RetryPolicy::none()), tokens)
            .expect("context")
    }

    fn playlist(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "spotify_id": format!("sp-{id}"),
            "name": format!("Playlist {id}"),
            "owner_id": "owner",
            "public": true
        })
    }

    #[tokio::test]
    async fn playlists_request_requested_page() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/browser/playlists")
                .query_param("page", "2")
                .query_param("page_size", "2");
            then.status(200).json_body(json!({
                "data": [playlist("p3"), playlist("p4")],
                "pagination": { "total": 5, "per_page": 2, "page": 2, "num_pages": 3 }
            }));
        });
        let ctx = context(&server);

        handle_playlists(
            &ctx,
            PlaylistsArgs {
                page: 2,
                page_size: 2,
            },
            OutputFormat::Table,
        )
        .await
        .expect("page rendered");
        mock.assert();
    }

    #[tokio::test]
    async fn playlist_detail_renders_tracks() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/browser/playlist/p1/tracks");
            then.status(200).json_body(json!({
                "data": {
                    "playlist": { "spotify_id": "sp-p1", "name": "Road Trip", "follower_count": 3 },
                    "tracks": [{
                        "spotify_id": "t1",
                        "name": "Intro",
                        "album_name": "xx",
                        "artists": [["a1", "The xx"]],
                        "duration_ms": 127_000,
                        "features": { "key": 1, "tempo": 120.5 }
                    }]
                }
            }));
        });
        let ctx = context(&server);

        handle_playlist(
            &ctx,
            PlaylistArgs {
                id: "p1".to_string(),
            },
            OutputFormat::Table,
        )
        .await
        .expect("detail rendered");
        mock.assert();
    }

    #[tokio::test]
    async fn unknown_playlist_fails_and_blank_id_is_rejected() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/browser/playlist/missing/tracks");
            then.status(404);
        });
        let ctx = context(&server);

        let err = handle_playlist(
            &ctx,
            PlaylistArgs {
                id: "missing".to_string(),
            },
            OutputFormat::Table,
        )
        .await
        .err()
        .expect("missing playlist fails");
        mock.assert();
        assert_eq!(err.display_message(), "failed to load playlist: Not Found (404)");

        let blank = handle_playlist(
            &ctx,
            PlaylistArgs {
                id: "  ".to_string(),
            },
            OutputFormat::Table,
        )
        .await;
        assert!(matches!(blank, Err(CliError::Validation(_))));
    }
}
