//! Routes, navigation history, and the controllers behind dashboard views.
//!
//! # Design
//! - Views read data only through `LibraryQueries`; nothing here talks HTTP.
//! - The selected playlist lives in the route, so deep links open the drawer.
//! - A drawer whose playlist fails to load sends the user back to the list.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use tracing::{debug, warn};
use tunedeck_api_models::{
    BrowserPlaylist, LibraryAlbum, LibraryArtist, LibraryPlaylist, LibraryTrack, PaginatedResponse,
    PlaylistDetail, PlaylistTrack, ResourceKind,
};

use crate::cache::QueryKey;
use crate::filters::PlaylistFilters;
use crate::format::format_duration;
use crate::queries::LibraryQueries;
use crate::state::QueryState;

const PLAYLISTS_PATH: &str = "/dashboard/browser/playlists";

/// Client-side location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Landing page.
    Home,
    /// Login page.
    Login,
    /// Signup page.
    Signup,
    /// Dashboard overview.
    Dashboard,
    /// Paginated playlist browser.
    BrowserPlaylists,
    /// Playlist browser with the detail drawer open.
    BrowserPlaylist {
        /// Selected playlist id.
        id: String,
    },
    /// Unknown location.
    NotFound(String),
}

impl Route {
    /// Resolve a path, ignoring query string, fragment, and trailing slash.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["signup"] => Self::Signup,
            ["dashboard"] => Self::Dashboard,
            ["dashboard", "browser", "playlists"] => Self::BrowserPlaylists,
            ["dashboard", "browser", "playlists", id] => Self::BrowserPlaylist {
                id: (*id).to_string(),
            },
            _ => Self::NotFound(path.to_string()),
        }
    }

    /// Canonical path.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Signup => "/signup".to_string(),
            Self::Dashboard => "/dashboard".to_string(),
            Self::BrowserPlaylists => PLAYLISTS_PATH.to_string(),
            Self::BrowserPlaylist { id } => format!("{PLAYLISTS_PATH}/{id}"),
            Self::NotFound(path) => path.clone(),
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Linear history with back and forward.
#[derive(Debug, Clone)]
pub struct Navigation {
    entries: Vec<Route>,
    cursor: usize,
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Navigation {
    /// History holding only `initial`.
    #[must_use]
    pub fn new(initial: Route) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
        }
    }

    /// History opened at `path`.
    #[must_use]
    pub fn open(path: &str) -> Self {
        Self::new(Route::parse(path))
    }

    /// Current route.
    #[must_use]
    pub fn current(&self) -> &Route {
        &self.entries[self.cursor]
    }

    /// Push `route`, dropping any forward entries. Returns false when already
    /// there.
    pub fn navigate(&mut self, route: Route) -> bool {
        if *self.current() == route {
            return false;
        }
        debug!(from = %self.current(), to = %route, "navigate");
        self.entries.truncate(self.cursor + 1);
        self.entries.push(route);
        self.cursor += 1;
        true
    }

    /// Step back. Returns whether the cursor moved.
    pub const fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Step forward. Returns whether the cursor moved.
    pub const fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Whether `back` would move.
    #[must_use]
    pub const fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    /// Whether `forward` would move.
    #[must_use]
    pub const fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }
}

/// Paginated playlist browser.
#[derive(Debug, Clone, Default)]
pub struct PlaylistTable {
    filters: PlaylistFilters,
}

impl PlaylistTable {
    /// Table over the given filters.
    #[must_use]
    pub const fn new(filters: PlaylistFilters) -> Self {
        Self { filters }
    }

    /// Current filters.
    #[must_use]
    pub const fn filters(&self) -> &PlaylistFilters {
        &self.filters
    }

    /// Mutable filters, for page and page-size changes.
    pub const fn filters_mut(&mut self) -> &mut PlaylistFilters {
        &mut self.filters
    }

    /// Cache key of the current page.
    #[must_use]
    pub fn key(&self) -> QueryKey {
        QueryKey::browse_page(ResourceKind::Playlists, self.filters.params())
    }

    /// Load the current page and record its total.
    pub async fn load(
        &mut self,
        queries: &LibraryQueries,
    ) -> QueryState<Arc<PaginatedResponse<BrowserPlaylist>>> {
        let params = self.filters.params();
        self.filters.update_fetching(true);
        let state = queries
            .paginated_browser::<BrowserPlaylist>(ResourceKind::Playlists, params)
            .await;
        self.filters.update_fetching(false);
        if let Some(page) = state.data()
            && self.filters.update_total(page.pagination.total)
        {
            debug!(total = page.pagination.total, "playlist total changed");
        }
        state
    }

    /// Mirror the cache's in-flight flag for the current page.
    pub fn sync_fetching(&mut self, queries: &LibraryQueries) {
        let fetching = queries.is_fetching(&self.key());
        self.filters.update_fetching(fetching);
    }

    /// Open the detail drawer for `playlist`.
    pub fn select(navigation: &mut Navigation, playlist: &BrowserPlaylist) -> bool {
        navigation.navigate(Route::BrowserPlaylist {
            id: playlist.id.clone(),
        })
    }
}

/// Playlist detail drawer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaylistDrawer;

impl PlaylistDrawer {
    /// Playlist id carried by the current route, if the drawer is open.
    #[must_use]
    pub fn selected(navigation: &Navigation) -> Option<&str> {
        match navigation.current() {
            Route::BrowserPlaylist { id } if !id.is_empty() => Some(id.as_str()),
            _ => None,
        }
    }

    /// Load the selected playlist. `None` when no playlist is selected.
    ///
    /// On error the drawer closes by navigating back to the playlist list.
    pub async fn resolve(
        navigation: &mut Navigation,
        queries: &LibraryQueries,
    ) -> Option<QueryState<Arc<PlaylistDetail>>> {
        let id = Self::selected(navigation)?.to_string();
        let state = queries.playlist_tracks(&id).await;
        if let QueryState::Error(error) = &state {
            warn!(playlist = %id, error = %error, "playlist failed to load; closing drawer");
            Self::close(navigation);
        }
        Some(state)
    }

    /// Close the drawer.
    pub fn close(navigation: &mut Navigation) -> bool {
        navigation.navigate(Route::BrowserPlaylists)
    }
}

/// Row that renders as table cells.
pub trait TableRow {
    /// Column headers.
    const COLUMNS: &'static [&'static str];

    /// Cell text, one per column.
    fn cells(&self) -> Vec<String>;
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

fn or_none(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("None")
        .to_string()
}

impl TableRow for BrowserPlaylist {
    const COLUMNS: &'static [&'static str] = &[
        "Name", "Description", "Owner", "Public", "Shared", "Analyzed", "Link",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            or_none(self.description.as_deref()),
            self.owner_id.clone(),
            yes_no(self.public),
            yes_no(self.shared),
            yes_no(self.is_analyzed),
            self.external_link(),
        ]
    }
}

impl TableRow for LibraryPlaylist {
    const COLUMNS: &'static [&'static str] = &["Name", "Description", "Owner", "#", "Synced", "Link"];

    fn cells(&self) -> Vec<String> {
        let owner = if self.owner_id == "spotify" {
            "Spotify"
        } else {
            "Creator Profile"
        };
        vec![
            self.name.clone(),
            or_none(self.description.as_deref()),
            owner.to_string(),
            self.num_tracks.to_string(),
            yes_no(self.is_synced),
            self.link.clone(),
        ]
    }
}

impl TableRow for LibraryAlbum {
    const COLUMNS: &'static [&'static str] = &["Name", "Artist", "#", "Year"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.artist_name.clone(),
            self.total_tracks.to_string(),
            self.release_year().to_string(),
        ]
    }
}

impl TableRow for LibraryTrack {
    const COLUMNS: &'static [&'static str] = &["Name", "Artist", "Album", "Duration", "Link"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.artist_name.clone(),
            self.album_name.clone(),
            format_duration(self.duration_ms),
            self.link.clone(),
        ]
    }
}

impl TableRow for LibraryArtist {
    const COLUMNS: &'static [&'static str] = &["Name", "Genres", "Link"];

    fn cells(&self) -> Vec<String> {
        vec![self.name.clone(), self.genres.join(", "), self.link.clone()]
    }
}

impl TableRow for PlaylistTrack {
    const COLUMNS: &'static [&'static str] = &["Name", "Artists", "Album", "Duration"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.artist_names(),
            self.album_name.clone(),
            self.duration_ms.map_or_else(String::new, format_duration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, RetryPolicy};
    use crate::token::TokenStore;
    use httpmock::prelude::*;
    use serde_json::{Value, json};
    use std::error::Error;
    use tunedeck_api_models::PageParams;

    fn queries_for(server: &MockServer) -> Result<LibraryQueries, Box<dyn Error>> {
        let config = ClientConfig::new(server.base_url().parse()?).with_retry(RetryPolicy::none());
        let tokens = Arc::new(TokenStore::in_memory());
        tokens.set_token("abc")?;
        Ok(LibraryQueries::from_config(&config, tokens)?)
    }

    fn playlist_page(id: &str, page: u64) -> Value {
        json!({
            "data": [{
                "id": id,
                "spotify_id": format!("sp-{id}"),
                "name": format!("Playlist {id}"),
                "owner_id": "me",
                "public": true,
                "shared": false,
                "is_synced": true,
                "is_analyzed": false
            }],
            "pagination": { "total": 2, "per_page": 1, "page": page, "num_pages": 2 }
        })
    }

    #[test]
    fn routes_parse_and_render() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse("/dashboard/"), Route::Dashboard);
        assert_eq!(
            Route::parse("/dashboard/browser/playlists?page=2"),
            Route::BrowserPlaylists
        );
        let detail = Route::parse("/dashboard/browser/playlists/p1");
        assert_eq!(detail, Route::BrowserPlaylist { id: "p1".to_string() });
        assert_eq!(detail.path(), "/dashboard/browser/playlists/p1");
        assert_eq!(
            Route::parse("/elsewhere"),
            Route::NotFound("/elsewhere".to_string())
        );
    }

    #[test]
    fn navigation_tracks_history() {
        let mut nav = Navigation::default();
        assert!(!nav.can_go_back());
        assert!(nav.navigate(Route::Dashboard));
        assert!(!nav.navigate(Route::Dashboard));
        assert!(nav.navigate(Route::BrowserPlaylists));
        assert!(nav.back());
        assert_eq!(nav.current(), &Route::Dashboard);
        assert!(nav.can_go_forward());
        assert!(nav.forward());
        assert_eq!(nav.current(), &Route::BrowserPlaylists);

        nav.back();
        nav.navigate(Route::Login);
        assert!(!nav.forward());
        assert_eq!(nav.current(), &Route::Login);
    }

    #[tokio::test]
    async fn drawer_error_navigates_back_to_list() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/browser/playlist/missing/tracks");
            then.status(404);
        });
        let queries = queries_for(&server)?;
        let mut nav = Navigation::open("/dashboard/browser/playlists/missing");

        let state = PlaylistDrawer::resolve(&mut nav, &queries)
            .await
            .ok_or("drawer should be open")?;
        mock.assert();
        assert_eq!(state.error().and_then(|e| e.code), Some(404));
        assert_eq!(nav.current(), &Route::BrowserPlaylists);
        assert!(PlaylistDrawer::resolve(&mut nav, &queries).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn drawer_loads_selected_playlist() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/browser/playlist/p1/tracks");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "data": {
                        "playlist": {
                            "spotify_id": "sp-p1",
                            "name": "Road Trip",
                            "public": true,
                            "collaborative": false,
                            "follower_count": 3,
                            "is_synced": true,
                            "is_analyzed": true
                        },
                        "tracks": [{
                            "spotify_id": "t1",
                            "name": "Song",
                            "album_name": "Album",
                            "artists": [["a1", "Artist"]],
                            "duration_ms": 200000
                        }]
                    }
                }));
        });
        let queries = queries_for(&server)?;
        let mut nav = Navigation::new(Route::BrowserPlaylists);
        let row: BrowserPlaylist = serde_json::from_value(json!({
            "id": "p1",
            "spotify_id": "sp-p1",
            "name": "Road Trip",
            "owner_id": "me",
            "public": true,
            "shared": false,
            "is_synced": true,
            "is_analyzed": true
        }))?;
        assert!(PlaylistTable::select(&mut nav, &row));

        let state = PlaylistDrawer::resolve(&mut nav, &queries)
            .await
            .ok_or("drawer should be open")?;
        let detail = state.data().ok_or("expected playlist detail")?;
        assert_eq!(detail.playlist.name, "Road Trip");
        assert_eq!(detail.tracks[0].cells()[3], "3:20");
        assert_eq!(PlaylistDrawer::selected(&nav), Some("p1"));
        Ok(())
    }

    #[tokio::test]
    async fn table_pages_through_playlists() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/browser/playlists")
                .query_param("page", "1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(playlist_page("p1", 1));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/browser/playlists")
                .query_param("page", "2");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(playlist_page("p2", 2));
        });
        let queries = queries_for(&server)?;
        let mut table = PlaylistTable::new(PlaylistFilters::with_page_size(1));

        let page_one = table.load(&queries).await;
        assert_eq!(table.filters().total(), 2);
        assert!(!table.filters().is_fetching());
        assert!(table.filters_mut().next_page());
        let page_two = table.load(&queries).await;
        first.assert_calls(1);
        second.assert_calls(1);

        assert_eq!(page_one.data().map(|p| p.data[0].id.clone()), Some("p1".to_string()));
        assert_eq!(page_two.data().map(|p| p.data[0].id.clone()), Some("p2".to_string()));
        assert_eq!(
            table.key(),
            QueryKey::browse_page(ResourceKind::Playlists, PageParams::new(2, 1))
        );
        table.sync_fetching(&queries);
        assert!(!table.filters().is_fetching());
        Ok(())
    }

    #[test]
    fn rows_render_placeholders_and_flags() -> Result<(), Box<dyn Error>> {
        let row: BrowserPlaylist = serde_json::from_value(json!({
            "id": "p1",
            "spotify_id": "abc",
            "name": "Mix",
            "description": "",
            "owner_id": "me",
            "public": true,
            "shared": false,
            "is_synced": true,
            "is_analyzed": false
        }))?;
        let cells = row.cells();
        assert_eq!(cells.len(), BrowserPlaylist::COLUMNS.len());
        assert_eq!(cells[1], "None");
        assert_eq!(&cells[3..6], ["Yes", "No", "No"]);
        assert_eq!(cells[6], "https://open.spotify.com/playlist/abc");
        Ok(())
    }
}
