#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
//! Shared HTTP DTOs for the Tunedeck library API.
//!
//! These types describe the JSON bodies returned by the backend so the client
//! crate and the CLI decode the same contract. Pagination arithmetic lives here
//! as well because both the adapters and the filter store rely on it.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default page number for paginated views.
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size for paginated views.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Library entity type addressed by resource endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Saved or browsed tracks.
    Tracks,
    /// Saved or browsed albums.
    Albums,
    /// Followed or browsed artists.
    Artists,
    /// Owned, followed, or browsed playlists.
    Playlists,
}

impl ResourceKind {
    /// All resource kinds in display order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Playlists, Self::Albums, Self::Artists, Self::Tracks]
    }

    /// Path segment used by the API for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tracks => "tracks",
            Self::Albums => "albums",
            Self::Artists => "artists",
            Self::Playlists => "playlists",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResourceKind(pub String);

impl Display for UnknownResourceKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "unknown resource kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownResourceKind {}

impl FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tracks" | "track" => Ok(Self::Tracks),
            "albums" | "album" => Ok(Self::Albums),
            "artists" | "artist" => Ok(Self::Artists),
            "playlists" | "playlist" => Ok(Self::Playlists),
            other => Err(UnknownResourceKind(other.to_string())),
        }
    }
}

/// Collection envelope returned by library and browse endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<T> {
    /// Items in the collection.
    pub data: Vec<T>,
}

/// Single-object envelope (`{"data": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Wrapped payload.
    pub data: T,
}

/// Page selection sent as `page` / `page_size` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageParams {
    /// One-based page number.
    pub page: u32,
    /// Number of rows per page.
    pub page_size: u32,
}

impl PageParams {
    /// Build page parameters, clamping both values to at least one.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination metadata attached to paginated responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Total number of rows across all pages.
    pub total: u64,
    /// Rows per page.
    pub per_page: u64,
    /// Current one-based page.
    pub page: u64,
    /// Number of pages for `total` at `per_page`.
    pub num_pages: u64,
}

impl Pagination {
    /// Build pagination metadata with a derived page count.
    #[must_use]
    pub const fn new(total: u64, per_page: u64, page: u64) -> Self {
        Self {
            total,
            per_page,
            page,
            num_pages: page_count(total, per_page),
        }
    }

    /// Whether `num_pages` matches `ceil(total / per_page)`.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.num_pages == page_count(self.total, self.per_page)
    }
}

/// Number of pages needed to show `total` rows at `per_page` rows each.
#[must_use]
pub const fn page_count(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        0
    } else {
        total.div_ceil(per_page)
    }
}

/// Reasons a paginated payload can violate its own metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationViolation {
    /// More rows were returned than `per_page` allows.
    PageOverflow {
        /// Rows present in `data`.
        rows: usize,
        /// Advertised page size.
        per_page: u64,
    },
    /// `num_pages` disagrees with `total` and `per_page`.
    PageCountMismatch {
        /// Advertised page count.
        num_pages: u64,
        /// Page count derived from the totals.
        expected: u64,
    },
}

impl Display for PaginationViolation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageOverflow { rows, per_page } => {
                write!(formatter, "page holds {rows} rows but per_page is {per_page}")
            }
            Self::PageCountMismatch {
                num_pages,
                expected,
            } => write!(
                formatter,
                "num_pages is {num_pages} but totals imply {expected}"
            ),
        }
    }
}

impl std::error::Error for PaginationViolation {}

/// Paginated collection returned by the paginated browse endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// Rows on the current page.
    pub data: Vec<T>,
    /// Pagination metadata for the full result set.
    pub pagination: Pagination,
}

impl<T> PaginatedResponse<T> {
    /// Check the page against its metadata.
    ///
    /// # Errors
    ///
    /// Returns the first [`PaginationViolation`] found.
    pub fn validate(&self) -> Result<(), PaginationViolation> {
        let rows = self.data.len();
        if u64::try_from(rows).unwrap_or(u64::MAX) > self.pagination.per_page {
            return Err(PaginationViolation::PageOverflow {
                rows,
                per_page: self.pagination.per_page,
            });
        }
        if !self.pagination.is_consistent() {
            return Err(PaginationViolation::PageCountMismatch {
                num_pages: self.pagination.num_pages,
                expected: page_count(self.pagination.total, self.pagination.per_page),
            });
        }
        Ok(())
    }
}

/// Saved track in the user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryTrack {
    /// Streaming-service identifier.
    pub spotify_id: String,
    /// Track title.
    pub name: String,
    /// Primary artist name.
    pub artist_name: String,
    /// Primary artist identifier.
    pub artist_id: String,
    /// Album title.
    pub album_name: String,
    /// Album identifier.
    pub album_id: String,
    /// Album artwork URL.
    pub image_url: String,
    /// Track length in milliseconds.
    pub duration_ms: u64,
    /// Public link to the track.
    pub link: String,
}

/// Saved album in the user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryAlbum {
    /// Streaming-service identifier.
    pub spotify_id: String,
    /// Album title.
    pub name: String,
    /// Primary artist name.
    pub artist_name: String,
    /// Primary artist identifier.
    pub artist_id: String,
    /// Release date as reported upstream (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
    pub release_date: String,
    /// Number of tracks on the album.
    pub total_tracks: u32,
    /// Album artwork URL.
    pub image_url: String,
    /// Record label, when known.
    #[serde(default)]
    pub label: Option<String>,
    /// Genres, when known.
    #[serde(default)]
    pub genres: Option<Vec<String>>,
}

impl LibraryAlbum {
    /// Year component of the release date.
    #[must_use]
    pub fn release_year(&self) -> &str {
        self.release_date
            .split('-')
            .next()
            .unwrap_or(self.release_date.as_str())
    }
}

/// Followed artist in the user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryArtist {
    /// Genres attributed to the artist.
    #[serde(default)]
    pub genres: Vec<String>,
    /// Streaming-service identifier.
    pub spotify_id: String,
    /// Artist name.
    pub name: String,
    /// Public link to the artist.
    pub link: String,
    /// Artist image URL.
    pub image_url: String,
}

/// Playlist in the user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryPlaylist {
    /// Streaming-service identifier.
    pub spotify_id: String,
    /// Playlist title.
    pub name: String,
    /// Owner display name.
    pub owner_name: String,
    /// Owner identifier.
    pub owner_id: String,
    /// Public link to the playlist.
    pub link: String,
    /// Cover image URL.
    pub image_url: String,
    /// Number of tracks in the playlist.
    pub num_tracks: u32,
    /// API link to the playlist's tracks.
    pub track_link: String,
    /// Snapshot identifier.
    pub version: String,
    /// Whether the playlist is public.
    #[serde(default)]
    pub public: bool,
    /// Whether the playlist is collaborative.
    #[serde(default)]
    pub shared: bool,
    /// Playlist description.
    #[serde(default)]
    pub description: Option<String>,
    /// Backend record identifier once synced.
    #[serde(default)]
    pub id: Option<String>,
    /// Whether the backend has synced this playlist.
    #[serde(default)]
    pub is_synced: bool,
}

/// Playlist row returned by the paginated browse endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserPlaylist {
    /// Backend record identifier.
    pub id: String,
    /// Streaming-service identifier.
    pub spotify_id: String,
    /// Playlist title.
    pub name: String,
    /// Playlist description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owner identifier.
    pub owner_id: String,
    /// Snapshot identifier.
    #[serde(default)]
    pub version: Option<String>,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Whether the playlist is public.
    #[serde(default)]
    pub public: bool,
    /// Whether the playlist is collaborative.
    #[serde(default)]
    pub shared: bool,
    /// Whether the backend has synced this playlist.
    #[serde(default)]
    pub is_synced: bool,
    /// Whether audio analysis has run for this playlist.
    #[serde(default)]
    pub is_analyzed: bool,
}

impl BrowserPlaylist {
    /// Public link to the playlist on the streaming service.
    #[must_use]
    pub fn external_link(&self) -> String {
        format!("https://open.spotify.com/playlist/{}", self.spotify_id)
    }
}

/// Playlist header shown in the detail drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    /// Backend record identifier once synced.
    #[serde(default)]
    pub id: Option<String>,
    /// Streaming-service identifier.
    pub spotify_id: String,
    /// Playlist title.
    pub name: String,
    /// Playlist description.
    #[serde(default)]
    pub description: Option<String>,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Whether the playlist is public.
    #[serde(default)]
    pub public: bool,
    /// Whether the playlist is collaborative.
    #[serde(default)]
    pub collaborative: bool,
    /// Follower count.
    #[serde(default)]
    pub follower_count: u64,
    /// Whether the backend has synced this playlist.
    #[serde(default)]
    pub is_synced: bool,
    /// Whether audio analysis has run for this playlist.
    #[serde(default)]
    pub is_analyzed: bool,
}

/// Audio analysis values attached to a playlist track.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackFeatures {
    /// Suitability for dancing (0.0–1.0).
    pub danceability: Option<f64>,
    /// Perceived intensity (0.0–1.0).
    pub energy: Option<f64>,
    /// Pitch class of the track key (0 = C, 11 = B, -1 = unknown).
    pub key: Option<i32>,
    /// Overall loudness in decibels.
    pub loudness: Option<f64>,
    /// Modality (1 = major, 0 = minor).
    pub mode: Option<i32>,
    /// Presence of spoken words (0.0–1.0).
    pub speechiness: Option<f64>,
    /// Acoustic confidence (0.0–1.0).
    pub acousticness: Option<f64>,
    /// Likelihood of no vocals (0.0–1.0).
    pub instrumentalness: Option<f64>,
    /// Likelihood of a live recording (0.0–1.0).
    pub liveness: Option<f64>,
    /// Musical positiveness (0.0–1.0).
    pub valence: Option<f64>,
    /// Estimated tempo in beats per minute.
    pub tempo: Option<f64>,
    /// Track length in milliseconds.
    pub duration_ms: Option<u64>,
    /// Estimated beats per bar.
    pub time_signature: Option<i32>,
}

/// Single feature value as stored on [`TrackFeatures`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    /// Integral feature (key, mode, time signature, duration).
    Integer(i64),
    /// Fractional feature (energy, tempo, loudness, ...).
    Float(f64),
}

impl TrackFeatures {
    /// Present features as `(field name, value)` pairs in a stable order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, FeatureValue)> {
        let floats = [
            ("danceability", self.danceability),
            ("energy", self.energy),
            ("loudness", self.loudness),
            ("speechiness", self.speechiness),
            ("acousticness", self.acousticness),
            ("instrumentalness", self.instrumentalness),
            ("liveness", self.liveness),
            ("valence", self.valence),
            ("tempo", self.tempo),
        ];
        let integers = [
            ("key", self.key.map(i64::from)),
            ("mode", self.mode.map(i64::from)),
            (
                "duration_ms",
                self.duration_ms
                    .map(|value| i64::try_from(value).unwrap_or(i64::MAX)),
            ),
            ("time_signature", self.time_signature.map(i64::from)),
        ];

        integers
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, FeatureValue::Integer(v))))
            .chain(
                floats
                    .into_iter()
                    .filter_map(|(name, value)| value.map(|v| (name, FeatureValue::Float(v)))),
            )
            .collect()
    }
}

/// Track row in the playlist detail drawer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    /// Backend record identifier once synced.
    #[serde(default)]
    pub id: Option<String>,
    /// Streaming-service identifier.
    pub spotify_id: String,
    /// Track title.
    pub name: String,
    /// Album title.
    pub album_name: String,
    /// Album identifier.
    #[serde(default)]
    pub album_id: Option<String>,
    /// `(artist id, artist name)` pairs.
    #[serde(default)]
    pub artists: Vec<(String, String)>,
    /// Track length in milliseconds.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// International Standard Recording Code.
    #[serde(default)]
    pub isrc: Option<String>,
    /// Audio analysis, when the playlist has been analyzed.
    #[serde(default)]
    pub features: Option<TrackFeatures>,
}

impl PlaylistTrack {
    /// Comma-separated artist names.
    #[must_use]
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|(_, name)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Playlist plus its tracks, as returned by the playlist tracks endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistDetail {
    /// Playlist header.
    pub playlist: PlaylistSummary,
    /// Tracks in playlist order.
    #[serde(default)]
    pub tracks: Vec<PlaylistTrack>,
}

/// Saved-library counts per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryCounts {
    /// Saved tracks.
    pub tracks: u64,
    /// Saved albums.
    pub albums: u64,
    /// Saved or followed playlists.
    pub playlists: u64,
    /// Followed artists.
    pub artists: u64,
    /// Saved shows.
    pub shows: u64,
}

impl LibraryCounts {
    /// Count for a resource kind.
    #[must_use]
    pub const fn for_kind(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Tracks => self.tracks,
            ResourceKind::Albums => self.albums,
            ResourceKind::Artists => self.artists,
            ResourceKind::Playlists => self.playlists,
        }
    }
}

/// Body returned by the token validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    /// Human-readable outcome (`Valid token.` or `Updated token`).
    pub message: String,
    /// Token the client should use from now on.
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(95, 10), 10);
        assert_eq!(page_count(5, 0), 0);
    }

    #[test]
    fn paginated_response_validates_metadata() {
        let ok = PaginatedResponse {
            data: vec![1, 2, 3],
            pagination: Pagination::new(23, 10, 3),
        };
        assert_eq!(ok.pagination.num_pages, 3);
        assert!(ok.validate().is_ok());

        let overflow = PaginatedResponse {
            data: vec![1, 2, 3],
            pagination: Pagination::new(3, 2, 1),
        };
        assert!(matches!(
            overflow.validate(),
            Err(PaginationViolation::PageOverflow { rows: 3, per_page: 2 })
        ));

        let mismatch = PaginatedResponse::<u8> {
            data: Vec::new(),
            pagination: Pagination {
                total: 21,
                per_page: 10,
                page: 1,
                num_pages: 2,
            },
        };
        assert!(matches!(
            mismatch.validate(),
            Err(PaginationViolation::PageCountMismatch {
                num_pages: 2,
                expected: 3
            })
        ));
    }

    #[test]
    fn page_params_clamp_to_one() {
        assert_eq!(PageParams::new(0, 0), PageParams { page: 1, page_size: 1 });
        assert_eq!(PageParams::default(), PageParams { page: 1, page_size: 10 });
    }

    #[test]
    fn resource_kind_parses_and_displays() {
        assert_eq!("Playlists".parse::<ResourceKind>(), Ok(ResourceKind::Playlists));
        assert_eq!("album".parse::<ResourceKind>(), Ok(ResourceKind::Albums));
        assert!("podcasts".parse::<ResourceKind>().is_err());
        assert_eq!(ResourceKind::Artists.to_string(), "artists");
    }

    #[test]
    fn browser_playlist_decodes_backend_row() -> Result<(), serde_json::Error> {
        let row: BrowserPlaylist = serde_json::from_value(json!({
            "is_synced": true,
            "is_analyzed": true,
            "description": "With Brian McBride, The Dead Texan, William Basinski and more",
            "owner_id": "spotify",
            "version": "ZyPYkgAAAACmpgMNhm9gMhsvWVQyX5cB",
            "image_url": "https://example.invalid/cover.jpg",
            "public": true,
            "shared": false,
            "id": "88a0fa4f-f2eb-46e6-9731-f4b289b4fe62",
            "name": "Stars Of The Lid Radio",
            "spotify_id": "37i9dQZF1E4pndHPIu7Fgn"
        }))?;
        assert!(row.is_analyzed);
        assert_eq!(
            row.external_link(),
            "https://open.spotify.com/playlist/37i9dQZF1E4pndHPIu7Fgn"
        );
        Ok(())
    }

    #[test]
    fn playlist_detail_tolerates_missing_optional_fields() -> Result<(), serde_json::Error> {
        let detail: PlaylistDetail = serde_json::from_value(json!({
            "playlist": {"spotify_id": "abc", "name": "Focus"},
            "tracks": [{
                "spotify_id": "t1",
                "name": "Intro",
                "album_name": "Debut",
                "artists": [["a1", "First"], ["a2", "Second"]],
                "features": {"key": 1, "tempo": 120.5}
            }]
        }))?;
        assert!(!detail.playlist.is_analyzed);
        let track = &detail.tracks[0];
        assert_eq!(track.artist_names(), "First, Second");
        let entries = track.features.map(|f| f.entries()).unwrap_or_default();
        assert_eq!(
            entries,
            vec![
                ("key", FeatureValue::Integer(1)),
                ("tempo", FeatureValue::Float(120.5)),
            ]
        );
        Ok(())
    }

    #[test]
    fn album_release_year_handles_partial_dates() {
        let album = LibraryAlbum {
            spotify_id: "x".into(),
            name: "Record".into(),
            artist_name: "Band".into(),
            artist_id: "b".into(),
            release_date: "1997-05-21".into(),
            total_tracks: 9,
            image_url: String::new(),
            label: None,
            genres: None,
        };
        assert_eq!(album.release_year(), "1997");
        let year_only = LibraryAlbum {
            release_date: "2001".into(),
            ..album
        };
        assert_eq!(year_only.release_year(), "2001");
    }

    #[test]
    fn library_counts_default_missing_categories() -> Result<(), serde_json::Error> {
        let counts: LibraryCounts = serde_json::from_value(json!({"tracks": 12, "albums": 3}))?;
        assert_eq!(counts.for_kind(ResourceKind::Tracks), 12);
        assert_eq!(counts.for_kind(ResourceKind::Playlists), 0);
        Ok(())
    }
}
