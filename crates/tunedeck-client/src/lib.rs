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
#![allow(clippy::module_name_repetitions)]
//! Client-side data layer for the Tunedeck library dashboard.
//!
//! Layout:
//! - `token.rs`: bearer credential store and its persistence
//! - `fetch.rs`: HTTP adapters for library, browse, and validation endpoints
//! - `cache.rs`: memo table keyed by normalized request keys
//! - `queries.rs`: per-resource queries and the token validator
//! - `filters.rs`: page/page-size/total state for one paginated view
//! - `view.rs` + `format.rs`: routes, navigation, view controllers, cell text
//! - `state.rs`: the loading/error/success union consumed by views

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod format;
pub mod queries;
pub mod state;
pub mod token;
pub mod view;

pub use cache::{CachePolicy, QueryCache, QueryKey, QueryScope};
pub use config::{ClientConfig, RetryPolicy};
pub use error::{ApiError, FetchError};
pub use fetch::ApiClient;
pub use filters::PlaylistFilters;
pub use queries::{LibraryQueries, TokenValidator};
pub use state::QueryState;
pub use token::{FilePersistence, MemoryPersistence, TokenPersistence, TokenStore, TokenStoreError};
pub use tunedeck_api_models as models;
pub use view::{Navigation, PlaylistDrawer, PlaylistTable, Route, TableRow};
