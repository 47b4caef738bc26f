//! Command handlers grouped by concern.

pub(crate) mod library;
pub(crate) mod playlists;
pub(crate) mod token;
