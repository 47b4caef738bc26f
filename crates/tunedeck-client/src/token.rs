//! Bearer token storage.
//!
//! # Design
//! - The in-memory value is authoritative; persistence mirrors it.
//! - Blank values are treated as absent.
//! - Only the token is persisted, as `{"token": "..."}`.

use std::fmt::Debug;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Query parameter carrying a token on redirect from the login flow.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Errors raised by token persistence.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// Reading or writing the token file failed.
    #[error("token file io failed")]
    Io {
        /// Token file path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The token file is not valid JSON.
    #[error("token file is malformed")]
    Malformed {
        /// Token file path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Backing storage for the token.
pub trait TokenPersistence: Send + Sync + Debug {
    /// Read the persisted token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be read.
    fn load(&self) -> Result<Option<String>, TokenStoreError>;

    /// Persist a token, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be written.
    fn store(&self, token: &str) -> Result<(), TokenStoreError>;

    /// Remove the persisted token.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be cleared.
    fn clear(&self) -> Result<(), TokenStoreError>;
}

/// Persistence that keeps nothing beyond the process lifetime.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryPersistence;

impl TokenPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(None)
    }

    fn store(&self, _token: &str) -> Result<(), TokenStoreError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedToken {
    token: Option<String>,
}

/// Persistence backed by a small JSON document on disk.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// Persist to the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenPersistence for FilePersistence {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        let persisted: PersistedToken =
            serde_json::from_str(&raw).map_err(|source| TokenStoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(persisted.token)
    }

    fn store(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let body = serde_json::to_string_pretty(&PersistedToken {
            token: Some(token.to_string()),
        })
        .map_err(|source| TokenStoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        write_private(&self.path, body.as_bytes()).map_err(|err| self.io_error(err))
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

/// Write `contents` to `path`, readable by the owner only on unix.
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)
}

/// Holder of the bearer credential used by every query.
#[derive(Debug)]
pub struct TokenStore {
    current: RwLock<Option<String>>,
    persistence: Box<dyn TokenPersistence>,
}

impl TokenStore {
    /// Store that forgets the token when dropped.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(None),
            persistence: Box::new(MemoryPersistence),
        }
    }

    /// Store seeded with the value already held by `persistence`.
    ///
    /// # Errors
    ///
    /// Returns an error when the persisted value cannot be read.
    pub fn with_persistence(
        persistence: impl TokenPersistence + 'static,
    ) -> Result<Self, TokenStoreError> {
        let loaded = persistence.load()?.and_then(normalize);
        debug!(restored = loaded.is_some(), "token store opened");
        Ok(Self {
            current: RwLock::new(loaded),
            persistence: Box::new(persistence),
        })
    }

    /// Current token; blank values read as absent.
    #[must_use]
    pub fn get_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a usable token is held.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.get_token().is_some()
    }

    /// Replace the token. A blank value clears it.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be persisted. The in-memory
    /// value is updated regardless.
    pub fn set_token(&self, value: impl Into<String>) -> Result<(), TokenStoreError> {
        let Some(token) = normalize(value.into()) else {
            return self.clear();
        };
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        self.persistence.store(&token)
    }

    /// Forget the token.
    ///
    /// # Errors
    ///
    /// Returns an error when the persisted copy cannot be removed.
    pub fn clear(&self) -> Result<(), TokenStoreError> {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.persistence.clear()
    }

    /// Store the `token` query parameter of `url`, if present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns an error when the captured value cannot be persisted.
    pub fn capture_from_url(&self, url: &Url) -> Result<Option<String>, TokenStoreError> {
        let captured = url
            .query_pairs()
            .find(|(name, _)| name == TOKEN_QUERY_PARAM)
            .and_then(|(_, value)| normalize(value.into_owned()));
        if let Some(token) = &captured {
            self.set_token(token.clone())?;
            info!("token captured from redirect url");
        }
        Ok(captured)
    }
}

fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}
