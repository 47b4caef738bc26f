//! Application context and error type shared by command handlers.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tunedeck_api_models::ResourceKind;
use tunedeck_client::{
    ClientConfig, FilePersistence, LibraryQueries, QueryState, TokenStore,
};
use url::Url;

use crate::cli::Cli;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) queries: Arc<LibraryQueries>,
    pub(crate) config: ClientConfig,
}

impl AppContext {
    /// Build the context from parsed flags, restoring the persisted token.
    pub(crate) fn from_cli(cli: &Cli) -> CliResult<Self> {
        let config =
            ClientConfig::new(cli.api_url.clone()).with_timeout(Duration::from_secs(cli.timeout));
        let tokens = TokenStore::with_persistence(FilePersistence::new(&cli.token_file))
            .map_err(|err| {
                CliError::failure(anyhow::Error::new(err).context(format!(
                    "failed to read token file {}",
                    cli.token_file.display()
                )))
            })?;
        Self::new(config, tokens)
    }

    pub(crate) fn new(config: ClientConfig, tokens: TokenStore) -> CliResult<Self> {
        let queries = LibraryQueries::from_config(&config, Arc::new(tokens)).map_err(|err| {
            CliError::failure(anyhow::Error::new(err).context("failed to build HTTP client"))
        })?;
        Ok(Self {
            queries: Arc::new(queries),
            config,
        })
    }

    pub(crate) fn tokens(&self) -> &TokenStore {
        self.queries.tokens()
    }
}

/// Unwrap a settled query, mapping a missing token to a validation error.
pub(crate) fn settled<T>(state: QueryState<T>, what: &str) -> CliResult<T> {
    match state {
        QueryState::Success(data) => Ok(data),
        QueryState::Error(error) if error.is_missing_token() => Err(CliError::validation(
            "no token stored (run `tunedeck token set <TOKEN>` first)",
        )),
        QueryState::Error(error) => Err(CliError::failure(anyhow!(
            "failed to load {what}: {error}"
        ))),
        QueryState::Loading => Err(CliError::failure(anyhow!("{what} did not load"))),
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Parse a resource kind argument.
pub(crate) fn parse_kind(input: &str) -> Result<ResourceKind, String> {
    input.parse::<ResourceKind>().map_err(|_| {
        format!("unknown resource '{input}' (expected tracks, albums, artists, or playlists)")
    })
}
