//! Command-line client for browsing a Tunedeck library.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{Instrument, debug, error, info_span};
use tunedeck_api_models::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, ResourceKind};
use tunedeck_client::config::DEFAULT_API_URL;
use tunedeck_telemetry::{LogFormat, LoggingConfig, build_sha, init_logging};
use url::Url;

use crate::client::{AppContext, CliResult, parse_kind, parse_url};
use crate::commands::library::{handle_browse, handle_library, handle_saved};
use crate::commands::playlists::{handle_playlist, handle_playlists};
use crate::commands::token::{
    handle_token_capture, handle_token_clear, handle_token_set, handle_token_show,
    handle_validate,
};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TOKEN_FILE: &str = ".tunedeck/token.json";
const DEFAULT_CLI_LOG_LEVEL: &str = "warn";
const BUILD_SHA: &str = match option_env!("TUNEDECK_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: BUILD_SHA,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    let span = info_span!("tunedeck", command = command_name, build_sha = build_sha());
    let result = match AppContext::from_cli(&cli) {
        Ok(ctx) => {
            dispatch(cli.command, &ctx, cli.output)
                .instrument(span.clone())
                .await
        }
        Err(err) => Err(err),
    };
    let _entered = span.enter();

    match result {
        Ok(()) => {
            debug!(command = command_name, "command completed");
            0
        }
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            error!(command = command_name, exit_code, "command failed");
            eprintln!("error: {message}");
            exit_code
        }
    }
}

async fn dispatch(command: Command, ctx: &AppContext, output: OutputFormat) -> CliResult<()> {
    match command {
        Command::Validate(args) => handle_validate(ctx, args, output).await,
        Command::Token(token) => match token {
            TokenCommand::Set(args) => handle_token_set(ctx, args),
            TokenCommand::Show(args) => handle_token_show(ctx, args, output),
            TokenCommand::Clear => handle_token_clear(ctx),
            TokenCommand::Capture(args) => handle_token_capture(ctx, &args),
        },
        Command::Library(args) => handle_library(ctx, args, output).await,
        Command::Browse(args) => handle_browse(ctx, args, output).await,
        Command::Playlists(args) => handle_playlists(ctx, args, output).await,
        Command::Playlist(args) => handle_playlist(ctx, args, output).await,
        Command::Saved => handle_saved(ctx, output).await,
    }
}

#[derive(Parser)]
#[command(name = "tunedeck", about = "Browse a Tunedeck music library from the terminal")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "TUNEDECK_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "TUNEDECK_TOKEN_FILE",
        default_value = DEFAULT_TOKEN_FILE
    )]
    pub(crate) token_file: PathBuf,
    #[arg(
        long,
        global = true,
        env = "TUNEDECK_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "TUNEDECK_LOG_LEVEL",
        default_value = DEFAULT_CLI_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    /// `pretty` or `json`; defaults to pretty in debug builds and JSON otherwise.
    #[arg(long, global = true, env = "TUNEDECK_LOG_FORMAT", value_parser = parse_log_format)]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Check the stored token against the backend.
    Validate(ValidateArgs),
    /// Manage the stored token.
    #[command(subcommand)]
    Token(TokenCommand),
    /// List a saved-library collection.
    Library(LibraryArgs),
    /// List a browse collection.
    Browse(BrowseArgs),
    /// Page through browsed playlists.
    Playlists(PlaylistsArgs),
    /// Show one playlist and its tracks.
    Playlist(PlaylistArgs),
    /// Show saved-library counts.
    Saved,
}

#[derive(Subcommand)]
pub(crate) enum TokenCommand {
    /// Store a token.
    Set(TokenSetArgs),
    /// Print the stored token.
    Show(TokenShowArgs),
    /// Forget the stored token.
    Clear,
    /// Store the `token` query parameter of a redirect URL.
    Capture(TokenCaptureArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Keep re-validating on the configured interval.
    #[arg(long)]
    pub(crate) watch: bool,
    /// Stop watching after this many checks.
    #[arg(long, requires = "watch")]
    pub(crate) count: Option<u32>,
    /// Seconds between checks while watching.
    #[arg(long, requires = "watch", value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) interval_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub(crate) struct TokenSetArgs {
    pub(crate) token: String,
}

#[derive(Args, Debug)]
pub(crate) struct TokenShowArgs {
    /// Print the full token instead of a masked form.
    #[arg(long)]
    pub(crate) reveal: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TokenCaptureArgs {
    #[arg(value_parser = parse_url)]
    pub(crate) url: Url,
}

#[derive(Args, Debug)]
pub(crate) struct LibraryArgs {
    #[arg(value_parser = parse_kind)]
    pub(crate) kind: ResourceKind,
    /// Maximum rows to request.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) limit: Option<u32>,
}

#[derive(Args, Debug)]
pub(crate) struct BrowseArgs {
    #[arg(value_parser = parse_kind)]
    pub(crate) kind: ResourceKind,
}

#[derive(Args, Debug)]
pub(crate) struct PlaylistsArgs {
    #[arg(long, default_value_t = DEFAULT_PAGE, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) page: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub(crate) page_size: u32,
}

#[derive(Args, Debug)]
pub(crate) struct PlaylistArgs {
    pub(crate) id: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input
        .parse::<LogFormat>()
        .map_err(|_| format!("unknown log format '{input}' (expected pretty or json)"))
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Validate(_) => "validate",
        Command::Token(TokenCommand::Set(_)) => "token_set",
        Command::Token(TokenCommand::Show(_)) => "token_show",
        Command::Token(TokenCommand::Clear) => "token_clear",
        Command::Token(TokenCommand::Capture(_)) => "token_capture",
        Command::Library(_) => "library",
        Command::Browse(_) => "browse",
        Command::Playlists(_) => "playlists",
        Command::Playlist(_) => "playlist",
        Command::Saved => "saved",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_and_defaults_parse() {
        let cli = Cli::try_parse_from([
            "tunedeck",
            "--api-url",
            "http://example.test:9000",
            "--output",
            "json",
            "playlists",
            "--page",
            "2",
        ])
        .expect("valid arguments");
        assert_eq!(cli.api_url.as_str(), "http://example.test:9000/");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, None);
        match cli.command {
            Command::Playlists(args) => {
                assert_eq!(args.page, 2);
                assert_eq!(args.page_size, DEFAULT_PAGE_SIZE);
            }
            _ => panic!("expected playlists command"),
        }
    }

    #[test]
    fn resource_kind_arguments_accept_singular_names() {
        let cli = Cli::try_parse_from(["tunedeck", "library", "track", "--limit", "5"])
            .expect("valid arguments");
        match cli.command {
            Command::Library(args) => {
                assert_eq!(args.kind, ResourceKind::Tracks);
                assert_eq!(args.limit, Some(5));
            }
            _ => panic!("expected library command"),
        }
        assert!(Cli::try_parse_from(["tunedeck", "browse", "podcasts"]).is_err());
    }

    #[test]
    fn zero_page_sizes_are_rejected() {
        assert!(Cli::try_parse_from(["tunedeck", "playlists", "--page-size", "0"]).is_err());
        assert!(Cli::try_parse_from(["tunedeck", "library", "albums", "--limit", "0"]).is_err());
    }

    #[test]
    fn build_sha_falls_back_to_dev() {
        assert_eq!(
            BUILD_SHA,
            option_env!("TUNEDECK_BUILD_SHA").unwrap_or("dev")
        );
        assert!(!BUILD_SHA.is_empty());
    }

    #[test]
    fn log_format_uses_telemetry_names() {
        let cli = Cli::try_parse_from(["tunedeck", "--log-format", "json", "saved"])
            .expect("valid arguments");
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(Cli::try_parse_from(["tunedeck", "--log-format", "xml", "saved"]).is_err());
    }

    #[test]
    fn watch_options_require_watch() {
        assert!(Cli::try_parse_from(["tunedeck", "validate", "--count", "2"]).is_err());
        let cli = Cli::try_parse_from(["tunedeck", "validate", "--watch", "--count", "2"])
            .expect("valid arguments");
        assert_eq!(command_label(&cli.command), "validate");
    }

    #[test]
    fn command_label_matches_variants() {
        assert_eq!(command_label(&Command::Saved), "saved");
        assert_eq!(
            command_label(&Command::Token(TokenCommand::Clear)),
            "token_clear"
        );
        assert_eq!(
            command_label(&Command::Playlist(PlaylistArgs {
                id: "p1".to_string()
            })),
            "playlist"
        );
    }
}
