//! Token storage and validation commands.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};
use tunedeck_api_models::TokenValidation;
use tunedeck_client::{QueryState, TokenStoreError, TokenValidator};

use crate::cli::{OutputFormat, TokenCaptureArgs, TokenSetArgs, TokenShowArgs, ValidateArgs};
use crate::client::{AppContext, CliError, CliResult, settled};
use crate::output::{render_token, render_validation};

fn storage_failure(err: TokenStoreError) -> CliError {
    CliError::failure(anyhow::Error::new(err).context("failed to update token file"))
}

pub(crate) fn handle_token_set(ctx: &AppContext, args: TokenSetArgs) -> CliResult<()> {
    let token = args.token.trim();
    if token.is_empty() {
        return Err(CliError::validation("token must not be empty"));
    }
    ctx.queries.replace_token(token).map_err(storage_failure)?;
    println!("Token saved.");
    Ok(())
}

pub(crate) fn handle_token_show(
    ctx: &AppContext,
    args: TokenShowArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let Some(token) = ctx.tokens().get_token() else {
        return Err(CliError::validation("no token stored"));
    };
    let shown = if args.reveal {
        token
    } else {
        mask_token(&token)
    };
    render_token(Some(&shown), format)
}

pub(crate) fn handle_token_clear(ctx: &AppContext) -> CliResult<()> {
    ctx.queries.clear_token().map_err(storage_failure)?;
    println!("Token cleared.");
    Ok(())
}

pub(crate) fn handle_token_capture(ctx: &AppContext, args: &TokenCaptureArgs) -> CliResult<()> {
    match ctx.tokens().capture_from_url(&args.url).map_err(storage_failure)? {
        Some(_) => {
            ctx.queries.cache().clear();
            println!("Token captured.");
            Ok(())
        }
        None => Err(CliError::validation("URL has no token query parameter")),
    }
}

pub(crate) async fn handle_validate(
    ctx: &AppContext,
    args: ValidateArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let validator = TokenValidator::new(Arc::clone(&ctx.queries), &ctx.config);
    if !args.watch {
        let validation = settled(validator.validate().await, "token validation")?;
        return render_validation(&validation, validator.last_validated(), format);
    }

    let period = args
        .interval_secs
        .map_or(ctx.config.validation_interval, Duration::from_secs);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut checks = 0_u32;
    let mut last = Ok(());

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for ctrl-c");
                }
                info!(checks, "validation watch interrupted");
                return last;
            }
        }

        let state = if checks == 0 {
            validator.validate().await
        } else {
            validator.revalidate().await
        };
        checks += 1;
        last = watch_outcome(state, validator.last_validated(), format);
        match &last {
            Err(CliError::Validation(_)) => return last,
            Err(err) => eprintln!("error: {}", err.display_message()),
            Ok(()) => {}
        }
        if args.count.is_some_and(|count| checks >= count) {
            return last;
        }
    }
}

fn watch_outcome(
    state: QueryState<Arc<TokenValidation>>,
    validated_at: Option<DateTime<Utc>>,
    format: OutputFormat,
) -> CliResult<()> {
    let validation = settled(state, "token validation")?;
    render_validation(&validation, validated_at, format)
}

/// Keep the first and last four characters; short tokens are fully hidden.
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}
