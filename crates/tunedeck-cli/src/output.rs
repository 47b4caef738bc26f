//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tunedeck_api_models::{
    BrowserPlaylist, LibraryCounts, PaginatedResponse, PlaylistDetail, ResourceKind,
    TokenValidation,
};
use tunedeck_client::format::{feature_label, format_feature};
use tunedeck_client::{PlaylistFilters, TableRow};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

/// Lay out rows under upper-cased headers, padding every column but the last.
pub(crate) fn format_table<I>(columns: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let rows: Vec<Vec<String>> = rows.into_iter().collect();
    let headers: Vec<String> = columns.iter().map(|c| c.to_uppercase()).collect();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut out = String::new();
    for line in std::iter::once(&headers).chain(rows.iter()) {
        let cells: Vec<String> = line
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                if index + 1 == line.len() {
                    cell.clone()
                } else {
                    let width = widths.get(index).copied().unwrap_or_default();
                    format!("{cell:<width$}")
                }
            })
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

pub(crate) fn render_rows<T>(rows: &[T], format: OutputFormat) -> CliResult<()>
where
    T: TableRow + Serialize,
{
    match format {
        OutputFormat::Json => print_json(rows)?,
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No results.");
            } else {
                print!("{}", format_table(T::COLUMNS, rows.iter().map(TableRow::cells)));
            }
        }
    }
    Ok(())
}

pub(crate) fn render_playlist_page(
    page: &PaginatedResponse<BrowserPlaylist>,
    filters: &PlaylistFilters,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(page)?,
        OutputFormat::Table => {
            render_rows(&page.data, format)?;
            println!(
                "page {} of {} ({} playlists, {} per page)",
                filters.page(),
                filters.num_pages().max(1),
                filters.total(),
                filters.page_size()
            );
        }
    }
    Ok(())
}

pub(crate) fn render_playlist_detail(detail: &PlaylistDetail, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(detail)?,
        OutputFormat::Table => {
            let playlist = &detail.playlist;
            println!("name: {}", playlist.name);
            if let Some(description) = playlist.description.as_deref().filter(|d| !d.is_empty()) {
                println!("description: {description}");
            }
            println!("followers: {}", playlist.follower_count);
            println!(
                "public: {}  collaborative: {}  analyzed: {}",
                playlist.public, playlist.collaborative, playlist.is_analyzed
            );
            println!();
            render_rows(&detail.tracks, format)?;
            for track in &detail.tracks {
                let Some(features) = &track.features else {
                    continue;
                };
                println!();
                println!("{}:", track.name);
                for (name, value) in features.entries() {
                    println!("  {}: {}", feature_label(name), format_feature(name, value));
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn render_counts(counts: &LibraryCounts, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(counts)?,
        OutputFormat::Table => {
            let rows = ResourceKind::all()
                .into_iter()
                .map(|kind| vec![kind.to_string(), counts.for_kind(kind).to_string()])
                .chain(std::iter::once(vec![
                    "shows".to_string(),
                    counts.shows.to_string(),
                ]));
            print!("{}", format_table(&["Category", "Saved"], rows));
        }
    }
    Ok(())
}

pub(crate) fn render_validation(
    validation: &TokenValidation,
    validated_at: Option<DateTime<Utc>>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "message": validation.message,
            "validated_at": validated_at.map(|at| at.to_rfc3339()),
        }))?,
        OutputFormat::Table => match validated_at {
            Some(at) => println!("{} (checked {})", validation.message, at.to_rfc3339()),
            None => println!("{}", validation.message),
        },
    }
    Ok(())
}

pub(crate) fn render_token(masked: Option<&str>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "token": masked }))?,
        OutputFormat::Table => println!("{}", masked.unwrap_or("no token stored")),
    }
    Ok(())
}
