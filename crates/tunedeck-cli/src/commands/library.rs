//! Saved-library, browse, and saved-count commands.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tunedeck_api_models::{
    BrowserPlaylist, LibraryAlbum, LibraryArtist, LibraryPlaylist, LibraryTrack, ResourceKind,
};
use tunedeck_client::TableRow;

use crate::cli::{BrowseArgs, LibraryArgs, OutputFormat};
use crate::client::{AppContext, CliResult, settled};
use crate::output::{render_counts, render_rows};

pub(crate) async fn handle_library(
    ctx: &AppContext,
    args: LibraryArgs,
    format: OutputFormat,
) -> CliResult<()> {
    match args.kind {
        ResourceKind::Tracks => library::<LibraryTrack>(ctx, args, format).await,
        ResourceKind::Albums => library::<LibraryAlbum>(ctx, args, format).await,
        ResourceKind::Artists => library::<LibraryArtist>(ctx, args, format).await,
        ResourceKind::Playlists => library::<LibraryPlaylist>(ctx, args, format).await,
    }
}

async fn library<T>(ctx: &AppContext, args: LibraryArgs, format: OutputFormat) -> CliResult<()>
where
    T: TableRow + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let state = ctx.queries.library::<T>(args.kind, args.limit).await;
    let resource = settled(state, args.kind.as_str())?;
    render_rows(&resource.data, format)
}

pub(crate) async fn handle_browse(
    ctx: &AppContext,
    args: BrowseArgs,
    format: OutputFormat,
) -> CliResult<()> {
    match args.kind {
        ResourceKind::Tracks => browse::<LibraryTrack>(ctx, args.kind, format).await,
        ResourceKind::Albums => browse::<LibraryAlbum>(ctx, args.kind, format).await,
        ResourceKind::Artists => browse::<LibraryArtist>(ctx, args.kind, format).await,
        ResourceKind::Playlists => browse::<BrowserPlaylist>(ctx, args.kind, format).await,
    }
}

async fn browse<T>(ctx: &AppContext, kind: ResourceKind, format: OutputFormat) -> CliResult<()>
where
    T: TableRow + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let resource = settled(ctx.queries.browse::<T>(kind).await, kind.as_str())?;
    render_rows(&resource.data, format)
}

pub(crate) async fn handle_saved(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let counts = settled(ctx.queries.saved_counts().await, "saved counts")?;
    render_counts(&counts, format)
}
