//! One item end to end: folders, cover, files, tags, metadata, bookkeeping.
//!
//! Steps run in a fixed order and stop at the first terminal state:
//!
//! ```text
//! name -> paths -> shortcut? -> dry-run? -> create dirs -> cover
//!      -> metadata-only? -> collection root? -> files -> export -> DONE
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::RunContext;
use super::shortcut::create_shortcut;
use crate::config::DownloadFormat;
use crate::download::{
    DownloadPlan, DownloadedFile, TrackTags, UNZIP_DIR, build_download_plan, extract_zip, tag_mp3,
};
use crate::item::WorkItem;
use crate::layout::{FolderPaths, item_name, resolve_named};
use crate::report::{export_description, export_json, sidecar_path};

/// Terminal state of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Already downloaded elsewhere in this run; a shortcut points there.
    Shortcut { target: PathBuf },
    /// Dry run: logged with the number of files that would be fetched.
    Reported { planned: usize },
    /// Metadata-only run, or a collection root.
    MetadataWritten,
    /// Files fetched (possibly none).
    Done { files: Vec<DownloadedFile> },
}

impl ItemOutcome {
    /// Files written by this item.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        match self {
            Self::Done { files } => files.len(),
            _ => 0,
        }
    }
}

/// Failure that stops one item; the run goes on.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("cannot create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Processes `item` according to the run options.
///
/// # Errors
///
/// Returns [`ItemError::CreateDir`] when an output folder cannot be created.
/// Every other failure (cover, single file, tags, export) is logged and
/// skipped.
#[instrument(skip(ctx, item), fields(url = %item.source_url))]
pub async fn download_item(ctx: &RunContext, item: &WorkItem) -> Result<ItemOutcome, ItemError> {
    let options = &ctx.options;
    let name = item_name(item);
    let paths = resolve_named(item, &name, &options.output_dir);
    let item_dir = paths.item_dir.clone();
    let skip = item.context.skip_download;

    if options.no_duplicates
        && !skip
        && let Some(target) = try_shortcut(ctx, item, &item_dir)
    {
        return Ok(ItemOutcome::Shortcut { target });
    }

    if options.dry_run {
        return Ok(report_dry_run(ctx, item, &item_dir).await);
    }

    create_dirs(&paths)?;

    let cover = match item.cover_url.as_deref() {
        Some(url) if options.write_cover => match ctx.client.download_cover(url, &item_dir).await {
            Ok(file) => Some(file.path),
            Err(error) => {
                warn!(url, error = %error, "cover download failed");
                None
            }
        },
        _ => None,
    };

    if options.metadata_only || skip {
        export_metadata(ctx, item, &name, &item_dir, &[]);
        record(ctx, item, &item_dir, 0, 0);
        if !skip {
            ctx.folders.register(&item.source_url, &item_dir);
        }
        return Ok(ItemOutcome::MetadataWritten);
    }

    let plan = build_download_plan(&ctx.client, item, options.format).await;
    let files = download_plan(ctx, item, &plan, &item_dir, cover.as_deref()).await;
    let paths_written: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    export_metadata(ctx, item, &name, &item_dir, &paths_written);

    let bytes = files.iter().map(|f| f.bytes).sum();
    record(ctx, item, &item_dir, files.len(), bytes);
    ctx.folders.register(&item.source_url, &item_dir);
    Ok(ItemOutcome::Done { files })
}

fn try_shortcut(ctx: &RunContext, item: &WorkItem, item_dir: &Path) -> Option<PathBuf> {
    let target = ctx.folders.get_existing(&item.source_url)?;
    let parent = item_dir.parent()?;
    let name = item_dir.file_name()?.to_string_lossy();
    if let Err(error) = create_shortcut(&target, parent, &name) {
        warn!(target = %target.display(), error = %error, "failed to create shortcut");
    }
    record(ctx, item, item_dir, 0, 0);
    Some(target)
}

async fn report_dry_run(ctx: &RunContext, item: &WorkItem, item_dir: &Path) -> ItemOutcome {
    let label = item.display_label();
    let (line, planned) = if item.context.skip_download {
        let children = item.child_urls.len();
        info!(label = %label, dir = %item_dir.display(), children, "dry run: metadata only");
        (
            format!(
                "COLLECTION: {label} | items={children} | output={} | url={}",
                item_dir.display(),
                item.source_url
            ),
            0,
        )
    } else {
        let plan = build_download_plan(&ctx.client, item, ctx.options.format).await;
        info!(label = %label, dir = %item_dir.display(), files = plan.len(), "dry run");
        (
            format!(
                "DRY-RUN: {label} | files={} | output={} | url={}",
                plan.len(),
                item_dir.display(),
                item.source_url
            ),
            plan.len(),
        )
    };
    if let Some(reporter) = &ctx.dry_run
        && let Err(error) = reporter.write_line(&line)
    {
        warn!(error = %error, "failed to write dry-run report");
    }
    record(ctx, item, item_dir, planned, 0);
    ItemOutcome::Reported { planned }
}

fn create_dirs(paths: &FolderPaths) -> Result<(), ItemError> {
    for dir in paths.dirs() {
        std::fs::create_dir_all(dir).map_err(|source| ItemError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

async fn download_plan(
    ctx: &RunContext,
    item: &WorkItem,
    plan: &DownloadPlan,
    item_dir: &Path,
    cover: Option<&Path>,
) -> Vec<DownloadedFile> {
    if plan.is_empty() {
        info!(label = %item.display_label(), "nothing to download");
        return Vec::new();
    }

    let mut files = Vec::with_capacity(plan.len());
    for link in &plan.links {
        let url = link.effective_url();
        if !ctx.downloads.allow(url) {
            debug!(url, "already downloaded in this run, skipping");
            continue;
        }
        let file = match ctx
            .client
            .download_file(url, item_dir, link.suggested_filename.as_deref())
            .await
        {
            Ok(file) => file,
            Err(error) => {
                warn!(url, error = %error, "download failed");
                continue;
            }
        };

        if has_extension(&file.path, "mp3") && ctx.options.write_id3 {
            let tags = TrackTags::for_item(item, plan.track_title(link), cover);
            let path = file.path.clone();
            match tokio::task::spawn_blocking(move || tag_mp3(&path, &tags)).await {
                Ok(Ok(())) => debug!(path = %file.path.display(), "tagged"),
                Ok(Err(error)) => warn!(error = %error, "ID3 tagging failed"),
                Err(error) => warn!(error = %error, "tagging task failed"),
            }
        }
        if has_extension(&file.path, "zip") && ctx.options.format == DownloadFormat::Unzip {
            unzip(&file.path, &item_dir.join(UNZIP_DIR)).await;
        }
        files.push(file);
    }
    files
}

async fn unzip(archive: &Path, dest: &Path) {
    let (archive, dest) = (archive.to_path_buf(), dest.to_path_buf());
    let result = tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&dest).map_err(|e| e.to_string())?;
        extract_zip(&archive, &dest).map_err(|e| e.to_string())
    })
    .await;
    match result {
        Ok(Ok(count)) => info!(entries = count, "archive extracted"),
        Ok(Err(error)) => warn!(error = %error, "unzip failed"),
        Err(error) => warn!(error = %error, "unzip task failed"),
    }
}

fn export_metadata(ctx: &RunContext, item: &WorkItem, name: &str, item_dir: &Path, files: &[PathBuf]) {
    if ctx.options.write_description
        && let Err(error) = export_description(item.description.as_deref(), item_dir)
    {
        warn!(error = %error, "description export failed");
    }
    if ctx.options.write_json
        && let Err(error) = export_json(item, &sidecar_path(item_dir, name), files)
    {
        warn!(error = %error, "JSON export failed");
    }
}

/// Summary and project progress for a finished item.
fn record(ctx: &RunContext, item: &WorkItem, item_dir: &Path, files: usize, bytes: u64) {
    if let Some(summary) = &ctx.summary {
        summary.add_item(item, item_dir, files, bytes);
    }
    if !item.context.skip_download
        && let Some(project) = item.context.collection_root.as_deref()
    {
        ctx.progress.mark_done(project);
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
