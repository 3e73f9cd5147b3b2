use tracing::instrument;

use crate::entry::{self, DirectoryEntry, EntryKind, Operation};
use crate::error::Error;
use crate::fanout;
use crate::options::{TransferOptions, TraversalMode};
use crate::path::{self, ResolvedSource};
use crate::report::TransferReport;
use crate::rm;
use crate::walk;

/// One `mv` or `cp` invocation with validated, absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub operation: Operation,
    pub source: ResolvedSource,
    pub destination: std::path::PathBuf,
    pub mode: TraversalMode,
    pub interactive: bool,
    pub backup: bool,
}

impl TransferRequest {
    /// Resolves the paths named in `options`, nothing is modified on disk.
    pub async fn new(operation: Operation, options: &TransferOptions) -> Result<Self, Error> {
        let (source, destination) = options.paths(operation)?;
        let source = path::resolve_source(source).await?;
        let destination = path::resolve_destination(destination, &source)?;
        path::check_not_nested(&source, &destination).await?;
        Ok(Self {
            operation,
            source,
            destination,
            mode: options.mode(),
            interactive: options.interactive,
            backup: options.backup,
        })
    }

    /// Whether the transfer walks a directory tree, as opposed to a single rename or copy.
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        self.source.is_dir()
            && !(self.mode == TraversalMode::Native && self.operation == Operation::Move)
    }
}

async fn rename_dir(src: &std::path::Path, dst: &std::path::Path) -> TransferReport {
    let start = std::time::Instant::now();
    let mut report = TransferReport::default();
    if let Some(parent) = dst.parent()
        && let Err(error) = tokio::fs::create_dir_all(parent).await
    {
        report.fail(Error::io(parent, &error));
        report.total_elapsed = start.elapsed();
        return report;
    }
    match tokio::fs::rename(src, dst).await {
        Ok(()) => {}
        Err(error) if error.raw_os_error() == Some(libc::EXDEV) => {
            tracing::info!(
                "{:?} and {:?} are on different devices, copying and removing instead",
                src,
                dst
            );
            report = walk::walk(Operation::Copy, src, dst).await;
            if report.is_success()
                && let Err(error) = rm::rm(src).await
            {
                report.fail(Error::io_context(src, &error));
            }
        }
        Err(error) => {
            let error = anyhow::Error::new(error).context(format!("failed moving to {dst:?}"));
            report.fail(Error::io_context(src, &error));
        }
    }
    report.total_elapsed = start.elapsed();
    report
}

/// Runs the transfer described by `request` and reports what happened.
///
/// A file source is handed to the entry worker whatever the mode. A directory source is
/// walked according to `request.mode`:
///
/// - [`TraversalMode::Native`]: `mv` renames the directory (copy + delete across devices),
///   `cp` walks it sequentially
/// - [`TraversalMode::Sequential`]: [`walk::walk`]
/// - [`TraversalMode::Detached`]: [`fanout::detached`], the report only covers the top-level
///   directory and errors below it are logged, not reported
/// - [`TraversalMode::Blocking`]: [`fanout::blocking`]
///
/// Confirmation and backup are the caller's business, they happen after this returns.
#[instrument(skip(request), fields(src = ?request.source.path, dst = ?request.destination))]
pub async fn execute(request: &TransferRequest) -> TransferReport {
    let src = request.source.path.as_path();
    let dst = request.destination.as_path();
    tracing::info!("{} using {:?}", request.operation, request.mode);
    if !request.source.is_dir() {
        let start = std::time::Instant::now();
        // symlinks were followed when resolving, a top-level link is treated as its target
        let entry = DirectoryEntry {
            path: src.to_path_buf(),
            kind: EntryKind::File,
            size: tokio::fs::metadata(src).await.ok().map(|md| md.len()),
        };
        let mut report = TransferReport::default();
        report.record(entry::transfer_entry(request.operation, &entry, dst).await);
        report.total_elapsed = start.elapsed();
        return report;
    }
    match (request.mode, request.operation) {
        (TraversalMode::Native, Operation::Move) => rename_dir(src, dst).await,
        (TraversalMode::Native, Operation::Copy) | (TraversalMode::Sequential, _) => {
            walk::walk(request.operation, src, dst).await
        }
        (TraversalMode::Detached, _) => fanout::detached(request.operation, src, dst).await,
        (TraversalMode::Blocking, _) => fanout::blocking(request.operation, src, dst).await,
    }
}
