use tracing::instrument;

use crate::entry::{self, DirectoryEntry, Operation};
use crate::error::Error;
use crate::report::TransferReport;
use crate::rm;
use crate::walk;

/// `<destination>.bak`, next to the destination.
#[must_use]
pub fn backup_path(destination: &std::path::Path) -> std::path::PathBuf {
    let mut backup = destination.as_os_str().to_owned();
    backup.push(".bak");
    std::path::PathBuf::from(backup)
}

/// Duplicates `destination` to [`backup_path`], replacing any previous backup.
///
/// Directories are copied with the sequential walker. The returned report describes the
/// backup copy, an `Err` means the previous backup could not be removed or the destination
/// could not be read at all.
///
/// The copy is only a consistent snapshot if nothing writes to the destination meanwhile,
/// callers that left detached transfers running must wait for them first
/// ([`crate::fanout::wait_detached`]).
#[instrument]
pub async fn backup(destination: &std::path::Path) -> Result<TransferReport, Error> {
    let backup = backup_path(destination);
    let source = DirectoryEntry::from_path(destination).await?;
    if tokio::fs::symlink_metadata(&backup).await.is_ok() {
        tracing::debug!("removing previous backup {:?}", &backup);
        rm::rm(&backup)
            .await
            .map_err(|err| Error::io_context(&backup, &err))?;
    }
    let report = if source.is_dir() {
        walk::walk(Operation::Copy, destination, &backup).await
    } else {
        let start = std::time::Instant::now();
        let mut report = TransferReport::default();
        report.record(entry::transfer_entry(Operation::Copy, &source, &backup).await);
        report.total_elapsed = start.elapsed();
        report
    };
    tracing::info!(
        "backup of {:?} to {:?} done, {} failures",
        destination,
        &backup,
        report.failures.len()
    );
    Ok(report)
}
