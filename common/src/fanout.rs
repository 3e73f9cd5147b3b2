//! Concurrent tree transfers spawning one task per subdirectory
//!
//! Two disciplines are offered and they are NOT interchangeable:
//!
//! - [`blocking`]: the caller waits until every spawned task finished and gets a complete
//!   report. Use this whenever the result matters.
//! - [`detached`]: subdirectories are handed to fire-and-forget tasks. The caller only waits
//!   for the root directory's own files, the returned report says nothing about the
//!   subdirectories and their failures are only logged with `tracing::error!`. The tasks
//!   keep running on the runtime after the call returns, see [`wait_detached`].
//!
//! In both modes a directory task holds a [`throttle::directory_permit`] while it enumerates
//! and transfers its own files and releases it before waiting for anything else.

use async_recursion::async_recursion;
use tracing::{Instrument, instrument};

use crate::entry::{self, DirectoryEntry, Operation};
use crate::error::Error;
use crate::progress;
use crate::report::TransferReport;
use crate::walk::{ensure_dir, remove_moved_dir};

#[async_recursion]
async fn blocking_dir(
    operation: Operation,
    src: std::path::PathBuf,
    dst: std::path::PathBuf,
) -> TransferReport {
    let dir_guard = throttle::directory_permit().await;
    tracing::debug!("walking {:?}", &src);
    let mut report = TransferReport::default();
    ensure_dir(&dst, &mut report).await;
    let mut entries = match tokio::fs::read_dir(&src).await {
        Ok(entries) => entries,
        Err(error) => {
            report.fail(Error::io(&src, &error));
            return report;
        }
    };
    let mut join_set = tokio::task::JoinSet::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                report.fail(Error::io(&src, &error));
                break;
            }
        };
        let entry = match DirectoryEntry::from_dir_entry(&entry).await {
            Ok(entry) => entry,
            Err(error) => {
                report.fail(error);
                continue;
            }
        };
        let Some(name) = entry.path.file_name() else {
            continue;
        };
        let dst_path = dst.join(name);
        if entry.is_dir() {
            join_set.spawn(blocking_dir(operation, entry.path, dst_path).in_current_span());
        } else {
            report.record(entry::transfer_entry(operation, &entry, &dst_path).await);
        }
    }
    // ReadDir holds a file descriptor, release it together with the permit
    drop(entries);
    drop(dir_guard);
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(child_report) => report = report + child_report,
            Err(error) => {
                tracing::error!("task walking a subdirectory of {:?} failed: {}", &src, &error);
                report.fail(Error::Io {
                    path: src.clone(),
                    reason: format!("subdirectory task failed: {error}"),
                });
            }
        }
    }
    remove_moved_dir(operation, &src, &mut report).await;
    report
}

/// Single-dispatch blocking fan-out.
///
/// Spawns one root task that walks `src` spawning a task for every subdirectory, and waits
/// until all of them finished. Every task returns its own report, reports are merged after
/// each join so the result covers the whole tree. When moving, source directories are
/// removed once everything under them moved successfully.
#[instrument]
pub async fn blocking(
    operation: Operation,
    src: &std::path::Path,
    dst: &std::path::Path,
) -> TransferReport {
    let start = std::time::Instant::now();
    let root = tokio::spawn(
        blocking_dir(operation, src.to_path_buf(), dst.to_path_buf()).in_current_span(),
    );
    let mut report = match root.await {
        Ok(report) => report,
        Err(error) => {
            let mut report = TransferReport::default();
            report.fail(Error::Io {
                path: src.to_path_buf(),
                reason: format!("transfer task failed: {error}"),
            });
            report
        }
    };
    report.total_elapsed = start.elapsed();
    tracing::info!(
        "blocking {} of {:?} finished, {} failures",
        operation,
        src,
        report.failures.len()
    );
    report
}

fn log_failure(operation: Operation, error: &Error) {
    tracing::error!("background {} failed: {}", operation, error);
}

#[async_recursion]
async fn detached_dir(
    operation: Operation,
    src: std::path::PathBuf,
    dst: std::path::PathBuf,
    is_root: bool,
) -> TransferReport {
    let _dir_guard = throttle::directory_permit().await;
    tracing::debug!("walking {:?}", &src);
    let mut report = TransferReport::default();
    // failures below the root never reach the caller, log them as they happen
    let fail = |report: &mut TransferReport, error: Error| {
        if !is_root {
            log_failure(operation, &error);
        }
        report.fail(error);
    };
    ensure_dir(&dst, &mut report).await;
    if !is_root {
        for error in &report.failures {
            log_failure(operation, error);
        }
    }
    let mut entries = match tokio::fs::read_dir(&src).await {
        Ok(entries) => entries,
        Err(error) => {
            fail(&mut report, Error::io(&src, &error));
            return report;
        }
    };
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                fail(&mut report, Error::io(&src, &error));
                break;
            }
        };
        let entry = match DirectoryEntry::from_dir_entry(&entry).await {
            Ok(entry) => entry,
            Err(error) => {
                fail(&mut report, error);
                continue;
            }
        };
        let Some(name) = entry.path.file_name() else {
            continue;
        };
        let dst_path = dst.join(name);
        if entry.is_dir() {
            spawn_detached(operation, entry.path, dst_path);
        } else {
            let outcome = entry::transfer_entry(operation, &entry, &dst_path).await;
            if let Some(error) = outcome.error.as_ref().filter(|_| !is_root) {
                log_failure(operation, error);
            }
            report.record(outcome);
        }
    }
    report
}

fn spawn_detached(operation: Operation, src: std::path::PathBuf, dst: std::path::PathBuf) {
    let guard = progress::DETACHED.guard();
    tokio::spawn(
        async move {
            let _guard = guard;
            let report = detached_dir(operation, src, dst, false).await;
            tracing::debug!(
                "background directory task done, {} transferred, {} failed",
                report.files_transferred,
                report.failures.len()
            );
        }
        .in_current_span(),
    );
}

/// Fire-and-forget fan-out.
///
/// Spawns one root task for `src` and waits for it. The root transfers its own files and
/// hands every subdirectory to a detached task that does the same, recursively, without
/// anyone waiting for them.
///
/// The returned report only covers the files directly inside `src`. Subdirectories may still
/// be in flight when this returns and their failures are **not** reported here, they are
/// only logged as they occur. Emptied source directories are left in place when moving.
#[instrument]
pub async fn detached(
    operation: Operation,
    src: &std::path::Path,
    dst: &std::path::Path,
) -> TransferReport {
    let start = std::time::Instant::now();
    let root = tokio::spawn(
        detached_dir(operation, src.to_path_buf(), dst.to_path_buf(), true).in_current_span(),
    );
    let mut report = match root.await {
        Ok(report) => report,
        Err(error) => {
            let mut report = TransferReport::default();
            report.fail(Error::Io {
                path: src.to_path_buf(),
                reason: format!("transfer task failed: {error}"),
            });
            report
        }
    };
    report.total_elapsed = start.elapsed();
    tracing::info!(
        "detached {} of {:?} returned, {} background tasks pending",
        operation,
        src,
        progress::detached_pending()
    );
    report
}

/// Waits until no detached directory task is running, polling every `interval`.
pub async fn wait_detached(interval: std::time::Duration) {
    loop {
        let pending = progress::detached_pending();
        if pending == 0 {
            return;
        }
        tracing::trace!("{} detached tasks pending", pending);
        tokio::time::sleep(interval).await;
    }
}
