//! Directory tree transfer engine shared by the `mv` and `cp` commands of `tsh`
//!
//! A transfer takes a source path (file or directory) and a destination path and either
//! relocates ([`Operation::Move`]) or duplicates ([`Operation::Copy`]) every entry of the
//! source tree into the destination tree.
//!
//! # Traversal modes
//!
//! - **native** - `mv` renames the whole source, `cp` walks it like the sequential mode
//! - **sequential** ([`walk::walk`]) - depth-first on the calling task
//! - **blocking** ([`fanout::blocking`]) - one task per subdirectory, the caller waits for
//!   the whole tree and gets a complete report
//! - **detached** ([`fanout::detached`]) - one task per subdirectory, the caller only waits
//!   for the top-level directory; failures below it are logged, never reported
//!
//! Concurrent modes are bounded by the `throttle` crate, see [`apply_throttle`].
//!
//! # Symlinks
//!
//! Symlinks found inside a tree are recreated at the destination (`cp`) or renamed (`mv`),
//! they are never followed. A symlink given as the top-level source is resolved.
//!
//! # Reporting
//!
//! Every mode returns a [`report::TransferReport`] with counters, elapsed time and one
//! [`Error`] per failed entry. A failing entry never stops its siblings.
//!
//! # Backup and confirmation
//!
//! [`backup::backup`] copies the destination to `<destination>.bak` once a transfer is done.
//! [`gate::OverwriteGate`] asks the user about the overwrite, also after the fact.

use anyhow::{Context, anyhow};

pub mod backup;
pub mod config;
pub mod entry;
pub mod error;
pub mod fanout;
pub mod gate;
pub mod options;
pub mod path;
pub mod progress;
pub mod report;
pub mod rm;
pub mod transfer;
pub mod walk;

#[cfg(test)]
mod testutils;

pub use config::{OutputConfig, RuntimeConfig, ThrottleConfig};
pub use entry::Operation;
pub use error::Error;
pub use options::{Parsed, TransferOptions, TraversalMode};
pub use report::TransferReport;
pub use transfer::{TransferRequest, execute};

/// Installs the global `tracing` subscriber writing to stderr.
///
/// The level follows `output` unless `RUST_LOG` is set.
pub fn init_tracing(output: &OutputConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed initializing tracing: {err}"))
}

/// Builds the multi-threaded runtime every transfer runs on.
pub fn build_runtime(config: &RuntimeConfig) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if config.max_workers > 0 {
        builder.worker_threads(config.max_workers);
    }
    if config.max_blocking_threads > 0 {
        builder.max_blocking_threads(config.max_blocking_threads);
    }
    builder.build().context("failed to create tokio runtime")
}

fn default_max_open_files() -> anyhow::Result<usize> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit only writes to the struct we own
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()).context("failed reading RLIMIT_NOFILE");
    }
    let soft = usize::try_from(limit.rlim_cur).unwrap_or(usize::MAX);
    // leave room for stdio, the runtime and directory handles
    Ok((soft / 10 * 8).clamp(1, tokio::sync::Semaphore::MAX_PERMITS))
}

/// Configures the process-wide limits used by the concurrent walkers.
pub fn apply_throttle(config: &ThrottleConfig) -> anyhow::Result<()> {
    config.validate().map_err(|err| anyhow!(err))?;
    let max_open_files = match config.max_open_files {
        Some(max_open_files) => max_open_files,
        None => default_max_open_files()?,
    };
    let max_active_dirs = if config.max_active_dirs == 0 {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    } else {
        config.max_active_dirs
    };
    tracing::debug!(
        "max open files: {}, max active directories: {}",
        max_open_files,
        max_active_dirs
    );
    throttle::set_max_open_files(max_open_files);
    throttle::set_max_active_dirs(max_active_dirs);
    Ok(())
}
