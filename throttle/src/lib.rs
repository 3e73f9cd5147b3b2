//! Concurrency bounds for directory tree transfers
//!
//! The transfer engine may spawn one task per subdirectory, which for deep trees means
//! thousands of tasks. Tasks themselves are cheap but each of them opens a directory handle
//! and a number of files, so the amount of work in flight has to be bounded.
//!
//! Two process-wide limits are provided:
//!
//! 1. **Open Files Limit** - maximum number of files simultaneously open for copying
//! 2. **Active Directories Limit** - maximum number of directory tasks enumerating and
//!    transferring their own entries at the same time
//!
//! Both limits are disabled (unbounded) until configured.
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn example() {
//! throttle::set_max_open_files(8000);
//! throttle::set_max_active_dirs(8);
//!
//! // held while a directory task does its own work
//! let dir_guard = throttle::directory_permit().await;
//! // held while a single file is being copied
//! let _file_guard = throttle::open_file_permit().await;
//! // release the directory permit before waiting on child tasks
//! drop(dir_guard);
//! # }
//! ```
//!
//! # Avoiding deadlocks
//!
//! A directory task must never wait for its children while holding a directory permit:
//! with a bound of N and a tree deeper than N, every permit would be held by a parent
//! waiting for a child that cannot start. Children queue on the semaphore and start
//! once a permit is released.

mod semaphore;

static OPEN_FILES_LIMIT: std::sync::LazyLock<semaphore::Semaphore> =
    std::sync::LazyLock::new(semaphore::Semaphore::new);
static ACTIVE_DIRS_LIMIT: std::sync::LazyLock<semaphore::Semaphore> =
    std::sync::LazyLock::new(semaphore::Semaphore::new);

pub fn set_max_open_files(max_open_files: usize) {
    OPEN_FILES_LIMIT.setup(max_open_files);
}

pub fn set_max_active_dirs(max_active_dirs: usize) {
    tracing::debug!("limiting active directory tasks to {}", max_active_dirs);
    ACTIVE_DIRS_LIMIT.setup(max_active_dirs);
}

pub struct OpenFileGuard {
    _permit: Option<tokio::sync::SemaphorePermit<'static>>,
}

pub async fn open_file_permit() -> OpenFileGuard {
    OpenFileGuard {
        _permit: OPEN_FILES_LIMIT.acquire().await,
    }
}

pub struct DirectoryGuard {
    _permit: Option<tokio::sync::SemaphorePermit<'static>>,
}

pub async fn directory_permit() -> DirectoryGuard {
    DirectoryGuard {
        _permit: ACTIVE_DIRS_LIMIT.acquire().await,
    }
}
