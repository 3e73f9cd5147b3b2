use anyhow::{Context, anyhow};
use tracing::instrument;

use crate::error::Error;
use crate::report::TransferOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Move,
    Copy,
}

impl Operation {
    /// Name of the shell command performing this operation.
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self {
            Operation::Move => "mv",
            Operation::Copy => "cp",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Operation::Move => write!(f, "move"),
            Operation::Copy => write!(f, "copy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// A directory entry seen during enumeration. Symlinks are never followed.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub path: std::path::PathBuf,
    pub kind: EntryKind,
    pub size: Option<u64>,
}

impl DirectoryEntry {
    fn from_metadata(path: std::path::PathBuf, metadata: &std::fs::Metadata) -> Self {
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let size = (kind == EntryKind::File).then(|| metadata.len());
        Self { path, kind, size }
    }

    pub async fn from_dir_entry(entry: &tokio::fs::DirEntry) -> Result<Self, Error> {
        let path = entry.path();
        // DirEntry::metadata does not traverse symlinks
        let metadata = entry
            .metadata()
            .await
            .map_err(|error| Error::io(&path, &error))?;
        Ok(Self::from_metadata(path, &metadata))
    }

    pub async fn from_path(path: &std::path::Path) -> Result<Self, Error> {
        let metadata = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|error| Error::io(path, &error))?;
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

async fn create_parent(dst: &std::path::Path) -> Result<(), Error> {
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("cannot create directory {parent:?}"))
            .map_err(|err| Error::io_context(dst, &err))?;
    }
    Ok(())
}

async fn copy_entry(entry: &DirectoryEntry, dst: &std::path::Path) -> Result<u64, Error> {
    create_parent(dst).await?;
    if let Ok(dst_metadata) = tokio::fs::symlink_metadata(dst).await {
        // copying a file onto a symlink would write through it
        if dst_metadata.is_symlink() || entry.kind == EntryKind::Symlink {
            tracing::debug!("removing existing {:?}", dst);
            tokio::fs::remove_file(dst)
                .await
                .with_context(|| format!("failed removing existing {dst:?}"))
                .map_err(|err| Error::io_context(&entry.path, &err))?;
        }
    }
    match entry.kind {
        EntryKind::Symlink => {
            let link = tokio::fs::read_link(&entry.path)
                .await
                .with_context(|| format!("failed reading symlink {:?}", &entry.path))
                .map_err(|err| Error::io_context(&entry.path, &err))?;
            tokio::fs::symlink(&link, dst)
                .await
                .with_context(|| format!("failed creating symlink {dst:?}"))
                .map_err(|err| Error::io_context(&entry.path, &err))?;
            Ok(0)
        }
        EntryKind::File => {
            let _open_file_guard = throttle::open_file_permit().await;
            tokio::fs::copy(&entry.path, dst)
                .await
                .with_context(|| format!("failed copying to {dst:?}"))
                .map_err(|err| Error::io_context(&entry.path, &err))
        }
        EntryKind::Directory => Err(Error::io_context(
            &entry.path,
            &anyhow!("is a directory, the entry worker only transfers leaf entries"),
        )),
    }
}

async fn move_entry(entry: &DirectoryEntry, dst: &std::path::Path) -> Result<u64, Error> {
    create_parent(dst).await?;
    match tokio::fs::rename(&entry.path, dst).await {
        Ok(()) => Ok(entry.size.unwrap_or(0)),
        Err(error) if error.raw_os_error() == Some(libc::EXDEV) && !entry.is_dir() => {
            tracing::debug!(
                "{:?} and {:?} are on different devices, copying and removing instead",
                &entry.path,
                dst
            );
            let bytes = copy_entry(entry, dst).await?;
            tokio::fs::remove_file(&entry.path)
                .await
                .with_context(|| "failed removing source after copying it")
                .map_err(|err| Error::io_context(&entry.path, &err))?;
            Ok(bytes)
        }
        Err(error) => Err(Error::io_context(
            &entry.path,
            &anyhow::Error::new(error).context(format!("failed moving to {dst:?}")),
        )),
    }
}

/// Moves or copies a single entry to `dst`, creating missing parents of `dst`.
///
/// An existing destination file is overwritten. Errors are returned in the outcome, the
/// caller decides whether to keep going.
#[instrument(skip(entry), fields(src = ?entry.path))]
pub async fn transfer_entry(
    operation: Operation,
    entry: &DirectoryEntry,
    dst: &std::path::Path,
) -> TransferOutcome {
    let start = std::time::Instant::now();
    let result = match operation {
        Operation::Move => move_entry(entry, dst).await,
        Operation::Copy => copy_entry(entry, dst).await,
    };
    match result {
        Ok(bytes) => {
            tracing::debug!("{} succeeded, {} bytes", operation, bytes);
            TransferOutcome::success(bytes, start.elapsed())
        }
        Err(error) => {
            tracing::debug!("{} failed: {}", operation, &error);
            TransferOutcome::failure(error, start.elapsed())
        }
    }
}
