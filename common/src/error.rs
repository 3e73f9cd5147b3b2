/// Error produced by the transfer engine.
///
/// Every variant that concerns a filesystem entry carries its path so a failure can be
/// printed on its own line without any further context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Source does not exist: {}", .0.display())]
    NotFound(std::path::PathBuf),
    #[error("{}: {reason}", .path.display())]
    Io {
        path: std::path::PathBuf,
        reason: String,
    },
    #[error("{0}")]
    InvalidArgument(String),
}

impl Error {
    #[must_use]
    pub fn io(path: &std::path::Path, error: &std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }
    }

    /// Wraps anything displayable, keeping the full error chain of `anyhow` errors.
    #[must_use]
    pub fn io_context(path: &std::path::Path, error: &anyhow::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            reason: format!("{error:#}"),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Error::NotFound(path) | Error::Io { path, .. } => Some(path),
            Error::InvalidArgument(_) => None,
        }
    }

    /// Human readable reason without the path.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Error::NotFound(_) => "No such file or directory".to_string(),
            Error::Io { reason, .. } => reason.clone(),
            Error::InvalidArgument(message) => message.clone(),
        }
    }
}
