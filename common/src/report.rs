use crate::error::Error;

/// Result of a single leaf operation performed by the entry worker.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub succeeded: bool,
    pub error: Option<Error>,
    pub elapsed: std::time::Duration,
    pub bytes: u64,
}

impl TransferOutcome {
    #[must_use]
    pub fn success(bytes: u64, elapsed: std::time::Duration) -> Self {
        Self {
            succeeded: true,
            error: None,
            elapsed,
            bytes,
        }
    }

    #[must_use]
    pub fn failure(error: Error, elapsed: std::time::Duration) -> Self {
        Self {
            succeeded: false,
            error: Some(error),
            elapsed,
            bytes: 0,
        }
    }
}

/// Aggregated result of a transfer.
///
/// Every walker task builds its own report and hands it to its parent, reports are only
/// combined (with `+`) after the child tasks producing them were joined.
#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    pub total_elapsed: std::time::Duration,
    pub files_transferred: usize,
    pub bytes_transferred: u64,
    pub directories_created: usize,
    pub directories_removed: usize,
    /// Failures in the order they were recorded by the task that saw them.
    pub failures: Vec<Error>,
}

impl TransferReport {
    pub fn record(&mut self, outcome: TransferOutcome) {
        if outcome.succeeded {
            self.files_transferred += 1;
            self.bytes_transferred += outcome.bytes;
        }
        if let Some(error) = outcome.error {
            self.failures.push(error);
        }
    }

    pub fn fail(&mut self, error: Error) {
        self.failures.push(error);
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn elapsed_millis(&self) -> f64 {
        self.total_elapsed.as_secs_f64() * 1000.0
    }
}

impl std::ops::Add for TransferReport {
    type Output = Self;
    fn add(mut self, other: Self) -> Self {
        self.failures.extend(other.failures);
        Self {
            // elapsed time is measured by whoever dispatched the whole transfer
            total_elapsed: std::cmp::max(self.total_elapsed, other.total_elapsed),
            files_transferred: self.files_transferred + other.files_transferred,
            bytes_transferred: self.bytes_transferred + other.bytes_transferred,
            directories_created: self.directories_created + other.directories_created,
            directories_removed: self.directories_removed + other.directories_removed,
            failures: self.failures,
        }
    }
}

impl std::fmt::Display for TransferReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "files transferred: {}\n\
            bytes transferred: {}\n\
            directories created: {}\n\
            directories removed: {}\n\
            failures: {}\n\
            elapsed: {:.3} ms",
            self.files_transferred,
            bytesize::ByteSize(self.bytes_transferred),
            self.directories_created,
            self.directories_removed,
            self.failures.len(),
            self.elapsed_millis(),
        )
    }
}
