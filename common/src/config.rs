//! Configuration types for runtime, throttling and output settings

/// Runtime configuration for tokio and thread pools
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = number of CPU cores)
    pub max_workers: usize,
    /// Number of blocking threads (0 = tokio default of 512)
    pub max_blocking_threads: usize,
}

/// Throttling configuration for resource control
#[derive(Debug, Clone, Copy, Default)]
pub struct ThrottleConfig {
    /// Maximum number of open files (None = 80% of system limit, 0 = no limit)
    pub max_open_files: Option<usize>,
    /// Maximum number of directories walked at once (0 = available parallelism)
    pub max_active_dirs: usize,
}

impl ThrottleConfig {
    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<(), String> {
        if self.max_active_dirs > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(format!(
                "max_active_dirs must not exceed {}",
                tokio::sync::Semaphore::MAX_PERMITS
            ));
        }
        if let Some(max_open_files) = self.max_open_files
            && max_open_files > tokio::sync::Semaphore::MAX_PERMITS
        {
            return Err(format!(
                "max_open_files must not exceed {}",
                tokio::sync::Semaphore::MAX_PERMITS
            ));
        }
        Ok(())
    }
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
}

impl OutputConfig {
    /// Default filter directive matching the verbosity level.
    #[must_use]
    pub fn level(&self) -> &'static str {
        if self.quiet {
            return "off";
        }
        match self.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
