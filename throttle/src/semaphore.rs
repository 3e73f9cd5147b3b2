use std::sync::atomic::{AtomicBool, Ordering};

pub struct Semaphore {
    flag: AtomicBool,
    sem: tokio::sync::Semaphore,
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl Semaphore {
    pub fn new() -> Self {
        let flag = AtomicBool::new(false);
        let sem = tokio::sync::Semaphore::const_new(tokio::sync::Semaphore::MAX_PERMITS);
        Self { flag, sem }
    }

    /// Limits the number of outstanding permits to `value`, 0 disables the limit.
    ///
    /// Meant to be called once at startup, before any permit is handed out.
    pub fn setup(&self, value: usize) {
        self.flag.store(value > 0, Ordering::Release);
        if value == 0 {
            return;
        }
        self.sem.forget_permits(self.sem.available_permits());
        self.sem.add_permits(value);
    }

    pub fn is_enabled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }

    pub async fn acquire(&self) -> Option<tokio::sync::SemaphorePermit<'_>> {
        if self.is_enabled() {
            // the semaphore is never closed so acquire can only fail if that changes
            self.sem.acquire().await.ok()
        } else {
            None
        }
    }
}
