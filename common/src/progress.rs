//! Tracking of fire-and-forget directory tasks
//!
//! Detached tasks are spawned and finish on arbitrary worker threads, so each thread bumps
//! its own slot and readers sum the slots.

#[derive(Debug, Default)]
struct ShardedCounter {
    slots: thread_local::ThreadLocal<std::sync::atomic::AtomicU64>,
}

impl ShardedCounter {
    fn inc(&self) {
        self.slots
            .get_or_default()
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    fn sum(&self) -> u64 {
        self.slots
            .iter()
            .map(|slot| slot.load(std::sync::atomic::Ordering::Relaxed))
            .sum()
    }
}

/// Counts tasks that were spawned and have not finished yet.
#[derive(Debug, Default)]
pub struct TaskCounter {
    spawned: ShardedCounter,
    finished: ShardedCounter,
}

/// Marks one task as running until dropped.
#[derive(Debug)]
pub struct TaskGuard<'a> {
    counter: &'a TaskCounter,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.counter.finished.inc();
    }
}

impl TaskCounter {
    /// Counts a task as spawned, take the guard before spawning and move it into the task.
    #[must_use]
    pub fn guard(&self) -> TaskGuard<'_> {
        self.spawned.inc();
        TaskGuard { counter: self }
    }

    /// Number of tasks whose guard is still alive.
    ///
    /// `finished` is read first: a task finishing between the two reads can only make the
    /// result larger, never report zero while something is still running.
    #[must_use]
    pub fn pending(&self) -> u64 {
        let finished = self.finished.sum();
        self.spawned.sum().saturating_sub(finished)
    }
}

/// Fire-and-forget directory tasks that were spawned and have not finished yet.
pub static DETACHED: std::sync::LazyLock<TaskCounter> =
    std::sync::LazyLock::new(TaskCounter::default);

#[must_use]
pub fn detached_pending() -> u64 {
    DETACHED.pending()
}
