//! Scheduler for handing repositories to the worker pool
//!
//! This module handles:
//! - The queue of repositories still waiting to be walked
//! - Global concurrency limiting via a semaphore
//! - Cooperative cancellation shared by every worker

use crate::model::RepositoryId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Shared cancellation flag
///
/// Cloning is cheap; every clone observes the same flag. Workers check it
/// between walk steps and the scheduler checks it before handing out work.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A repository scheduled for walking with a semaphore permit
pub struct ScheduledRepository {
    /// The repository to walk
    pub repository: RepositoryId,

    /// The semaphore permit for this walk
    pub _permit: OwnedSemaphorePermit,
}

/// Scheduler manages the repository queue and the worker limit
///
/// The scheduler coordinates:
/// - Global concurrency limits (max repositories walked at once)
/// - FIFO selection from the queue
/// - Stopping early once cancellation is requested
pub struct Scheduler {
    /// Global semaphore for limiting concurrent walks
    semaphore: Arc<Semaphore>,

    /// Repositories not yet handed out
    queue: VecDeque<RepositoryId>,

    cancel: CancelSignal,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `max_concurrent` - Maximum number of repositories walked at once
    /// * `repositories` - Repositories to schedule, in order
    /// * `cancel` - Shared cancellation flag
    pub fn new(max_concurrent: usize, repositories: Vec<RepositoryId>, cancel: CancelSignal) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            queue: VecDeque::from(repositories),
            cancel,
        }
    }

    /// Gets the next repository to walk
    ///
    /// Waits until a worker slot is free. The permit travels with the returned
    /// repository and frees the slot when dropped.
    ///
    /// # Returns
    ///
    /// * `Some(ScheduledRepository)` - A repository ready to walk
    /// * `None` - The queue is empty or cancellation was requested
    pub async fn next_repository(&mut self) -> Option<ScheduledRepository> {
        if self.queue.is_empty() || self.cancel.is_cancelled() {
            return None;
        }

        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        // Cancellation may have arrived while waiting for a slot
        if self.cancel.is_cancelled() {
            return None;
        }

        let repository = self.queue.pop_front()?;
        tracing::trace!("Scheduling {}", repository);

        Some(ScheduledRepository {
            repository,
            _permit: permit,
        })
    }

    /// Returns the number of repositories still queued
    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of worker slots currently free
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Removes and returns every repository that was never handed out
    pub fn drain_remaining(&mut self) -> Vec<RepositoryId> {
        self.queue.drain(..).collect()
    }
}
