//! # Concurrency Limiter
//!
//! Runs a batch of futures with at most `N` of them in flight. Futures are
//! started in input order as slots free up, all of them are polled from the
//! calling task (no spawning), and results come back in input order no matter
//! which future finishes first.
//!
//! A future's failure is just its own output value; it does not cancel or
//! delay its siblings.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Default number of branches in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimiter {
    max_in_flight: usize,
}

impl ConcurrencyLimiter {
    /// A limit of zero is raised to one.
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Drive every task to completion, at most `max_in_flight` at a time.
    ///
    /// Tasks are pulled from the iterator lazily, so a task built by a
    /// closure in `tasks.into_iter().map(..)` is not even constructed until a
    /// slot is free.
    pub async fn run_all<I, F, T>(&self, tasks: I) -> Vec<T>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = T>,
    {
        stream::iter(tasks)
            .buffered(self.max_in_flight)
            .collect()
            .await
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}
