//! Progress reporting across a research tree.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Snapshot of a running research tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResearchProgress {
    /// Remaining depth of the most recently reported branch
    pub current_depth: usize,
    pub total_depth: usize,
    pub current_breadth: usize,
    pub total_breadth: usize,
    pub current_query: Option<String>,

    /// Queries planned so far, across all levels
    pub total_queries: usize,
    pub completed_queries: usize,
}

/// Receives progress snapshots.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &ResearchProgress);
}

/// Logs progress with `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, progress: &ResearchProgress) {
        info!(
            depth = progress.current_depth,
            total_depth = progress.total_depth,
            breadth = progress.current_breadth,
            completed = progress.completed_queries,
            total = progress.total_queries,
            query = progress.current_query.as_deref().unwrap_or(""),
            "Research progress"
        );
    }
}

/// Shared progress for one root research call.
pub(crate) struct ProgressTracker {
    state: Mutex<ResearchProgress>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressTracker {
    pub(crate) fn new(breadth: usize, depth: usize, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            state: Mutex::new(ResearchProgress {
                current_depth: depth,
                total_depth: depth,
                current_breadth: breadth,
                total_breadth: breadth,
                ..ResearchProgress::default()
            }),
            sink,
        }
    }

    pub(crate) fn queries_planned(&self, count: usize, first_query: Option<&str>) {
        self.update(|p| {
            p.total_queries += count;
            if let Some(query) = first_query {
                p.current_query = Some(query.to_string());
            }
        });
    }

    /// A branch finished its own search and analysis.
    pub(crate) fn query_completed(&self, query: &str, depth: usize, breadth: usize) {
        self.update(|p| {
            p.completed_queries += 1;
            p.current_depth = depth;
            p.current_breadth = breadth;
            p.current_query = Some(query.to_string());
        });
    }

    fn update(&self, apply: impl FnOnce(&mut ResearchProgress)) {
        let snapshot = {
            let mut state = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            apply(&mut state);
            state.clone()
        };
        self.sink.report(&snapshot);
    }
}
