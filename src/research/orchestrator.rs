//! The research orchestrator.
//!
//! One invocation plans up to `breadth` queries for its topic, runs a branch
//! per query under the concurrency limiter, and aggregates what the branches
//! return. Branches recurse back into the orchestrator with half the breadth
//! (rounded up) and one less depth, so the tree is finite:
//!
//! ```text
//! research(q, 4, 2)
//!   ├─ branch q1 ── research(q1', 2, 1) ─┬─ branch ─ (depth 0, stop)
//!   │                                    └─ branch ─ (depth 0, stop)
//!   ├─ branch q2 ── research(q2', 2, 1) ── ...
//!   └─ ...
//! ```

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::agent::ResearchModel;
use crate::error::{ResearchError, Result};
use crate::limiter::ConcurrencyLimiter;
use crate::text::{default_token_counter, TextTrimmer, TokenCounter};
use crate::tools::SearchProvider;

use super::aggregate::aggregate;
use super::progress::{ProgressSink, ProgressTracker, TracingProgress};
use super::settings::ResearchSettings;
use super::state::{ResearchResult, ResearchState};

/// Recursive research engine.
///
/// # Example
/// ```ignore
/// let engine = DeepResearch::new(model, search, ResearchSettings::default());
/// let result = engine.research("State of WebAssembly GC", 4, 2).await?;
/// let report = engine
///     .synthesize_report("State of WebAssembly GC", &result.learnings, &result.visited_urls)
///     .await?;
/// ```
pub struct DeepResearch {
    pub(crate) model: Arc<dyn ResearchModel>,
    pub(crate) search: Arc<dyn SearchProvider>,
    pub(crate) trimmer: TextTrimmer,
    pub(crate) settings: ResearchSettings,
    progress: Arc<dyn ProgressSink>,

    /// When the last search was released, shared by every level of the tree
    pub(crate) search_gate: Mutex<Option<Instant>>,
}

impl DeepResearch {
    pub fn new(
        model: Arc<dyn ResearchModel>,
        search: Arc<dyn SearchProvider>,
        settings: ResearchSettings,
    ) -> Self {
        let trimmer =
            TextTrimmer::new(default_token_counter()).with_default_budget(settings.context_size);
        Self {
            model,
            search,
            trimmer,
            settings,
            progress: Arc::new(TracingProgress),
            search_gate: Mutex::new(None),
        }
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.trimmer = TextTrimmer::new(counter).with_default_budget(self.settings.context_size);
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn settings(&self) -> &ResearchSettings {
        &self.settings
    }

    /// Research `query` with the given breadth and depth, starting from no
    /// prior knowledge.
    pub async fn research(&self, query: &str, breadth: usize, depth: usize) -> Result<ResearchResult> {
        self.research_with(ResearchState::new(query, breadth, depth)).await
    }

    /// Research starting from an explicit snapshot of learnings and URLs.
    ///
    /// Only a failure of this root level's planning call is returned as an
    /// error; every branch failure degrades to an empty contribution.
    pub async fn research_with(&self, state: ResearchState) -> Result<ResearchResult> {
        if state.breadth == 0 {
            return Err(ResearchError::Config("breadth must be at least 1".to_string()));
        }

        info!(
            query = %state.query,
            breadth = state.breadth,
            depth = state.depth,
            search = %self.search.name(),
            "Starting research task"
        );

        let progress = ProgressTracker::new(state.breadth, state.depth, Arc::clone(&self.progress));
        let result = self.research_level(state, &progress).await?;

        info!(
            learnings = result.learnings.len(),
            urls = result.visited_urls.len(),
            failed_branches = result.failed_branches,
            "Research completed"
        );

        Ok(result)
    }

    /// One orchestrator invocation. Boxed because branches recurse into it.
    pub(crate) fn research_level<'a>(
        &'a self,
        state: ResearchState,
        progress: &'a ProgressTracker,
    ) -> BoxFuture<'a, Result<ResearchResult>> {
        async move {
            let mut queries = self
                .model
                .plan_queries(&state.query, &state.learnings, state.breadth)
                .await?;
            queries.truncate(state.breadth);

            debug!(
                count = queries.len(),
                breadth = state.breadth,
                depth = state.depth,
                "Planned search queries"
            );
            progress.queries_planned(queries.len(), queries.first().map(|q| q.query.as_str()));

            let limiter = ConcurrencyLimiter::new(self.settings.concurrency);
            let snapshot = &state;
            let results = limiter
                .run_all(queries.into_iter().map(move |candidate| async move {
                    self.run_branch(&candidate, snapshot, progress).await
                }))
                .await;

            Ok(aggregate(results))
        }
        .boxed()
    }
}

/// Breadth for the next level: half, rounded up, never below one.
pub fn next_breadth(breadth: usize) -> usize {
    breadth.div_ceil(2).max(1)
}
