//! Branch execution: query → search → analyze → (maybe) recurse.
//!
//! Every error inside a branch is caught here and turned into an empty
//! [`BranchResult`]. Nothing is retried and siblings are never affected.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ResearchError, Result};
use crate::tools::{SearchHit, SearchOptions};

use super::orchestrator::{next_breadth, DeepResearch};
use super::progress::ProgressTracker;
use super::state::{Analysis, BranchResult, CandidateQuery, ResearchState};

impl DeepResearch {
    pub(crate) async fn run_branch(
        &self,
        candidate: &CandidateQuery,
        state: &ResearchState,
        progress: &ProgressTracker,
    ) -> BranchResult {
        match self.explore(candidate, state, progress).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_timeout() {
                    warn!(query = %candidate.query, error = %e, "Research branch timed out");
                } else {
                    warn!(query = %candidate.query, error = %e, "Research branch failed");
                }
                BranchResult::failed()
            }
        }
    }

    async fn explore(
        &self,
        candidate: &CandidateQuery,
        state: &ResearchState,
        progress: &ProgressTracker,
    ) -> Result<BranchResult> {
        let hits = self.search_pages(&candidate.query).await?;

        let new_urls: Vec<String> = hits
            .iter()
            .filter_map(SearchHit::url)
            .map(str::to_string)
            .collect();
        let contents: Vec<String> = hits
            .iter()
            .filter_map(SearchHit::content)
            .map(|content| self.trimmer.trim_to(content, self.settings.page_token_budget))
            .collect();

        let new_breadth = next_breadth(state.breadth);
        let new_depth = state.depth.saturating_sub(1);

        let Analysis {
            learnings: new_learnings,
            follow_up_questions,
        } = self
            .analyze_pages(&candidate.query, &contents, new_breadth)
            .await?;

        info!(
            query = %candidate.query,
            pages = contents.len(),
            learnings = new_learnings.len(),
            follow_ups = follow_up_questions.len(),
            "Analyzed search results"
        );

        let mut learnings = state.learnings.clone();
        learnings.extend(new_learnings);
        let mut visited_urls = state.visited_urls.clone();
        visited_urls.extend(new_urls);

        progress.query_completed(&candidate.query, new_depth, new_breadth);

        if new_depth == 0 {
            return Ok(BranchResult::new(learnings, visited_urls));
        }

        debug!(breadth = new_breadth, depth = new_depth, "Researching deeper");

        let next = ResearchState {
            query: follow_up_query(&candidate.research_goal, &follow_up_questions),
            breadth: new_breadth,
            depth: new_depth,
            learnings,
            visited_urls,
        };
        let result = self.research_level(next, progress).await?;

        Ok(result.into())
    }

    async fn search_pages(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.wait_for_search_slot().await;

        let options = SearchOptions {
            limit: self.settings.search_results,
            timeout: self.settings.search_timeout,
            markdown: true,
        };
        let hits = with_deadline(
            "search",
            self.settings.search_timeout,
            self.search.search(query, &options),
        )
        .await??;

        Ok(hits.into_iter().take(options.limit).collect())
    }

    /// Space search starts at least `rate_limit_delay` apart across the whole
    /// tree. The first search also waits one delay.
    async fn wait_for_search_slot(&self) {
        let delay = self.settings.rate_limit_delay;
        if delay.is_zero() {
            return;
        }

        let mut last = self.search_gate.lock().await;
        let ready = match *last {
            Some(released) => released + delay,
            None => Instant::now() + delay,
        };
        tokio::time::sleep_until(ready).await;
        *last = Some(Instant::now());
    }

    async fn analyze_pages(
        &self,
        query: &str,
        contents: &[String],
        max_follow_ups: usize,
    ) -> Result<Analysis> {
        let max_learnings = self.settings.learnings_per_query;
        let mut analysis = with_deadline(
            "result analysis",
            self.settings.analysis_timeout,
            self.model
                .analyze_results(query, contents, max_learnings, max_follow_ups),
        )
        .await??;

        analysis.learnings.truncate(max_learnings);
        analysis.follow_up_questions.truncate(max_follow_ups);
        Ok(analysis)
    }
}

/// The next level's topic: the research goal followed by one follow-up
/// question per line.
pub fn follow_up_query(research_goal: &str, follow_up_questions: &[String]) -> String {
    let directions: String = follow_up_questions
        .iter()
        .map(|q| format!("\n{q}"))
        .collect();

    format!(
        "Previous research goal: {research_goal}\nFollow-up research directions: {directions}"
    )
    .trim()
    .to_string()
}

async fn with_deadline<F: Future>(
    operation: &'static str,
    after: Duration,
    future: F,
) -> Result<F::Output> {
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| ResearchError::Timeout { operation, after })
}
