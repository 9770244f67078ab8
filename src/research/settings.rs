//! Engine tunables.

use std::time::Duration;

use crate::limiter::DEFAULT_CONCURRENCY;
use crate::text::DEFAULT_CONTEXT_SIZE;
use crate::tools::{DEFAULT_RESULT_LIMIT, DEFAULT_SEARCH_TIMEOUT};

/// Minimum delay before every search request.
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_millis(1000);

/// Deadline for one result-analysis call.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(60);

/// Learnings requested per analyzed query.
pub const DEFAULT_LEARNINGS_PER_QUERY: usize = 3;

/// Token budget for each page sent to the analyzer.
pub const PAGE_TOKEN_BUDGET: usize = 25_000;

/// Token budget for the joined learnings sent to the report synthesizer.
pub const LEARNINGS_TOKEN_BUDGET: usize = 150_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchSettings {
    /// Branches in flight per orchestrator invocation
    pub concurrency: usize,

    pub rate_limit_delay: Duration,
    pub search_timeout: Duration,
    pub analysis_timeout: Duration,

    /// Pages requested per search
    pub search_results: usize,

    pub learnings_per_query: usize,
    pub page_token_budget: usize,
    pub learnings_token_budget: usize,

    /// Default trimming budget
    pub context_size: usize,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit_delay: DEFAULT_RATE_LIMIT_DELAY,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
            search_results: DEFAULT_RESULT_LIMIT,
            learnings_per_query: DEFAULT_LEARNINGS_PER_QUERY,
            page_token_budget: PAGE_TOKEN_BUDGET,
            learnings_token_budget: LEARNINGS_TOKEN_BUDGET,
            context_size: DEFAULT_CONTEXT_SIZE,
        }
    }
}

impl ResearchSettings {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    pub fn with_context_size(mut self, context_size: usize) -> Self {
        self.context_size = context_size;
        self
    }

    pub fn with_learnings_per_query(mut self, learnings: usize) -> Self {
        self.learnings_per_query = learnings;
        self
    }

    /// Token budget applied to each page before analysis.
    pub fn with_page_token_budget(mut self, budget: usize) -> Self {
        self.page_token_budget = budget;
        self
    }

    /// Token budget applied to the learnings block before synthesis.
    pub fn with_learnings_token_budget(mut self, budget: usize) -> Self {
        self.learnings_token_budget = budget;
        self
    }
}
