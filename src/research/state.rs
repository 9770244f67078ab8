//! State and result types for recursive research.

use serde::{Deserialize, Serialize};

/// A search query proposed by the planner, with the intent behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateQuery {
    pub query: String,

    /// What this query should establish and where to go next once it has
    #[serde(rename = "researchGoal", alias = "research_goal", default)]
    pub research_goal: String,
}

impl CandidateQuery {
    pub fn new(query: impl Into<String>, research_goal: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            research_goal: research_goal.into(),
        }
    }
}

/// Learnings and follow-up questions extracted from one query's pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default)]
    pub learnings: Vec<String>,

    #[serde(default, alias = "follow_up_questions")]
    pub follow_up_questions: Vec<String>,
}

/// Inputs to one orchestrator invocation.
///
/// Every branch fanned out from an invocation reads the same snapshot;
/// branches build their own extended copies and never write back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchState {
    pub query: String,
    pub breadth: usize,
    pub depth: usize,
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
}

impl ResearchState {
    pub fn new(query: impl Into<String>, breadth: usize, depth: usize) -> Self {
        Self {
            query: query.into(),
            breadth,
            depth,
            learnings: Vec::new(),
            visited_urls: Vec::new(),
        }
    }

    pub fn with_learnings(mut self, learnings: Vec<String>) -> Self {
        self.learnings = learnings;
        self
    }

    pub fn with_visited_urls(mut self, visited_urls: Vec<String>) -> Self {
        self.visited_urls = visited_urls;
        self
    }
}

/// Output of one branch. A failed branch yields empty lists and
/// `failed_branches == 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchResult {
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    pub failed_branches: usize,
}

impl BranchResult {
    pub fn new(learnings: Vec<String>, visited_urls: Vec<String>) -> Self {
        Self {
            learnings,
            visited_urls,
            failed_branches: 0,
        }
    }

    pub fn failed() -> Self {
        Self {
            failed_branches: 1,
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed_branches > 0 && self.learnings.is_empty() && self.visited_urls.is_empty()
    }
}

impl From<ResearchResult> for BranchResult {
    fn from(result: ResearchResult) -> Self {
        Self {
            learnings: result.learnings,
            visited_urls: result.visited_urls,
            failed_branches: result.failed_branches,
        }
    }
}

/// Deduplicated learnings and URLs for a whole research (sub)tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,

    /// Branches anywhere in the tree that degraded to an empty result
    #[serde(default)]
    pub failed_branches: usize,
}
