//! Merging branch results.
//!
//! Learnings and URLs are flattened across branches and deduplicated by exact
//! string equality. The first occurrence wins, so output order follows branch
//! order and is reproducible between runs.

use std::collections::HashSet;

use super::state::{BranchResult, ResearchResult};

/// Flatten and deduplicate the results of one orchestrator invocation.
pub fn aggregate(results: Vec<BranchResult>) -> ResearchResult {
    let failed_branches = results.iter().map(|r| r.failed_branches).sum();
    let (learnings, visited_urls): (Vec<_>, Vec<_>) = results
        .into_iter()
        .map(|r| (r.learnings, r.visited_urls))
        .unzip();

    ResearchResult {
        learnings: unique(learnings.into_iter().flatten()),
        visited_urls: unique(visited_urls.into_iter().flatten()),
        failed_branches,
    }
}

/// Keep the first occurrence of every distinct string.
pub fn unique<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
