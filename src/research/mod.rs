//! # Research Module
//!
//! Recursive, breadth/depth-bounded research.
//!
//! ```text
//! research(topic, breadth, depth)
//!   1. plan ≤ breadth queries           (ResearchModel::plan_queries)
//!   2. per query, under the limiter:
//!        search → trim pages → analyze  (SearchProvider, ResearchModel)
//!        depth left? recurse with ceil(breadth/2), depth-1
//!   3. aggregate branch results          (exact-match dedup)
//! ```
//!
//! - `state` - query, branch and result types
//! - `settings` - timeouts, budgets and limits
//! - `orchestrator` - [`DeepResearch`], the engine entry point
//! - `branch` - isolated execution of one query
//! - `aggregate` - merging branch results
//! - `progress` - progress snapshots across the tree
//! - `report` - final report and answer synthesis

pub mod aggregate;
pub mod branch;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod settings;
pub mod state;

pub use aggregate::{aggregate, unique};
pub use branch::follow_up_query;
pub use orchestrator::{next_breadth, DeepResearch};
pub use progress::{ProgressSink, ResearchProgress, TracingProgress};
pub use report::{combine_feedback, format_learnings, sources_section};
pub use settings::ResearchSettings;
pub use state::{Analysis, BranchResult, CandidateQuery, ResearchResult, ResearchState};
