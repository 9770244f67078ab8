//! # Deep Research
//!
//! Recursive, breadth/depth-bounded web research driven by a language model.
//!
//! A topic is expanded into search queries; each query is searched, its pages
//! trimmed to a token budget and distilled into learnings and follow-up
//! questions, which seed the next, narrower level. The learnings of the whole
//! tree are merged and synthesized into a report or a short answer.
//!
//! - `agent` - the [`ResearchModel`] seam and its Rig implementation
//! - `tools` - the [`SearchProvider`] seam and the Firecrawl client
//! - `research` - the recursive engine ([`DeepResearch`])
//! - `text` - token counting and budget trimming
//! - `limiter` - bounded, order-preserving fan-out
//! - `config` - environment configuration
//! - `error` - error types

pub mod agent;
pub mod config;
pub mod error;
pub mod limiter;
pub mod research;
pub mod text;
pub mod tools;

pub use agent::{ResearchAgent, ResearchModel};
pub use config::{Config, LlmProvider};
pub use error::{ResearchError, Result, SearchError};
pub use limiter::ConcurrencyLimiter;
pub use research::{DeepResearch, ResearchProgress, ResearchResult, ResearchSettings};
pub use text::{TextTrimmer, TokenCounter};
pub use tools::{FirecrawlSearch, SearchHit, SearchOptions, SearchProvider};
