//! # Error Types
//!
//! Typed errors for the research engine and its external collaborators.
//!
//! Three kinds of failure can happen inside a branch: a collaborator call
//! exceeding its deadline, a transport/provider failure, and output that does
//! not match the expected shape. All of them are caught at the branch boundary
//! (see [`crate::research::branch`]); only the root planning call surfaces an
//! error to the caller.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by a [`crate::tools::SearchProvider`].
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search request timed out")]
    Timeout,

    #[error("Rate limited by search provider")]
    RateLimited,

    #[error("Unauthorized - check FIRECRAWL_KEY")]
    Unauthorized,

    #[error("HTTP error ({0}): {1}")]
    Http(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse search response: {0}")]
    Parse(String),
}

impl SearchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SearchError::Timeout)
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else if e.is_decode() {
            SearchError::Parse(e.to_string())
        } else {
            SearchError::Network(e.to_string())
        }
    }
}

/// Top-level error for research operations.
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Malformed {operation} output: {reason}")]
    MalformedOutput {
        operation: &'static str,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResearchError {
    /// True for deadline failures, including a search provider timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            ResearchError::Timeout { .. } => true,
            ResearchError::Search(e) => e.is_timeout(),
            _ => false,
        }
    }

    pub fn malformed(operation: &'static str, reason: impl Into<String>) -> Self {
        ResearchError::MalformedOutput {
            operation,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResearchError>;
