//! # Text Module
//!
//! Token counting and token-budget trimming for prompts sent to the model.
//!
//! - `tokenizer` - the [`TokenCounter`] capability and its implementations
//! - `splitter` - recursive separator-aware chunking
//! - `trim` - fixed-point trimming to a token budget

pub mod splitter;
pub mod tokenizer;
pub mod trim;

pub use splitter::RecursiveTextSplitter;
pub use tokenizer::{default_token_counter, ApproxTokenCounter, TokenCounter};
#[cfg(feature = "tokenizer-tiktoken")]
pub use tokenizer::TiktokenCounter;
pub use trim::{trim_to_budget, TextTrimmer, CHARS_PER_TOKEN, DEFAULT_CONTEXT_SIZE, MIN_CHUNK_SIZE};
