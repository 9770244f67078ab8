//! Token counting capability used by the trimmer.
//!
//! The trimming algorithm only needs `count_tokens`; which tokenizer backs it
//! is a deployment choice. A BPE encoder is used when the
//! `tokenizer-tiktoken` feature is enabled, otherwise a character-ratio
//! approximation.

use std::sync::Arc;

#[cfg(feature = "tokenizer-tiktoken")]
use tracing::warn;

/// Default characters per token for the approximate counter.
pub const DEFAULT_CHARS_PER_TOKEN: f32 = 4.0;

pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Character-ratio token estimate, rounded up.
#[derive(Debug, Clone)]
pub struct ApproxTokenCounter {
    pub chars_per_token: f32,
}

impl ApproxTokenCounter {
    pub fn new(chars_per_token: f32) -> Self {
        Self { chars_per_token }
    }
}

impl Default for ApproxTokenCounter {
    fn default() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }
}

impl TokenCounter for ApproxTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        (text.chars().count() as f32 / self.chars_per_token).ceil() as usize
    }
}

#[cfg(feature = "tokenizer-tiktoken")]
pub struct TiktokenCounter {
    encoder: tiktoken_rs::CoreBPE,
}

#[cfg(feature = "tokenizer-tiktoken")]
impl TiktokenCounter {
    pub fn new(encoder: tiktoken_rs::CoreBPE) -> Self {
        Self { encoder }
    }

    pub fn cl100k_base() -> anyhow::Result<Self> {
        Ok(Self {
            encoder: tiktoken_rs::cl100k_base()?,
        })
    }
}

#[cfg(feature = "tokenizer-tiktoken")]
impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.encoder.encode_with_special_tokens(text).len()
    }
}

/// The most accurate counter available in this build.
pub fn default_token_counter() -> Arc<dyn TokenCounter> {
    #[cfg(feature = "tokenizer-tiktoken")]
    {
        match TiktokenCounter::cl100k_base() {
            Ok(counter) => return Arc::new(counter),
            Err(e) => warn!(error = %e, "BPE encoder unavailable, using approximate token counts"),
        }
    }

    Arc::new(ApproxTokenCounter::default())
}
