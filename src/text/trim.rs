//! Token-budget text trimming.
//!
//! Shrinks text until its token count fits a budget. Each round converts the
//! token overflow into a character target (3 characters per token), splits the
//! text on semantic boundaries at that target and keeps the first chunk. When
//! the splitter makes no progress the text is hard-cut to the target instead.
//! Every round strictly shortens the text, so the loop always terminates.

use std::sync::Arc;

use super::splitter::{char_len, char_prefix, RecursiveTextSplitter};
use super::tokenizer::TokenCounter;

/// Default token budget for prompts.
pub const DEFAULT_CONTEXT_SIZE: usize = 128_000;

/// Characters assumed per overflowing token when picking a chunk target.
pub const CHARS_PER_TOKEN: usize = 3;

/// Trimmed text is never shorter than this many characters.
pub const MIN_CHUNK_SIZE: usize = 140;

/// Trim `text` so that `counter` reports at most `token_budget` tokens.
///
/// Text already within budget is returned unchanged. Text shorter than
/// [`MIN_CHUNK_SIZE`] characters is never cut, and longer text is never cut
/// below that floor, even if the floor itself exceeds the budget.
pub fn trim_to_budget(text: &str, token_budget: usize, counter: &dyn TokenCounter) -> String {
    let mut current = text.to_string();

    loop {
        if current.is_empty() {
            return current;
        }

        let tokens = counter.count_tokens(&current);
        if tokens <= token_budget {
            return current;
        }

        let overflow = tokens - token_budget;
        let len = char_len(&current);
        let target = len.saturating_sub(overflow.saturating_mul(CHARS_PER_TOKEN));

        if target < MIN_CHUNK_SIZE {
            return char_prefix(&current, MIN_CHUNK_SIZE).to_string();
        }

        let first = RecursiveTextSplitter::new(target)
            .split_text(&current)
            .into_iter()
            .next()
            .unwrap_or_default();
        let first_len = char_len(&first);

        // No progress, or a leading fragment under the floor: hard-cut instead.
        current = if first_len >= len || first_len < MIN_CHUNK_SIZE {
            char_prefix(&current, target).to_string()
        } else {
            first
        };
    }
}

/// A token counter paired with a default budget.
#[derive(Clone)]
pub struct TextTrimmer {
    counter: Arc<dyn TokenCounter>,
    default_budget: usize,
}

impl TextTrimmer {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            counter,
            default_budget: DEFAULT_CONTEXT_SIZE,
        }
    }

    pub fn with_default_budget(mut self, budget: usize) -> Self {
        self.default_budget = budget;
        self
    }

    pub fn default_budget(&self) -> usize {
        self.default_budget
    }

    /// Trim to the default budget.
    pub fn trim(&self, text: &str) -> String {
        trim_to_budget(text, self.default_budget, self.counter.as_ref())
    }

    pub fn trim_to(&self, text: &str, token_budget: usize) -> String {
        trim_to_budget(text, token_budget, self.counter.as_ref())
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count_tokens(text)
    }
}

impl std::fmt::Debug for TextTrimmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextTrimmer")
            .field("default_budget", &self.default_budget)
            .finish_non_exhaustive()
    }
}
