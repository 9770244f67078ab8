//! Structured output parsing.
//!
//! Models wrap JSON in prose or code fences often enough that the outermost
//! `{ ... }` span is located first and only that is deserialized.

use serde::de::DeserializeOwned;

use crate::error::{ResearchError, Result};

pub fn parse_json_response<T: DeserializeOwned>(operation: &'static str, text: &str) -> Result<T> {
    let json = extract_json_object(text)
        .ok_or_else(|| ResearchError::malformed(operation, "no JSON object in response"))?;

    serde_json::from_str(json).map_err(|e| ResearchError::malformed(operation, e.to_string()))
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
