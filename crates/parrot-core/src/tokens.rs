//! Token-count estimation.
//!
//! The simulator reports usage without a tokenizer; the estimate is the
//! usual ~4-characters-per-token heuristic with a floor of one.

use crate::types::ChatMessage;

/// Estimate the token count of `text`.
pub fn estimate_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 1;
    }
    ((text.len() / 4) as u32).max(1)
}

/// Estimate the prompt tokens of a request: non-empty message contents
/// joined with single spaces.
pub fn estimate_prompt_tokens(messages: &[ChatMessage]) -> u32 {
    let joined = messages
        .iter()
        .map(ChatMessage::text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    estimate_tokens(&joined)
}
