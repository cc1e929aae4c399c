//! Context-window budgeting for the constrained backend.
//!
//! ## Algorithm
//! 1. Count the prompt's tokens and compute `window - prompt - reserve`
//! 2. If nothing is left, shrink the prompt to `max(min_chars, ratio * len)`
//!    chars and recompute with the smaller retry reserve
//! 3. If still nothing is left, the prompt cannot be served

use crate::config::GenerationConfig;

/// Tokens available for the completion.
///
/// An unknown prompt size (token counting failed) allows the configured
/// maximum. Zero or negative means the prompt does not fit.
pub fn token_budget(prompt_tokens: Option<u32>, reserve: u32, config: &GenerationConfig) -> i64 {
    match prompt_tokens {
        None => config.max_tokens as i64,
        Some(count) => {
            let available = config.context_window as i64 - count as i64 - reserve as i64;
            if available <= 0 {
                0
            } else {
                available.min(config.max_tokens as i64)
            }
        }
    }
}

/// Shrink a prompt to `max(min_shrink_chars, shrink_ratio * len)` chars.
///
/// Keeps the leading part and marks the cut with `...`.
pub fn shrink_prompt(prompt: &str, config: &GenerationConfig) -> String {
    let len = prompt.chars().count();
    let target = config
        .min_shrink_chars
        .max((len as f32 * config.shrink_ratio) as usize);
    if len <= target {
        return prompt.to_string();
    }
    let keep = target.saturating_sub(3);
    let mut out: String = prompt.chars().take(keep).collect();
    out.push_str("...");
    out
}
