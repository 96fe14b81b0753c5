//! Local token estimation and truncation.
//!
//! Used wherever Strata must enforce a cap itself instead of trusting the
//! content service's output size.

/// Approximate characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate tokens as `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Truncate `text` so that [`estimate_tokens`] of the result is at most
/// `max_tokens`, preferring to cut at a word boundary.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    truncate_with(text, max_tokens, estimate_tokens)
}

/// Truncate `text` until `count` reports at most `max_tokens`.
///
/// Starts from the character estimate and shrinks by a tenth while the
/// counter still disagrees, so a tokenizer that counts more densely than
/// four characters per token is honoured too.
pub fn truncate_with<F>(text: &str, max_tokens: usize, count: F) -> String
where
    F: Fn(&str) -> usize,
{
    if count(text) <= max_tokens {
        return text.to_string();
    }
    let mut max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    loop {
        let candidate = cut_at_word(text, max_chars);
        if candidate.is_empty() || count(&candidate) <= max_tokens {
            return candidate;
        }
        max_chars = max_chars.saturating_sub((max_chars / 10).max(1));
    }
}

/// Take at most `max_chars` characters, backing up to the last whitespace
/// if one falls in the final fifth.
fn cut_at_word(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    if head.chars().count() < max_chars {
        return head.trim_end().to_string();
    }
    let floor = max_chars - max_chars / 5;
    match head.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        Some((idx, _)) if head[..idx].chars().count() >= floor => head[..idx].trim_end().to_string(),
        _ => head.trim_end().to_string(),
    }
}
