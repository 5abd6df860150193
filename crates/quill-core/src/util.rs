//! Character-offset helpers.
//!
//! Positions handed to callers are counted in Unicode scalar values, not
//! bytes, so every slice of user content goes through these functions.

/// Characters of context kept on each side of an anchored span
pub const CONTEXT_RADIUS: usize = 50;

pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }

    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }

    if max <= 3 {
        return s.chars().take(max).collect();
    }

    let truncated: String = s.chars().take(max - 3).collect();
    format!("{}...", truncated)
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the `char_idx`-th character (or `s.len()` past the end)
fn byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Slice by character offsets. Out-of-range bounds are clamped.
pub fn slice_chars(s: &str, start: usize, end: usize) -> &str {
    let end = end.max(start);
    let from = byte_index(s, start);
    let to = byte_index(s, end);
    &s[from..to]
}

/// Character offset of the first occurrence of `needle` in `haystack`
pub fn find_char_offset(haystack: &str, needle: &str) -> Option<usize> {
    let byte_pos = haystack.find(needle)?;
    Some(haystack[..byte_pos].chars().count())
}

/// Text from `radius` characters before `start` to `radius` characters after `end`
pub fn context_window(content: &str, start: usize, end: usize, radius: usize) -> String {
    let from = start.saturating_sub(radius);
    let to = end.saturating_add(radius);
    slice_chars(content, from, to).to_string()
}

/// Rough token estimate (four characters per token, rounded up)
pub fn estimate_tokens(content: &str) -> usize {
    char_len(content).div_ceil(4)
}
