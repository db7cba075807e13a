//! Small string helpers shared by the extractors, the merge stage and the
//! trace recorder.

/// Collapses every whitespace run to a single space and trims both ends.
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`normalize_whitespace`] per line. Blank lines are dropped and the
/// remaining line breaks kept; `None` when nothing is left.
#[must_use]
pub fn tidy_lines(s: &str) -> Option<String> {
    let lines: Vec<String> = s
        .lines()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Returns the first `max_chars` characters of `s` and whether anything was
/// cut. Never splits a UTF-8 code point.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> (&str, bool) {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&s[..byte_idx], true),
        None => (s, false),
    }
}
