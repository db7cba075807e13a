//! Parsing of free-form user input: `prefix:token` search terms and the
//! many shapes an image-URL list arrives in.
//!
//! Both functions are pure and never panic on odd input.

use serde::Deserialize;
use serde_json::Value;

use crate::text::normalize_whitespace;

/// Result of [`extract_search_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchToken {
    /// The unquoted token, or `None` when the prefix was not found.
    pub token: Option<String>,
    /// The input with the matched occurrence removed and whitespace
    /// collapsed. Equal to the original input when nothing matched.
    pub remainder: String,
}

/// Finds the first case-insensitive `prefix` that starts the input or
/// follows whitespace, and takes the token right after it.
///
/// The token may be double-quoted, single-quoted or end at the next
/// whitespace. An unterminated quote falls back to the whitespace rule.
/// Occurrences followed by nothing usable are skipped.
///
/// ```
/// use knitlog_import::tokens::extract_search_token;
///
/// let found = extract_search_token(r#"socks yarn:"Drops Fabel" toe-up"#, "yarn:");
/// assert_eq!(found.token.as_deref(), Some("Drops Fabel"));
/// assert_eq!(found.remainder, "socks toe-up");
/// ```
#[must_use]
pub fn extract_search_token(input: &str, prefix: &str) -> SearchToken {
    let not_found = || SearchToken {
        token: None,
        remainder: input.to_owned(),
    };

    if prefix.is_empty() {
        return not_found();
    }

    let mut prev: Option<char> = None;
    for (start, ch) in input.char_indices() {
        let at_boundary = prev.map_or(true, char::is_whitespace);
        prev = Some(ch);
        if !at_boundary {
            continue;
        }
        let Some(prefix_len) = prefix_len_ignore_case(&input[start..], prefix) else {
            continue;
        };
        let token_start = start + prefix_len;
        let Some((token, token_end)) = read_token(input, token_start) else {
            continue;
        };

        let remainder = normalize_whitespace(&format!(
            "{} {}",
            &input[..start],
            &input[token_end..]
        ));
        return SearchToken {
            token: Some(token),
            remainder,
        };
    }

    not_found()
}

/// Removes exactly one layer of matching `"` or `'` quotes wrapping `token`.
#[must_use]
pub fn strip_wrapping_quotes(token: &str) -> &str {
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return &token[1..token.len() - 1];
        }
    }
    token
}

/// Byte length of `prefix` as matched at the start of `haystack`, compared
/// case-insensitively char by char.
fn prefix_len_ignore_case(haystack: &str, prefix: &str) -> Option<usize> {
    let mut hay = haystack.char_indices();
    for p in prefix.chars() {
        let (_, h) = hay.next()?;
        if !h.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    Some(hay.next().map_or(haystack.len(), |(idx, _)| idx))
}

/// Reads the token beginning at byte `start`. Returns the unquoted token and
/// the byte offset just past the consumed text.
fn read_token(input: &str, start: usize) -> Option<(String, usize)> {
    let rest = &input[start..];
    let first = rest.chars().next()?;

    if first == '"' || first == '\'' {
        if let Some(close_rel) = rest[1..].find(first) {
            let inner = &rest[1..=close_rel];
            if inner.trim().is_empty() {
                return None;
            }
            return Some((inner.to_owned(), start + close_rel + 2));
        }
    }

    let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    let raw = &rest[..len];
    let token = strip_wrapping_quotes(raw);
    if token.is_empty() {
        return None;
    }
    Some((token.to_owned(), start + len))
}

/// The shapes an image-URL field can arrive in from a form or JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ImageUrlInput {
    One(String),
    Many(Vec<String>),
}

/// Normalizes user- or model-supplied image URLs into an ordered list.
///
/// Each string is first tried as JSON: a list contributes each element, a
/// scalar contributes itself, and anything unparseable is used as-is. A
/// single-string input is additionally split on commas. Only values starting
/// with `http`, `/media/` or `/` survive.
#[must_use]
pub fn parse_import_image_urls(raw: Option<&ImageUrlInput>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let (items, split_commas): (Vec<&str>, bool) = match raw {
        ImageUrlInput::One(s) => (vec![s.as_str()], true),
        ImageUrlInput::Many(list) => (list.iter().map(String::as_str).collect(), false),
    };

    let normalized = items.into_iter().flat_map(expand_json_item);

    let values: Vec<String> = if split_commas {
        normalized
            .flat_map(|v| {
                v.split(',')
                    .map(|part| part.trim().to_owned())
                    .collect::<Vec<_>>()
            })
            .collect()
    } else {
        normalized.collect()
    };

    values
        .into_iter()
        .filter(|v| is_accepted_image_url(v))
        .collect()
}

fn expand_json_item(item: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(item) {
        Ok(Value::Array(elements)) => elements
            .iter()
            .map(|e| stringify_json(e).trim().to_owned())
            .collect(),
        Ok(scalar) => vec![stringify_json(&scalar).trim().to_owned()],
        Err(_) => vec![item.trim().to_owned()],
    }
}

fn stringify_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_accepted_image_url(value: &str) -> bool {
    value.starts_with("http") || value.starts_with("/media/") || value.starts_with('/')
}

#[cfg(test)]
#[path = "tokens_test.rs"]
mod tests;
