//! Regex-based HTML scanning primitives.
//!
//! Nothing here builds a DOM: tags are matched with tolerant patterns so that
//! truncated or malformed markup degrades to fewer matches, never an error.
//! All returned text is entity-decoded with whitespace collapsed unless a
//! function says otherwise.

use std::sync::LazyLock;

use regex::Regex;

use crate::text::normalize_whitespace;

/// Paragraphs shorter than this are navigation crumbs, prices or labels.
const MIN_PARAGRAPH_LEN: usize = 40;

static NOISE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg|template)\b[^>]*>.*?</(script|style|noscript|svg|template)\s*>")
        .expect("valid noise block regex")
});
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));
static BLOCK_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|dt|dd|section|article|ul|ol|table)\s*>")
        .expect("valid block break regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]{1,6}|[0-9]{1,7});").expect("valid entity regex"));
static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"));
static IMG_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid img regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(?:^|[\s<])([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute regex")
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("valid title regex"));
static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>").expect("valid h1 regex"));
static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").expect("valid paragraph regex"));
static LI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)</li\s*>").expect("valid li regex"));
static OL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<ol\b[^>]*>(.*?)</ol\s*>").expect("valid ol regex"));
static TR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").expect("valid tr regex"));
static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<t[hd]\b[^>]*>(.*?)</t[hd]\s*>").expect("valid cell regex")
});
static DT_DD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<dt\b[^>]*>(.*?)</dt\s*>\s*<dd\b[^>]*>(.*?)</dd\s*>")
        .expect("valid dt/dd regex")
});
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").expect("valid heading regex")
});
static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)").expect("valid body regex"));

/// Removes scripts, styles and comments, turns block boundaries into
/// newlines and drops every remaining tag. Lines are whitespace-collapsed;
/// blank lines are removed.
#[must_use]
pub fn html_to_text(fragment: &str) -> String {
    let without_noise = NOISE_BLOCK_RE.replace_all(fragment, " ");
    let without_comments = COMMENT_RE.replace_all(&without_noise, " ");
    let with_breaks = BLOCK_BREAK_RE.replace_all(&without_comments, "\n");
    let without_tags = TAG_RE.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&without_tags);

    decoded
        .lines()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-line clean text of an HTML fragment.
#[must_use]
pub fn clean_text(fragment: &str) -> String {
    normalize_whitespace(&html_to_text(fragment))
}

/// Readable text of the whole page body, one block per line.
#[must_use]
pub fn page_text(html: &str) -> String {
    let body = BODY_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map_or(html, |m| m.as_str());
    html_to_text(body)
}

/// Decodes the named entities common in product pages plus numeric
/// references. Unknown entities are left untouched.
#[must_use]
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }
    let numeric = NUMERIC_ENTITY_RE.replace_all(s, |caps: &regex::Captures<'_>| {
        let raw = &caps[1];
        let code = if let Some(hex) = raw.strip_prefix('x') {
            u32::from_str_radix(hex, 16).ok()
        } else {
            raw.parse::<u32>().ok()
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_owned(), |c| c.to_string())
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&frac12;", "1/2")
        .replace("&amp;", "&")
}

/// Value of attribute `attr` in a single tag, entity-decoded and trimmed.
/// Names match case-insensitively; unquoted values are not recognized.
#[must_use]
pub fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    let caps = ATTR_RE
        .captures_iter(tag)
        .find(|c| c.get(1).is_some_and(|name| name.as_str().eq_ignore_ascii_case(attr)))?;
    let raw = caps.get(2).or_else(|| caps.get(3))?.as_str();
    let value = decode_entities(raw.trim());
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// `content` of the first `<meta>` whose `key_attr` equals `key_value`
/// (case-insensitive), e.g. `find_meta_content(html, "property", "og:title")`.
#[must_use]
pub fn find_meta_content(html: &str, key_attr: &str, key_value: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        let key = extract_attr(tag, key_attr)?;
        if key.eq_ignore_ascii_case(key_value) {
            extract_attr(tag, "content").map(|c| normalize_whitespace(&c))
        } else {
            None
        }
    })
}

#[must_use]
pub fn document_title(html: &str) -> Option<String> {
    first_clean_capture(&TITLE_RE, html)
}

#[must_use]
pub fn first_h1(html: &str) -> Option<String> {
    first_clean_capture(&H1_RE, html)
}

fn first_clean_capture(re: &Regex, html: &str) -> Option<String> {
    re.captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())))
        .find(|t| !t.is_empty())
}

/// First `<p>` whose text is long enough to be prose.
#[must_use]
pub fn first_paragraph(html: &str) -> Option<String> {
    PARAGRAPH_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())))
        .find(|t| t.chars().count() >= MIN_PARAGRAPH_LEN)
}

#[must_use]
pub fn list_items(html: &str) -> Vec<String> {
    LI_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Items of the first `<ol>` in `html`.
#[must_use]
pub fn first_ordered_list(html: &str) -> Vec<String> {
    OL_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| list_items(m.as_str()))
        .unwrap_or_default()
}

/// `(label, value)` pairs from two-cell table rows and `<dt>/<dd>` pairs.
#[must_use]
pub fn labeled_pairs(html: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for row in TR_RE.captures_iter(html) {
        let Some(inner) = row.get(1) else {
            continue;
        };
        let cells: Vec<String> = CELL_RE
            .captures_iter(inner.as_str())
            .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())))
            .collect();
        if let [label, value, ..] = cells.as_slice() {
            if !label.is_empty() && !value.is_empty() {
                pairs.push((label.trim_end_matches(':').trim().to_owned(), value.clone()));
            }
        }
    }

    for cap in DT_DD_RE.captures_iter(html) {
        let label = cap.get(1).map(|m| clean_text(m.as_str())).unwrap_or_default();
        let value = cap.get(2).map(|m| clean_text(m.as_str())).unwrap_or_default();
        if !label.is_empty() && !value.is_empty() {
            pairs.push((label.trim_end_matches(':').trim().to_owned(), value));
        }
    }

    pairs
}

/// Splits `"Label: value"` at the first colon. The label must be short and
/// both halves non-empty.
#[must_use]
pub fn split_label_value(line: &str) -> Option<(String, String)> {
    let (label, value) = line.split_once(':')?;
    let label = label.trim();
    let value = value.trim();
    if label.is_empty() || value.is_empty() || label.chars().count() > 40 {
        return None;
    }
    Some((label.to_owned(), value.to_owned()))
}

/// `src` (or lazy-load `data-src`) of every `<img>`, in document order.
#[must_use]
pub fn image_sources(html: &str) -> Vec<String> {
    IMG_TAG_RE
        .find_iter(html)
        .filter_map(|m| {
            let tag = m.as_str();
            extract_attr(tag, "data-src").or_else(|| extract_attr(tag, "src"))
        })
        .collect()
}

/// The HTML following the first heading whose text contains one of
/// `keywords` (case-insensitive), up to the next heading of the same or a
/// higher level.
#[must_use]
pub fn section_after_heading<'a>(html: &'a str, keywords: &[&str]) -> Option<&'a str> {
    let headings: Vec<(usize, usize, u8, String)> = HEADING_RE
        .captures_iter(html)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let level = c.get(1)?.as_str().parse::<u8>().ok()?;
            let text = clean_text(c.get(2)?.as_str()).to_lowercase();
            Some((whole.start(), whole.end(), level, text))
        })
        .collect();

    let (idx, (_, start, level, _)) = headings
        .iter()
        .enumerate()
        .find(|(_, (_, _, _, text))| keywords.iter().any(|k| text.contains(k)))?;

    let end = headings[idx + 1..]
        .iter()
        .find(|(_, _, next_level, _)| next_level <= level)
        .map_or(html.len(), |(next_start, _, _, _)| *next_start);

    Some(&html[*start..end])
}

/// Splits `html` at headings of exactly `level`, returning
/// `(heading text, following html)` for each.
#[must_use]
pub fn subsections(html: &str, level: u8) -> Vec<(String, &str)> {
    let marks: Vec<(usize, usize, String)> = HEADING_RE
        .captures_iter(html)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let this_level = c.get(1)?.as_str().parse::<u8>().ok()?;
            if this_level != level {
                return None;
            }
            Some((whole.start(), whole.end(), clean_text(c.get(2)?.as_str())))
        })
        .collect();

    marks
        .iter()
        .enumerate()
        .map(|(i, (_, end, title))| {
            let next = marks.get(i + 1).map_or(html.len(), |(s, _, _)| *s);
            (title.clone(), &html[*end..next])
        })
        .collect()
}

#[cfg(test)]
#[path = "html_test.rs"]
mod tests;
