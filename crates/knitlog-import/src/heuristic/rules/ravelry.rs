//! Ravelry (`ravelry.com`) pattern and yarn database pages.

use std::sync::LazyLock;

use knitlog_core::{non_empty, CandidateSource, ExtractionCandidate};
use regex::Regex;

use super::host_is;
use crate::heuristic::labels::apply_label;
use crate::heuristic::{PageContext, SiteRule};
use crate::html::{clean_text, first_h1, html_to_text};
use crate::text::tidy_lines;

/// Label/value rows of the attribute panel.
static FIELD_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<div[^>]*class\s*=\s*["'][^"']*(?:core_item_content__label|field_label)[^"']*["'][^>]*>(.*?)</div>\s*<div[^>]*class\s*=\s*["'][^"']*(?:core_item_content__value|field_value)[^"']*["'][^>]*>(.*?)</div>"#,
    )
    .expect("valid ravelry field regex")
});
static BRAND_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a[^>]+href\s*=\s*["'][^"']*/yarns/brands/[^"']*["'][^>]*>(.*?)</a>"#)
        .expect("valid ravelry brand regex")
});
static NOTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div[^>]*class\s*=\s*["'][^"']*\bnotes\b[^"']*["'][^>]*>(.*?)</div>"#)
        .expect("valid ravelry notes regex")
});

pub struct RavelryRule;

impl SiteRule for RavelryRule {
    fn name(&self) -> &'static str {
        "ravelry"
    }

    fn matches(&self, host: &str, _html: &str) -> bool {
        host_is(host, "ravelry.com")
    }

    fn extract(&self, page: &PageContext<'_>) -> ExtractionCandidate {
        let mut c = ExtractionCandidate::empty(CandidateSource::Heuristic);
        c.title = first_h1(page.html);

        for cap in FIELD_ROW_RE.captures_iter(page.html) {
            let label = cap.get(1).map(|m| clean_text(m.as_str())).unwrap_or_default();
            let value = cap.get(2).map(|m| clean_text(m.as_str())).unwrap_or_default();
            apply_label(&mut c, page.kind, &label, &value);
        }

        c.brand = BRAND_LINK_RE
            .captures(page.html)
            .and_then(|cap| cap.get(1))
            .and_then(|m| non_empty(&clean_text(m.as_str())));

        c.description = NOTES_RE
            .captures(page.html)
            .and_then(|cap| cap.get(1))
            .and_then(|m| tidy_lines(&html_to_text(m.as_str())));

        c
    }
}
