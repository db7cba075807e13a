//! Rule-based field extraction from raw HTML.
//!
//! A [`RuleRegistry`] holds the retailer-specific [`SiteRule`]s in priority
//! order. Every matching rule contributes a partial candidate; JSON-LD and
//! the generic fallback then fill whatever is still empty. Each field is
//! independent, so a miss on one never blocks another, and malformed markup
//! only ever means fewer fields.

mod generic;
mod jsonld;
mod labels;
pub mod rules;

use knitlog_core::{CandidateSource, ExtractionCandidate, ImportKind};

use crate::fetch::{absolutize_url, page_host};

/// Upper bound on images kept from one page. Product galleries repeat the
/// same picture in several sizes.
const MAX_IMAGES: usize = 24;

/// The page being extracted, as seen by a [`SiteRule`].
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub html: &'a str,
    pub url: &'a str,
    /// Lowercased host without a leading `www.`.
    pub host: &'a str,
    pub kind: ImportKind,
}

/// One retailer's markup knowledge.
///
/// `extract` must not panic; a rule that recognizes nothing returns an
/// empty candidate.
pub trait SiteRule: Send + Sync {
    /// Short identifier used in logs and trace events.
    fn name(&self) -> &'static str;

    fn matches(&self, host: &str, html: &str) -> bool;

    fn extract(&self, page: &PageContext<'_>) -> ExtractionCandidate;
}

/// Result of [`RuleRegistry::extract`].
#[derive(Debug, Clone)]
pub struct HeuristicExtraction {
    pub candidate: ExtractionCandidate,
    /// Names of the rules that matched the page, in registry order.
    pub matched_rules: Vec<&'static str>,
}

/// Ordered set of [`SiteRule`]s.
pub struct RuleRegistry {
    rules: Vec<Box<dyn SiteRule>>,
}

impl RuleRegistry {
    /// An empty registry: only JSON-LD and the generic fallback run.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Registry with every built-in retailer rule.
    #[must_use]
    pub fn with_default_rules() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(rules::GarnstudioRule));
        registry.register(Box::new(rules::RavelryRule));
        registry.register(Box::new(rules::ShopifyRule));
        registry
    }

    /// Appends `rule` after the rules already registered.
    pub fn register(&mut self, rule: Box<dyn SiteRule>) {
        self.rules.push(rule);
    }

    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Extracts a heuristic candidate from `html` fetched at `page_url`.
    ///
    /// Image URLs come back absolute and de-duplicated; steps are numbered
    /// `1..=n`.
    #[must_use]
    pub fn extract(&self, html: &str, page_url: &str, kind: ImportKind) -> HeuristicExtraction {
        let host = page_host(page_url).unwrap_or_default();
        let page = PageContext {
            html,
            url: page_url,
            host: &host,
            kind,
        };

        let mut candidate = ExtractionCandidate::empty(CandidateSource::Heuristic);
        let mut matched_rules = Vec::new();

        for rule in &self.rules {
            if !rule.matches(&host, html) {
                continue;
            }
            let partial = rule.extract(&page);
            tracing::debug!(
                rule = rule.name(),
                fields = ?partial.populated_fields(),
                "site rule matched"
            );
            matched_rules.push(rule.name());
            candidate.fill_missing_from(partial);
        }

        candidate.fill_missing_from(jsonld::extract_jsonld(html));
        candidate.fill_missing_from(generic::extract_generic(&page));
        finalize(&mut candidate, page_url);

        HeuristicExtraction {
            candidate,
            matched_rules,
        }
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// Convenience wrapper over [`RuleRegistry::with_default_rules`].
#[must_use]
pub fn extract_heuristic(html: &str, page_url: &str, kind: ImportKind) -> ExtractionCandidate {
    RuleRegistry::with_default_rules()
        .extract(html, page_url, kind)
        .candidate
}

fn finalize(candidate: &mut ExtractionCandidate, page_url: &str) {
    let mut images: Vec<String> = Vec::new();
    for raw in &candidate.image_urls {
        let Some(absolute) = absolutize_url(page_url, raw) else {
            continue;
        };
        if !absolute.starts_with("http") {
            continue;
        }
        if !images.contains(&absolute) {
            images.push(absolute);
        }
        if images.len() == MAX_IMAGES {
            break;
        }
    }
    candidate.image_urls = images;

    for (step, number) in candidate.steps.iter_mut().zip(1u32..) {
        step.step_number = number;
    }
}

#[cfg(test)]
#[path = "heuristic_test.rs"]
mod tests;
