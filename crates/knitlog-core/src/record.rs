//! Import record shapes shared by the extractors, the merge stage and the
//! persistence collaborator.
//!
//! ## Absence vs. empty
//! Every optional field uses `None` for "not determined". Extractors and the
//! merge stage never store an empty or whitespace-only string; use
//! [`non_empty`] when moving scraped text into a field.

use serde::{Deserialize, Serialize};

/// Which kind of external page is being imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Pattern,
    Yarn,
}

impl ImportKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ImportKind::Pattern => "pattern",
            ImportKind::Yarn => "yarn",
        }
    }
}

impl std::fmt::Display for ImportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an [`ExtractionCandidate`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Heuristic,
    Ai,
}

/// One ordered instruction step of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStep {
    pub step_number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Normalized result of one pattern or yarn import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub kind: ImportKind,
    pub source_url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yarn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gauge_stitches: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gauge_rows: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_grams: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_meters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_needles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colorway: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub steps: Vec<ImportStep>,
}

impl ImportRecord {
    /// A record with only the mandatory fields set.
    #[must_use]
    pub fn new(kind: ImportKind, source_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            source_url: source_url.into(),
            title: title.into(),
            description: None,
            notes: None,
            category: None,
            yarn: None,
            needles: None,
            gauge_stitches: None,
            gauge_rows: None,
            fiber_content: None,
            weight_grams: None,
            length_meters: None,
            recommended_needles: None,
            colorway: None,
            brand: None,
            image_urls: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Rewrites `step_number` so the steps read `1..=n` in their current order.
    pub fn renumber_steps(&mut self) {
        for (step, number) in self.steps.iter_mut().zip(1u32..) {
            step.step_number = number;
        }
    }
}

/// Fields extracted from one source before merging. Same shape as
/// [`ImportRecord`], but the title is optional too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionCandidate {
    pub source: CandidateSource,
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub yarn: Option<String>,
    pub needles: Option<String>,
    pub gauge_stitches: Option<u32>,
    pub gauge_rows: Option<u32>,
    pub fiber_content: Option<String>,
    pub weight_grams: Option<u32>,
    pub length_meters: Option<u32>,
    pub recommended_needles: Option<String>,
    pub colorway: Option<String>,
    pub brand: Option<String>,
    pub image_urls: Vec<String>,
    pub steps: Vec<ImportStep>,
}

impl ExtractionCandidate {
    #[must_use]
    pub fn empty(source: CandidateSource) -> Self {
        Self {
            source,
            title: None,
            description: None,
            notes: None,
            category: None,
            yarn: None,
            needles: None,
            gauge_stitches: None,
            gauge_rows: None,
            fiber_content: None,
            weight_grams: None,
            length_meters: None,
            recommended_needles: None,
            colorway: None,
            brand: None,
            image_urls: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Names of the fields holding a value, in record order. Used for trace
    /// events and logging.
    #[must_use]
    pub fn populated_fields(&self) -> Vec<&'static str> {
        let flags = [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("notes", self.notes.is_some()),
            ("category", self.category.is_some()),
            ("yarn", self.yarn.is_some()),
            ("needles", self.needles.is_some()),
            ("gauge_stitches", self.gauge_stitches.is_some()),
            ("gauge_rows", self.gauge_rows.is_some()),
            ("fiber_content", self.fiber_content.is_some()),
            ("weight_grams", self.weight_grams.is_some()),
            ("length_meters", self.length_meters.is_some()),
            ("recommended_needles", self.recommended_needles.is_some()),
            ("colorway", self.colorway.is_some()),
            ("brand", self.brand.is_some()),
            ("image_urls", !self.image_urls.is_empty()),
            ("steps", !self.steps.is_empty()),
        ];
        flags
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.populated_fields().is_empty()
    }

    /// Copies every field of `other` into `self` where `self` has none.
    /// Image URLs are appended without duplicates; steps are taken only when
    /// `self` has none.
    pub fn fill_missing_from(&mut self, other: ExtractionCandidate) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.title, other.title);
        fill(&mut self.description, other.description);
        fill(&mut self.notes, other.notes);
        fill(&mut self.category, other.category);
        fill(&mut self.yarn, other.yarn);
        fill(&mut self.needles, other.needles);
        fill(&mut self.gauge_stitches, other.gauge_stitches);
        fill(&mut self.gauge_rows, other.gauge_rows);
        fill(&mut self.fiber_content, other.fiber_content);
        fill(&mut self.weight_grams, other.weight_grams);
        fill(&mut self.length_meters, other.length_meters);
        fill(&mut self.recommended_needles, other.recommended_needles);
        fill(&mut self.colorway, other.colorway);
        fill(&mut self.brand, other.brand);

        for url in other.image_urls {
            if !self.image_urls.contains(&url) {
                self.image_urls.push(url);
            }
        }
        if self.steps.is_empty() {
            self.steps = other.steps;
        }
    }
}

/// Trims `value` and collapses internal whitespace runs to one space.
/// Returns `None` when nothing is left.
#[must_use]
pub fn non_empty(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
