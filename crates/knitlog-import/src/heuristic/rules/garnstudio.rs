//! DROPS Design (`garnstudio.com`) yarn and pattern pages.
//!
//! DROPS prints its facts as plain text lines: `Weight/length: 50 g = approx
//! 75 meters` on yarn pages, and upper-case section labels (`YARN:`,
//! `NEEDLES:`, `BODY:`) with the value on the following lines on pattern
//! pages.

use knitlog_core::{non_empty, CandidateSource, ExtractionCandidate, ImportKind, ImportStep};

use super::host_is;
use crate::heuristic::labels::apply_label;
use crate::heuristic::{PageContext, SiteRule};
use crate::html::{first_h1, page_text, split_label_value};

const BRAND: &str = "DROPS";
const MAX_HEADING_LEN: usize = 40;

/// Upper-case headings that belong to the materials block or page chrome,
/// never to the knitting instructions.
const NON_STEP_HEADINGS: [&str; 10] = [
    "SIZE",
    "SIZES",
    "MATERIALS",
    "YARN",
    "NEEDLES",
    "KNITTING TENSION",
    "GAUGE",
    "PATTERN",
    "ABBREVIATIONS",
    "ACCESSORIES",
];

pub struct GarnstudioRule;

impl SiteRule for GarnstudioRule {
    fn name(&self) -> &'static str {
        "garnstudio"
    }

    fn matches(&self, host: &str, _html: &str) -> bool {
        host_is(host, "garnstudio.com")
    }

    fn extract(&self, page: &PageContext<'_>) -> ExtractionCandidate {
        let mut c = ExtractionCandidate::empty(CandidateSource::Heuristic);
        c.title = first_h1(page.html);
        if page.kind == ImportKind::Yarn {
            c.brand = Some(BRAND.to_owned());
        }

        let text = page_text(page.html);
        let lines: Vec<&str> = text.lines().collect();

        for (idx, line) in lines.iter().enumerate() {
            if let Some((label, value)) = split_label_value(line) {
                apply_label(&mut c, page.kind, &label, &value);
            } else if let Some(label) = section_label(line) {
                if let Some(next) = lines.get(idx + 1) {
                    if section_label(next).is_none() {
                        apply_label(&mut c, page.kind, label, next);
                    }
                }
            }
        }

        if page.kind == ImportKind::Pattern {
            c.steps = pattern_steps(&lines);
        }

        c
    }
}

/// `"NEEDLES:"` -> `Some("NEEDLES")`. Only short, all-caps lines count.
fn section_label(line: &str) -> Option<&str> {
    let label = line.trim().strip_suffix(':').unwrap_or(line.trim()).trim();
    let has_letters = label.chars().filter(|c| c.is_alphabetic()).count() >= 3;
    let all_caps = label
        .chars()
        .filter(|c| c.is_alphabetic())
        .all(char::is_uppercase);
    (has_letters && all_caps && label.chars().count() <= MAX_HEADING_LEN).then_some(label)
}

/// One step per instruction heading, with the text up to the next heading
/// as its description.
fn pattern_steps(lines: &[&str]) -> Vec<ImportStep> {
    let mut steps: Vec<ImportStep> = Vec::new();
    let mut in_step = false;

    for line in lines {
        if let Some(label) = section_label(line) {
            in_step = !NON_STEP_HEADINGS.iter().any(|h| label.eq_ignore_ascii_case(h));
            if in_step {
                let step_number = u32::try_from(steps.len() + 1).unwrap_or(u32::MAX);
                steps.push(ImportStep {
                    step_number,
                    title: label.to_owned(),
                    description: None,
                });
            }
            continue;
        }
        if !in_step {
            continue;
        }
        if let Some(step) = steps.last_mut() {
            let joined = match step.description.take() {
                Some(existing) => format!("{existing} {line}"),
                None => (*line).to_owned(),
            };
            step.description = non_empty(&joined);
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(html: &str, kind: ImportKind) -> ExtractionCandidate {
        GarnstudioRule.extract(&PageContext {
            html,
            url: "https://www.garnstudio.com/yarn.php?show=drops-nepal",
            host: "garnstudio.com",
            kind,
        })
    }

    #[test]
    fn yarn_page_facts() {
        let html = "<body><h1>DROPS Nepal</h1><ul>
            <li>Yarn group: C (16 - 19 stitches) / Aran</li>
            <li>Weight/length: 50 g = approx 75 meters</li>
            <li>Recommended needle size: \u{fffd}5 mm</li>
            <li>Knitting tension: 10 x 10 cm = 17 sts x 22 rows</li>
            <li>Blend: 65% Wool, 35% Alpaca</li></ul></body>";
        let c = ctx(html, ImportKind::Yarn);
        assert_eq!(c.title.as_deref(), Some("DROPS Nepal"));
        assert_eq!(c.brand.as_deref(), Some("DROPS"));
        assert_eq!(c.category.as_deref(), Some("C (16 - 19 stitches) / Aran"));
        assert_eq!(c.weight_grams, Some(50));
        assert_eq!(c.length_meters, Some(75));
        assert_eq!(c.recommended_needles.as_deref(), Some("5mm"));
        assert_eq!((c.gauge_stitches, c.gauge_rows), (Some(17), Some(22)));
        assert_eq!(c.fiber_content.as_deref(), Some("65% Wool, 35% Alpaca"));
    }

    #[test]
    fn pattern_page_sections_and_steps() {
        let html = "<body><h1>Winter Path</h1><div>
            <p>YARN:</p><p>DROPS KARISMA from Garnstudio</p>
            <p>NEEDLES:</p><p>DROPS circular needle size 4 mm</p>
            <p>BODY:</p><p>Cast on 200 stitches.</p><p>Work rib for 4 cm.</p>
            <p>SLEEVES:</p><p>Work in the round.</p></div></body>";
        let c = ctx(html, ImportKind::Pattern);
        assert_eq!(c.yarn.as_deref(), Some("DROPS KARISMA from Garnstudio"));
        assert_eq!(c.needles.as_deref(), Some("DROPS circular needle size 4 mm"));
        assert!(c.brand.is_none());
        assert_eq!(c.steps.len(), 2);
        assert_eq!(c.steps[0].title, "BODY");
        assert_eq!(
            c.steps[0].description.as_deref(),
            Some("Cast on 200 stitches. Work rib for 4 cm.")
        );
        assert_eq!(c.steps[1].step_number, 2);
    }

    #[test]
    fn matches_only_garnstudio_hosts() {
        assert!(GarnstudioRule.matches("garnstudio.com", ""));
        assert!(!GarnstudioRule.matches("ravelry.com", ""));
    }
}
