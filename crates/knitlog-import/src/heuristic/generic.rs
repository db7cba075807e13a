//! Fallback extraction that works on any page.

use knitlog_core::{non_empty, CandidateSource, ExtractionCandidate, ImportKind, ImportStep};

use super::labels::apply_label;
use super::PageContext;
use crate::html::{
    clean_text, document_title, find_meta_content, first_h1, first_ordered_list, first_paragraph,
    html_to_text, image_sources, labeled_pairs, list_items, page_text, section_after_heading,
    split_label_value, subsections,
};
use crate::numeric::{parse_length_meters, parse_weight_grams};
use crate::text::tidy_lines;

const INSTRUCTION_HEADINGS: [&str; 6] = [
    "instruction",
    "directions",
    "how to",
    "anleitung",
    "vejledning",
    "pattern",
];
const NOTES_HEADINGS: [&str; 3] = ["notes", "note", "hinweis"];

/// Image paths that are never product photos.
const IMAGE_NOISE: [&str; 8] = [
    "logo", "icon", "sprite", "avatar", "pixel", "spinner", "placeholder", "badge",
];

/// Lines longer than this are prose, not a yarn spec line.
const MAX_SPEC_LINE_LEN: usize = 160;

pub(super) fn extract_generic(page: &PageContext<'_>) -> ExtractionCandidate {
    let html = page.html;
    let mut c = ExtractionCandidate::empty(CandidateSource::Heuristic);

    c.title = find_meta_content(html, "property", "og:title")
        .or_else(|| first_h1(html))
        .or_else(|| document_title(html))
        .and_then(|t| non_empty(&t));

    c.description = first_paragraph(html)
        .or_else(|| find_meta_content(html, "name", "description"))
        .or_else(|| find_meta_content(html, "property", "og:description"))
        .and_then(|d| tidy_lines(&d));

    c.image_urls = collect_images(html);

    for item in list_items(html) {
        if let Some((label, value)) = split_label_value(&item) {
            apply_label(&mut c, page.kind, &label, &value);
        }
    }
    for (label, value) in labeled_pairs(html) {
        apply_label(&mut c, page.kind, &label, &value);
    }

    match page.kind {
        ImportKind::Pattern => {
            c.steps = extract_steps(html);
            c.notes = section_after_heading(html, &NOTES_HEADINGS)
                .map(html_to_text)
                .and_then(|n| tidy_lines(&n));
        }
        ImportKind::Yarn => {
            if c.length_meters.is_none() || c.weight_grams.is_none() {
                scan_spec_lines(&mut c, html);
            }
        }
    }

    c
}

fn collect_images(html: &str) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    let og = find_meta_content(html, "property", "og:image");
    for src in og.into_iter().chain(image_sources(html)) {
        let lower = src.to_ascii_lowercase();
        if lower.ends_with(".svg") || lower.ends_with(".gif") {
            continue;
        }
        if IMAGE_NOISE.iter().any(|n| lower.contains(n)) {
            continue;
        }
        if !images.contains(&src) {
            images.push(src);
        }
    }
    images
}

/// Ordered-list items under an instructions heading; failing that, one step
/// per `<h3>` subsection of that block.
fn extract_steps(html: &str) -> Vec<ImportStep> {
    let Some(section) = section_after_heading(html, &INSTRUCTION_HEADINGS) else {
        return Vec::new();
    };

    let items = first_ordered_list(section);
    if !items.is_empty() {
        return items
            .into_iter()
            .zip(1u32..)
            .map(|(title, step_number)| ImportStep {
                step_number,
                title,
                description: None,
            })
            .collect();
    }

    subsections(section, 3)
        .into_iter()
        .filter_map(|(heading, body)| {
            let title = non_empty(&heading)?;
            Some((title, non_empty(&clean_text(body))))
        })
        .zip(1u32..)
        .map(|((title, description), step_number)| ImportStep {
            step_number,
            title,
            description,
        })
        .collect()
}

/// Yarn pages often state length and weight in running text
/// ("50 g / 175 m"). Takes the first short line carrying both.
fn scan_spec_lines(c: &mut ExtractionCandidate, html: &str) {
    let text = page_text(html);
    let hit = text
        .lines()
        .filter(|line| line.chars().count() <= MAX_SPEC_LINE_LEN)
        .find_map(|line| Some((parse_length_meters(line)?, parse_weight_grams(line)?)));
    if let Some((meters, grams)) = hit {
        c.length_meters.get_or_insert(meters);
        c.weight_grams.get_or_insert(grams);
    }
}
