//! Merging of the heuristic and AI candidates into one [`ImportRecord`],
//! followed by redundancy reduction across description, notes and steps.
//!
//! ## Precedence
//! A non-empty AI value beats the heuristic value for every scalar field.
//! Steps come wholesale from the AI when it produced any. Image URLs are the
//! union of both, heuristic first, de-duplicated by exact match.
//!
//! ## Redundancy
//! `notes` is cut into chunks (lines, then sentences). A chunk is dropped
//! when its whitespace-normalized text is contained in the description or
//! in a step description, or repeats an earlier chunk. Matching is exact
//! after normalization; paraphrases survive.

use knitlog_core::{non_empty, ExtractionCandidate, ImportKind, ImportRecord, ImportStep};

use crate::text::{normalize_whitespace, tidy_lines};

/// Chunks with fewer non-space characters than this are never matched
/// against description or steps, only against each other.
const MIN_CHUNK_CHARS: usize = 3;

/// Result of [`merge_candidates`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub record: ImportRecord,
    /// How many notes chunks the redundancy pass removed.
    pub dropped_note_chunks: usize,
}

/// Combines `heuristic` and `ai` into the record persisted for `source_url`.
#[must_use]
pub fn merge_candidates(
    kind: ImportKind,
    source_url: &str,
    heuristic: &ExtractionCandidate,
    ai: Option<&ExtractionCandidate>,
) -> Merged {
    let title = pick_text(ai.and_then(|a| a.title.as_deref()), heuristic.title.as_deref())
        .unwrap_or_else(|| title_from_url(source_url, kind));

    let mut record = ImportRecord::new(kind, source_url, title);

    let multiline = |pick: fn(&ExtractionCandidate) -> Option<&str>| {
        ai.and_then(pick)
            .and_then(tidy_lines)
            .or_else(|| pick(heuristic).and_then(tidy_lines))
    };
    record.description = multiline(|c| c.description.as_deref());
    record.notes = multiline(|c| c.notes.as_deref());

    let text = |pick: fn(&ExtractionCandidate) -> Option<&str>| {
        pick_text(ai.and_then(pick), pick(heuristic))
    };
    record.category = text(|c| c.category.as_deref());
    record.yarn = text(|c| c.yarn.as_deref());
    record.needles = text(|c| c.needles.as_deref());
    record.fiber_content = text(|c| c.fiber_content.as_deref());
    record.recommended_needles = text(|c| c.recommended_needles.as_deref());
    record.colorway = text(|c| c.colorway.as_deref());
    record.brand = text(|c| c.brand.as_deref());

    let number =
        |pick: fn(&ExtractionCandidate) -> Option<u32>| ai.and_then(pick).or(pick(heuristic));
    record.gauge_stitches = number(|c| c.gauge_stitches);
    record.gauge_rows = number(|c| c.gauge_rows);
    record.weight_grams = number(|c| c.weight_grams);
    record.length_meters = number(|c| c.length_meters);

    record.image_urls = union_images(
        &heuristic.image_urls,
        ai.map_or(&[][..], |a| a.image_urls.as_slice()),
    );

    record.steps = match ai {
        Some(a) if !a.steps.is_empty() => clean_steps(&a.steps),
        _ => clean_steps(&heuristic.steps),
    };
    record.renumber_steps();

    let dropped_note_chunks = reduce_redundancy(&mut record);

    Merged {
        record,
        dropped_note_chunks,
    }
}

fn pick_text(preferred: Option<&str>, fallback: Option<&str>) -> Option<String> {
    preferred
        .and_then(non_empty)
        .or_else(|| fallback.and_then(non_empty))
}

fn union_images(first: &[String], second: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(first.len() + second.len());
    for url in first.iter().chain(second) {
        if !out.contains(url) {
            out.push(url.clone());
        }
    }
    out
}

fn clean_steps(steps: &[ImportStep]) -> Vec<ImportStep> {
    steps
        .iter()
        .filter_map(|s| {
            let description = s.description.as_deref().and_then(non_empty);
            let title = non_empty(&s.title).or_else(|| description.clone())?;
            let description = description.filter(|d| *d != title);
            Some(ImportStep {
                step_number: s.step_number,
                title,
                description,
            })
        })
        .collect()
}

/// Clears step descriptions that merely restate the description, then drops
/// notes chunks already said elsewhere. Returns the number of dropped chunks.
fn reduce_redundancy(record: &mut ImportRecord) -> usize {
    let description = record
        .description
        .as_deref()
        .map(normalize_whitespace)
        .unwrap_or_default();

    if !description.is_empty() {
        for step in &mut record.steps {
            if step
                .description
                .as_deref()
                .is_some_and(|d| normalize_whitespace(d) == description)
            {
                step.description = None;
            }
        }
    }

    let Some(notes) = record.notes.take() else {
        return 0;
    };

    let step_texts: Vec<String> = record
        .steps
        .iter()
        .filter_map(|s| s.description.as_deref().map(normalize_whitespace))
        .collect();

    let mut kept_chunks: Vec<String> = Vec::new();
    let mut kept_lines: Vec<String> = Vec::new();
    let mut dropped = 0;

    for line in notes.lines() {
        let mut kept_in_line: Vec<String> = Vec::new();
        for chunk in split_sentences(line) {
            let norm = normalize_whitespace(chunk);
            if norm.is_empty() {
                continue;
            }
            let repeated = kept_chunks.contains(&norm);
            let trivial = norm.chars().filter(|c| !c.is_whitespace()).count() < MIN_CHUNK_CHARS;
            let said_elsewhere = !trivial
                && (description.contains(&norm) || step_texts.iter().any(|s| s.contains(&norm)));

            if repeated || said_elsewhere {
                dropped += 1;
                continue;
            }
            kept_chunks.push(norm.clone());
            kept_in_line.push(norm);
        }
        if !kept_in_line.is_empty() {
            kept_lines.push(kept_in_line.join(" "));
        }
    }

    record.notes = tidy_lines(&kept_lines.join("\n"));
    dropped
}

/// Splits after `.`, `!` or `?` followed by whitespace. Terminators stay
/// with their sentence. No split happens before a lowercase word or after
/// an abbreviation such as "approx." or "e.g.".
fn split_sentences(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;

    for (idx, ch) in line.char_indices() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let end = idx + ch.len_utf8();
        let rest = &line[end..];
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        if rest.trim_start().starts_with(char::is_lowercase) {
            continue;
        }
        if ch == '.' && ends_with_abbreviation(&line[start..idx]) {
            continue;
        }
        out.push(&line[start..end]);
        start = end;
    }
    out.push(&line[start..]);
    out
}

const ABBREVIATIONS: [&str; 10] = [
    "approx", "ca", "e.g", "i.e", "incl", "cf", "resp", "no", "nr", "vs",
];

fn ends_with_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    ABBREVIATIONS.contains(&word.as_str())
}

/// A readable title from the URL's last path segment, or its host.
#[must_use]
pub fn title_from_url(url: &str, kind: ImportKind) -> String {
    let fallback = || format!("Imported {kind}");
    let Ok(parsed) = reqwest::Url::parse(url.trim()) else {
        return fallback();
    };

    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.rev().find(|s| !s.is_empty()))
        .map(|s| {
            let stem = s.rsplit_once('.').map_or(s, |(stem, _)| stem);
            stem.replace("%20", " ")
                .replace(|c: char| matches!(c, '-' | '_' | '+'), " ")
        })
        .and_then(|s| non_empty(&s))
        .filter(|s| s.chars().any(char::is_alphabetic));

    match segment {
        Some(words) => capitalize_first(&words),
        None => parsed.host_str().map_or_else(fallback, str::to_owned),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;
