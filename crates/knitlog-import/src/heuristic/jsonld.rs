//! schema.org JSON-LD extraction (`Product`, `HowTo`, `CreativeWork`).

use std::sync::LazyLock;

use knitlog_core::{non_empty, CandidateSource, ExtractionCandidate, ImportStep};
use regex::Regex;
use serde_json::Value;

use crate::html::{clean_text, html_to_text};
use crate::text::tidy_lines;

static LD_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid ld+json regex")
});

const ACCEPTED_TYPES: [&str; 6] = [
    "Product",
    "ProductGroup",
    "HowTo",
    "CreativeWork",
    "Book",
    "IndividualProduct",
];

/// Fields from every accepted JSON-LD node on the page, first node first.
/// Unparseable blocks are skipped.
pub(crate) fn extract_jsonld(html: &str) -> ExtractionCandidate {
    let mut candidate = ExtractionCandidate::empty(CandidateSource::Heuristic);

    for cap in LD_SCRIPT_RE.captures_iter(html) {
        let Some(json_text) = cap.get(1) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(json_text.as_str().trim()) else {
            tracing::debug!("skipping unparseable JSON-LD block");
            continue;
        };

        // Top-level object, array, or @graph container.
        let mut nodes: Vec<&Value> = match &value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        let graph: Vec<&Value> = nodes
            .iter()
            .filter_map(|n| n.get("@graph").and_then(Value::as_array))
            .flatten()
            .collect();
        nodes.extend(graph);

        for node in nodes.into_iter().filter(|n| is_accepted(n)) {
            candidate.fill_missing_from(node_to_candidate(node));
        }
    }

    candidate
}

fn is_accepted(node: &Value) -> bool {
    let Some(type_node) = node.get("@type") else {
        return false;
    };
    let matches = |s: &str| ACCEPTED_TYPES.iter().any(|t| s.eq_ignore_ascii_case(t));
    match type_node {
        Value::String(s) => matches(s),
        Value::Array(items) => items.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn node_to_candidate(node: &Value) -> ExtractionCandidate {
    let mut c = ExtractionCandidate::empty(CandidateSource::Heuristic);

    c.title = text_field(node, "name");
    c.description = node
        .get("description")
        .and_then(Value::as_str)
        .and_then(|d| tidy_lines(&html_to_text(d)));
    c.category = text_field(node, "category");
    c.fiber_content = text_field(node, "material");
    c.colorway = text_field(node, "color");
    c.brand = node.get("brand").and_then(|b| match b {
        Value::Object(_) => text_field(b, "name"),
        Value::String(s) => non_empty(s),
        _ => None,
    });
    if let Some(image) = node.get("image") {
        collect_images(image, &mut c.image_urls);
    }
    if let Some(steps) = node.get("step") {
        collect_steps(steps, &mut c.steps);
    }

    c
}

fn text_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .and_then(|s| non_empty(&s))
}

/// `image` may be a URL, an `ImageObject`, or an array of either.
fn collect_images(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => {
            let url = url.trim();
            if !url.is_empty() && !out.iter().any(|u| u == url) {
                out.push(url.to_owned());
            }
        }
        Value::Object(_) => {
            if let Some(url) = value.get("url").or_else(|| value.get("contentUrl")) {
                collect_images(url, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_images(item, out);
            }
        }
        _ => {}
    }
}

/// `HowToStep`s, plain strings, and `HowToSection`s whose
/// `itemListElement` holds further steps.
fn collect_steps(value: &Value, out: &mut Vec<ImportStep>) {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    for item in items {
        match item {
            Value::String(text) => push_step(out, None, Some(text.as_str())),
            Value::Object(_) => {
                if let Some(children) = item.get("itemListElement") {
                    collect_steps(children, out);
                } else {
                    push_step(
                        out,
                        item.get("name").and_then(Value::as_str),
                        item.get("text").and_then(Value::as_str),
                    );
                }
            }
            _ => {}
        }
    }
}

fn push_step(out: &mut Vec<ImportStep>, name: Option<&str>, text: Option<&str>) {
    let name = name.map(clean_text).and_then(|s| non_empty(&s));
    let text = text.map(clean_text).and_then(|s| non_empty(&s));
    let (title, description) = match (name, text) {
        (Some(name), text) => {
            let description = text.filter(|t| *t != name);
            (name, description)
        }
        (None, Some(text)) => (text, None),
        (None, None) => return,
    };
    let step_number = u32::try_from(out.len() + 1).unwrap_or(u32::MAX);
    out.push(ImportStep {
        step_number,
        title,
        description,
    });
}
