//! Parsing of the completion service's answer into an
//! [`ExtractionCandidate`].
//!
//! Models are loose with types: numbers arrive as `"300 m"`, image lists as
//! comma-separated strings, steps as bare strings. All of that is accepted.
//! Anything that is not a JSON object is an [`AiError::Parse`].

use knitlog_core::{non_empty, CandidateSource, ExtractionCandidate, ImportStep};
use serde_json::{Map, Value};

use crate::error::AiError;
use crate::numeric::{leading_integer, parse_gauge};
use crate::text::tidy_lines;
use crate::tokens::{parse_import_image_urls, ImageUrlInput};

/// Parses a raw completion. Markdown code fences around the object are
/// tolerated.
///
/// # Errors
///
/// Returns [`AiError::Parse`] when the text is not a JSON object.
pub fn parse_ai_response(raw: &str) -> Result<ExtractionCandidate, AiError> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| AiError::Parse(format!("invalid JSON: {e}")))?;
    let Value::Object(obj) = value else {
        return Err(AiError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    };

    let mut c = ExtractionCandidate::empty(CandidateSource::Ai);
    c.title = text(&obj, "title");
    c.description = multiline_text(&obj, "description");
    c.notes = multiline_text(&obj, "notes");
    c.category = text(&obj, "category");
    c.yarn = text(&obj, "yarn");
    c.needles = text(&obj, "needles");
    c.fiber_content = text(&obj, "fiber_content");
    c.recommended_needles = text(&obj, "recommended_needles");
    c.colorway = text(&obj, "colorway");
    c.brand = text(&obj, "brand");
    c.weight_grams = integer(&obj, "weight_grams");
    c.length_meters = integer(&obj, "length_meters");
    c.gauge_stitches = integer(&obj, "gauge_stitches");
    c.gauge_rows = integer(&obj, "gauge_rows");

    if c.gauge_stitches.is_none() && c.gauge_rows.is_none() {
        if let Some(gauge) = text(&obj, "gauge") {
            (c.gauge_stitches, c.gauge_rows) = parse_gauge(&gauge);
        }
    }

    c.image_urls = image_urls(obj.get("image_urls"));
    c.steps = steps(obj.get("steps"));

    Ok(c)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Like [`text`] but keeps line breaks; the merge stage works per line.
fn multiline_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => tidy_lines(s),
        _ => text(obj, key),
    }
}

fn integer(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    match obj.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| n.as_f64().and_then(float_to_u32)),
        Value::String(s) => leading_integer(s),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_u32(v: f64) -> Option<u32> {
    (v.is_finite() && v >= 0.0 && v <= f64::from(u32::MAX)).then(|| v.round() as u32)
}

fn image_urls(value: Option<&Value>) -> Vec<String> {
    let input = match value {
        Some(Value::String(s)) => ImageUrlInput::One(s.clone()),
        Some(Value::Array(items)) => ImageUrlInput::Many(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        _ => return Vec::new(),
    };
    parse_import_image_urls(Some(&input))
}

fn steps(value: Option<&Value>) -> Vec<ImportStep> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    let parsed = items.iter().filter_map(|item| match item {
        Value::String(s) => non_empty(s).map(|title| (title, None)),
        Value::Object(step) => {
            let title = text(step, "title").or_else(|| text(step, "name"));
            let description = text(step, "description")
                .or_else(|| text(step, "text"))
                .or_else(|| text(step, "instructions"));
            match (title, description) {
                (Some(title), description) => Some((title, description)),
                (None, Some(description)) => Some((description, None)),
                (None, None) => None,
            }
        }
        _ => None,
    });

    parsed
        .zip(1u32..)
        .map(|((title, description), step_number)| ImportStep {
            step_number,
            title,
            description,
        })
        .collect()
}
