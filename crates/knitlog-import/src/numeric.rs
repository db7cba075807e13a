//! Numeric field parsing for retailer text.
//!
//! Source text is full of mojibake (`Â`, `â€‹`, U+FFFD), unit suffixes and
//! mixed separators. Every parser scans for the first number carrying the
//! right unit and ignores whatever surrounds it; no match is `None`, never 0.

use std::sync::LazyLock;

use regex::Regex;

const METERS_PER_YARD: f64 = 0.9144;
const GRAMS_PER_OUNCE: f64 = 28.3495;

static LEADING_INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid integer regex"));
static METERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:,\d{3})+|\d+)(?:[.,]\d+)?\s*(?:metres|meters|metre|meter|metros|mtr|m)\b")
        .expect("valid meters regex")
});
static YARDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:,\d{3})+|\d+)(?:[.,]\d+)?\s*(?:yards|yard|yds|yd)\b")
        .expect("valid yards regex")
});
static GRAMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)(?:[.,]\d+)?\s*(?:grams|gramm|gram|gr|g)\b").expect("valid grams regex")
});
static OUNCES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:ounces|ounce|oz)\b").expect("valid ounces regex")
});
static NEEDLE_MM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)?(?:\s*[-–]\s*\d+(?:[.,]\d+)?)?)\s*mm\b").expect("valid needle regex")
});
static NEEDLE_US_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bUS\s*(\d+(?:\.\d+)?(?:\s*[-–]\s*\d+(?:\.\d+)?)?)").expect("valid US needle regex")
});
static US_SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bUS\s*\d+(?:\.\d+)?").expect("valid US size regex"));
static STITCHES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:stitches|stitch|sts|st|maschen|masker|m)\b").expect("valid stitches regex")
});
static ROWS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:rows|row|rounds|round|rnds|rnd|reihen|pinnar|omg|r)\b")
        .expect("valid rows regex")
});

/// First run of ASCII digits anywhere in `s`.
#[must_use]
pub fn leading_integer(s: &str) -> Option<u32> {
    LEADING_INT_RE
        .find(s)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Length in meters. Yardage is converted when no metric length is given.
#[must_use]
pub fn parse_length_meters(s: &str) -> Option<u32> {
    if let Some(caps) = METERS_RE.captures(s) {
        return parse_grouped(&caps[1]);
    }
    let yards = YARDS_RE.captures(s).and_then(|c| parse_grouped(&c[1]))?;
    Some(round_u32(f64::from(yards) * METERS_PER_YARD))
}

/// Ball or skein weight in grams. Ounces are converted when no metric
/// weight is given.
#[must_use]
pub fn parse_weight_grams(s: &str) -> Option<u32> {
    if let Some(caps) = GRAMS_RE.captures(s) {
        return caps[1].parse().ok();
    }
    let ounces: f64 = OUNCES_RE
        .captures(s)
        .and_then(|c| c[1].replace(',', ".").parse().ok())?;
    Some(round_u32(ounces * GRAMS_PER_OUNCE))
}

/// Needle size as written, e.g. `"4mm"`, `"4-4,5mm"` or `"US 6"`.
/// Spacing inside the range is removed and en dashes become hyphens. A
/// metric size wins over a US size given alongside it.
#[must_use]
pub fn parse_needle_size(s: &str) -> Option<String> {
    let metric_only = US_SIZE_RE.replace_all(s, " ");
    if let Some(caps) = NEEDLE_MM_RE.captures(&metric_only) {
        return Some(format!("{}mm", compact_range(&caps[1])));
    }
    NEEDLE_US_RE
        .captures(s)
        .map(|caps| format!("US {}", compact_range(&caps[1])))
}

fn compact_range(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '–' { '-' } else { c })
        .collect()
}

/// `(stitches, rows)` from a gauge line such as
/// `"22 sts and 30 rows = 10 x 10 cm"`.
#[must_use]
pub fn parse_gauge(s: &str) -> (Option<u32>, Option<u32>) {
    let stitches = STITCHES_RE
        .captures(s)
        .and_then(|c| c[1].parse::<u32>().ok());
    let rows = ROWS_RE.captures(s).and_then(|c| c[1].parse::<u32>().ok());
    (stitches, rows)
}

fn parse_grouped(digits: &str) -> Option<u32> {
    digits.replace(',', "").parse().ok()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_u32(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}
