//! `label: value` routing shared by every rule.
//!
//! Retailers label the same facts in many ways ("Weight/Length", "Lauflänge",
//! "Knitting tension"). A label may feed more than one field; a field that
//! already holds a value is never overwritten, so the first source wins.

use knitlog_core::{non_empty, ExtractionCandidate, ImportKind};

use crate::numeric::{parse_gauge, parse_length_meters, parse_needle_size, parse_weight_grams};

/// Routes one labeled value into `candidate`. Returns `true` when the label
/// was recognized, whether or not a field changed.
pub(crate) fn apply_label(
    candidate: &mut ExtractionCandidate,
    kind: ImportKind,
    label: &str,
    value: &str,
) -> bool {
    let label = label.trim().trim_end_matches(':').to_lowercase();
    let Some(clean) = non_empty(value) else {
        return false;
    };

    if has_any(&label, &["gauge", "tension", "maschenprobe", "strikkefasthed", "swatch"]) {
        let (stitches, rows) = parse_gauge(&clean);
        fill(&mut candidate.gauge_stitches, stitches);
        fill(&mut candidate.gauge_rows, rows);
        return true;
    }

    if has_any(&label, &["needle", "nadel", "pinde", "hook"]) {
        match kind {
            ImportKind::Pattern => fill(&mut candidate.needles, Some(clean)),
            ImportKind::Yarn => fill(
                &mut candidate.recommended_needles,
                parse_needle_size(&clean).or(Some(clean)),
            ),
        }
        return true;
    }

    if has_any(&label, &["yarn weight", "yarn group", "weight category", "garnstärke", "yarn class"]) {
        if kind == ImportKind::Yarn {
            fill(&mut candidate.category, Some(clean));
        }
        return true;
    }

    let mut recognized = false;

    if has_any(&label, &["length", "yardage", "meterage", "lauflänge", "løbelængde"]) {
        fill(&mut candidate.length_meters, parse_length_meters(&clean));
        recognized = true;
    }

    if has_any(&label, &["weight", "gewicht", "vægt"]) {
        let grams = parse_weight_grams(&clean);
        if grams.is_none() && kind == ImportKind::Yarn {
            fill(&mut candidate.category, Some(clean.clone()));
        }
        fill(&mut candidate.weight_grams, grams);
        fill(&mut candidate.length_meters, parse_length_meters(&clean));
        recognized = true;
    }
    if recognized {
        return true;
    }

    if has_any(
        &label,
        &["fiber", "fibre", "material", "composition", "content", "blend", "zusammensetzung"],
    ) {
        fill(&mut candidate.fiber_content, Some(clean));
        return true;
    }

    if has_any(&label, &["colorway", "colour", "color", "shade", "farbe"]) {
        fill(&mut candidate.colorway, Some(clean));
        return true;
    }

    if has_any(&label, &["brand", "manufacturer", "vendor", "company", "marke"]) {
        fill(&mut candidate.brand, Some(clean));
        return true;
    }

    if has_any(&label, &["category", "type", "kategorie"]) {
        fill(&mut candidate.category, Some(clean));
        return true;
    }

    if kind == ImportKind::Pattern && has_any(&label, &["yarn", "garn"]) {
        fill(&mut candidate.yarn, Some(clean));
        return true;
    }

    false
}

fn has_any(label: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| label.contains(n))
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}
