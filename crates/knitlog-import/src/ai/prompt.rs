//! Prompt construction for the AI-assisted extractor.

use knitlog_core::ImportKind;

use crate::text::truncate_chars;

const PATTERN_SCHEMA: &str = r#"{
  "title": string,
  "description": string | null,
  "notes": string | null,
  "category": string | null,
  "yarn": string | null,
  "needles": string | null,
  "gauge_stitches": integer | null,
  "gauge_rows": integer | null,
  "image_urls": [string],
  "steps": [{"title": string, "description": string | null}]
}"#;

const YARN_SCHEMA: &str = r#"{
  "title": string,
  "description": string | null,
  "brand": string | null,
  "colorway": string | null,
  "category": string | null,
  "fiber_content": string | null,
  "weight_grams": integer | null,
  "length_meters": integer | null,
  "recommended_needles": string | null,
  "gauge_stitches": integer | null,
  "gauge_rows": integer | null,
  "image_urls": [string]
}"#;

/// Fixed instructions for `kind`, including the target schema and the
/// no-repetition rule between description/notes and steps.
#[must_use]
pub fn system_prompt(kind: ImportKind) -> String {
    let (subject, schema) = match kind {
        ImportKind::Pattern => ("a knitting or crochet pattern", PATTERN_SCHEMA),
        ImportKind::Yarn => ("a yarn product", YARN_SCHEMA),
    };
    format!(
        "You extract structured data about {subject} from the text of a web page.\n\
         Respond with a single JSON object and nothing else, using exactly this shape:\n\
         {schema}\n\
         Rules:\n\
         - Use null for anything the page does not state. Never invent values.\n\
         - Numbers are plain integers without units: grams, meters, stitches and rows per 10 cm.\n\
         - Convert yards to meters and ounces to grams.\n\
         - Keep the page's wording for needle sizes, e.g. \"4-4,5mm\".\n\
         - Never repeat the same fact in both \"description\" or \"notes\" and any step \"description\". \
           Put each instruction in exactly one place.\n\
         - Only include image URLs that appear in the page text."
    )
}

/// The user prompt: page URL followed by page text cut to `max_chars`
/// characters. Returns the prompt and whether the text was cut.
#[must_use]
pub fn user_prompt(page_url: &str, page_text: &str, max_chars: usize) -> (String, bool) {
    let (text, truncated) = truncate_chars(page_text, max_chars);
    let prompt = format!("Page URL: {page_url}\n\nPage text:\n{text}");
    (prompt, truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_carries_schema_and_redundancy_rule() {
        let pattern = system_prompt(ImportKind::Pattern);
        assert!(pattern.contains("\"steps\""));
        assert!(pattern.contains("Never repeat the same fact"));
        let yarn = system_prompt(ImportKind::Yarn);
        assert!(yarn.contains("\"length_meters\""));
        assert!(!yarn.contains("\"steps\""));
    }

    #[test]
    fn user_prompt_is_bounded_on_char_boundaries() {
        let text = "å".repeat(50);
        let (prompt, truncated) = user_prompt("https://a.test/p", &text, 20);
        assert!(truncated);
        assert!(prompt.ends_with(&"å".repeat(20)));
        assert!(prompt.starts_with("Page URL: https://a.test/p"));

        let (_, truncated) = user_prompt("https://a.test/p", "short", 20);
        assert!(!truncated);
    }
}
