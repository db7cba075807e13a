//! Shopify storefront product pages, recognized by their asset CDN rather
//! than by domain: indie dyers and pattern shops run on custom domains.

use std::sync::LazyLock;

use knitlog_core::{non_empty, CandidateSource, ExtractionCandidate};
use regex::Regex;

use super::host_is;
use crate::heuristic::labels::apply_label;
use crate::heuristic::{PageContext, SiteRule};
use crate::html::{clean_text, html_to_text, split_label_value};
use crate::text::tidy_lines;

static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<div[^>]*class\s*=\s*["'][^"']*(?:product__description|product-single__description|product-description)[^"']*["'][^>]*>(.*?)</div>"#,
    )
    .expect("valid shopify description regex")
});
static VENDOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""vendor"\s*:\s*"((?:[^"\\]|\\.)+)""#).expect("valid shopify vendor regex")
});
static PRODUCT_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:product_)?type"\s*:\s*"((?:[^"\\]|\\.)+)""#).expect("valid shopify type regex")
});
static IMAGES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"images"\s*:\s*\[(.*?)\]"#).expect("valid shopify images regex")
});
static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("valid quoted regex"));

pub struct ShopifyRule;

impl SiteRule for ShopifyRule {
    fn name(&self) -> &'static str {
        "shopify"
    }

    fn matches(&self, host: &str, html: &str) -> bool {
        host_is(host, "myshopify.com")
            || html.contains("cdn.shopify.com")
            || html.contains("product__description")
    }

    fn extract(&self, page: &PageContext<'_>) -> ExtractionCandidate {
        let mut c = ExtractionCandidate::empty(CandidateSource::Heuristic);

        if let Some(block) = DESCRIPTION_RE.captures(page.html).and_then(|cap| cap.get(1)) {
            let text = html_to_text(block.as_str());
            let mut prose: Vec<&str> = Vec::new();
            for line in text.lines() {
                let recognized = split_label_value(line)
                    .is_some_and(|(label, value)| apply_label(&mut c, page.kind, &label, &value));
                if !recognized {
                    prose.push(line);
                }
            }
            c.description = tidy_lines(&prose.join("\n"));
        }

        c.brand = VENDOR_RE
            .captures(page.html)
            .and_then(|cap| non_empty(&unescape_json_str(&cap[1])));
        c.category = PRODUCT_TYPE_RE
            .captures(page.html)
            .and_then(|cap| non_empty(&clean_text(&unescape_json_str(&cap[1]))));

        if let Some(list) = IMAGES_RE.captures(page.html).and_then(|cap| cap.get(1)) {
            c.image_urls = QUOTED_RE
                .captures_iter(list.as_str())
                .map(|q| unescape_json_str(&q[1]))
                .filter(|u| !u.is_empty())
                .collect();
        }

        c
    }
}

/// Undoes the escapes Shopify themes leave in inline product JSON.
fn unescape_json_str(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.replace("\\/", "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use knitlog_core::ImportKind;

    const PAGE: &str = r#"<html><head>
        <link rel="preconnect" href="https://cdn.shopify.com">
        <script>var meta = {"product":{"vendor":"Hedgehog Fibres","type":"Sock Yarn"}};
        window.product = {"images":["\/\/cdn.shopify.com\/s\/files\/1\/a.jpg","\/\/cdn.shopify.com\/s\/files\/1\/b.jpg"]};</script>
        </head><body>
        <div class="product__description rte">
          <p>Hand-dyed  speckles.</p>
          <ul><li>Fibre: 75% merino, 25% nylon</li><li>Length: 400m / 100g</li></ul>
        </div></body></html>"#;

    #[test]
    fn storefront_product_page() {
        let rule = ShopifyRule;
        assert!(rule.matches("hedgehogfibres.com", PAGE));
        let c = rule.extract(&PageContext {
            html: PAGE,
            url: "https://hedgehogfibres.com/products/sock",
            host: "hedgehogfibres.com",
            kind: ImportKind::Yarn,
        });
        assert_eq!(c.description.as_deref(), Some("Hand-dyed speckles."));
        assert_eq!(c.fiber_content.as_deref(), Some("75% merino, 25% nylon"));
        assert_eq!(c.length_meters, Some(400));
        assert_eq!(c.brand.as_deref(), Some("Hedgehog Fibres"));
        assert_eq!(c.category.as_deref(), Some("Sock Yarn"));
        assert_eq!(
            c.image_urls,
            vec![
                "//cdn.shopify.com/s/files/1/a.jpg",
                "//cdn.shopify.com/s/files/1/b.jpg"
            ]
        );
    }

    #[test]
    fn plain_pages_do_not_match() {
        assert!(!ShopifyRule.matches("example.com", "<html><p>hi</p></html>"));
        assert!(ShopifyRule.matches("knits.myshopify.com", ""));
    }
}
