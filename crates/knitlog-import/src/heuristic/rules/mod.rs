//! Built-in retailer rules. Adding a retailer means one more file here and
//! one more `register` call in [`super::RuleRegistry::with_default_rules`].

mod garnstudio;
mod ravelry;
mod shopify;

pub use garnstudio::GarnstudioRule;
pub use ravelry::RavelryRule;
pub use shopify::ShopifyRule;

/// `true` when `host` is `domain` or one of its subdomains.
pub(crate) fn host_is(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
