//! URL host extraction and relative-URL resolution for fetched pages.

/// Lowercased hostname of `url` without a leading `www.`, or `None` when
/// the URL does not parse.
#[must_use]
pub fn page_host(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map_or_else(|| host.clone(), str::to_owned))
}

/// Resolves `candidate` against `base_url`. Protocol-relative (`//cdn...`),
/// root-relative and path-relative references are supported. `&amp;`
/// entities left in attribute values are decoded first.
#[must_use]
pub fn absolutize_url(base_url: &str, candidate: &str) -> Option<String> {
    let candidate = candidate.trim().replace("&amp;", "&");
    if candidate.is_empty() || candidate.starts_with("data:") {
        return None;
    }
    let base = reqwest::Url::parse(base_url).ok()?;
    base.join(&candidate).ok().map(|u| u.to_string())
}

/// Validates that `url` is an absolute `http(s)` URL.
pub(crate) fn validate_import_url(url: &str) -> Result<reqwest::Url, String> {
    let parsed = reqwest::Url::parse(url.trim()).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{other}'")),
    }
    if parsed.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_host_strips_www_and_lowercases() {
        assert_eq!(
            page_host("https://WWW.GarnStudio.com/pattern.php?id=1").as_deref(),
            Some("garnstudio.com")
        );
        assert!(page_host("not a url").is_none());
    }

    #[test]
    fn absolutize_handles_relative_forms() {
        let base = "https://shop.example.com/products/merino";
        assert_eq!(
            absolutize_url(base, "/media/a.jpg").as_deref(),
            Some("https://shop.example.com/media/a.jpg")
        );
        assert_eq!(
            absolutize_url(base, "//cdn.example.com/b.jpg?v=1&amp;w=800").as_deref(),
            Some("https://cdn.example.com/b.jpg?v=1&w=800")
        );
        assert_eq!(
            absolutize_url(base, "c.jpg").as_deref(),
            Some("https://shop.example.com/products/c.jpg")
        );
        assert!(absolutize_url(base, "data:image/png;base64,AAAA").is_none());
    }

    #[test]
    fn validate_rejects_non_http() {
        assert!(validate_import_url("https://x.test/p").is_ok());
        assert!(validate_import_url("ftp://x.test/p").is_err());
        assert!(validate_import_url("x.test/p").is_err());
    }
}
