use crate::UrlError;
use std::collections::HashSet;
use url::Url;

/// Schemes that never produce a followable link
const REJECTED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Resolves a raw `href` against the page it was found on
///
/// # Normalization Steps
///
/// 1. Trim whitespace; drop empty hrefs
/// 2. Reject `javascript:`, `mailto:`, `tel:` and `data:` links
/// 3. Resolve relative references against `base`
/// 4. Strip the fragment
/// 5. Keep only http(s) results
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/a/b").unwrap();
/// let url = normalize_link("/c#frag", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/c");
///
/// assert!(normalize_link("mailto:x@y.com", &base).is_none());
/// assert!(normalize_link("javascript:void(0)", &base).is_none());
/// ```
pub fn normalize_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if REJECTED_SCHEMES.iter().any(|s| lowered.starts_with(s)) {
        return None;
    }

    let mut url = base.join(href).ok()?;
    url.set_fragment(None);

    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Resolves raw hrefs against `base`, dropping duplicates and unfollowable links
///
/// Document order is preserved.
pub fn resolve_links(hrefs: &[String], base: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    hrefs
        .iter()
        .filter_map(|href| normalize_link(href, base))
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

/// Parses an absolute seed URL, stripping its fragment
pub fn normalize_seed(raw: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Returns true if the URL path ends in one of the denied extensions
///
/// Extensions are compared case-insensitively and given without the dot.
pub fn has_denied_extension(url: &Url, denied: &[String]) -> bool {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            denied.iter().any(|d| d.eq_ignore_ascii_case(ext))
        }
        _ => false,
    }
}
