/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches the bare domain and any subdomain
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let candidate = candidate.trim_end_matches('.');
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate.eq_ignore_ascii_case(base)
                || candidate
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", base.to_ascii_lowercase()))
        }
        None => candidate.eq_ignore_ascii_case(pattern),
    }
}

/// Returns true if the domain matches any pattern in the list
pub fn matches_any(patterns: &[String], candidate: &str) -> bool {
    patterns.iter().any(|p| matches_wildcard(p, candidate))
}
