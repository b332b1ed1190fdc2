use url::{Host, Url};

/// Second-level labels that act as public suffixes under a country code
/// (e.g. `co.uk`, `com.au`)
const SECOND_LEVEL_SUFFIXES: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu"];

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the registrable domain ("eTLD+1") of a URL's host
///
/// IP hosts are returned unchanged. Hostnames keep their last two labels,
/// or three when the second-to-last label is a known second-level suffix
/// under a two-letter country code. The leading `www.` never matters.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::registrable_domain;
///
/// let url = Url::parse("https://blog.example.com/post").unwrap();
/// assert_eq!(registrable_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://shop.example.co.uk/").unwrap();
/// assert_eq!(registrable_domain(&url), Some("example.co.uk".to_string()));
/// ```
pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
        Host::Domain(domain) => {
            let domain = domain.to_lowercase();
            let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
            if labels.len() <= 2 {
                return Some(labels.join("."));
            }

            let n = labels.len();
            let keep = if labels[n - 1].len() == 2 && SECOND_LEVEL_SUFFIXES.contains(&labels[n - 2])
            {
                3
            } else {
                2
            };

            Some(labels[n - keep..].join("."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_extract_simple_domain() {
        assert_eq!(
            extract_domain(&parse("https://example.com/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_with_port() {
        assert_eq!(
            extract_domain(&parse("https://example.com:8080/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_mixed_case() {
        assert_eq!(
            extract_domain(&parse("https://Example.COM/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_registrable_domain_strips_subdomains() {
        assert_eq!(
            registrable_domain(&parse("https://www.example.com/")),
            Some("example.com".to_string())
        );
        assert_eq!(
            registrable_domain(&parse("https://api.v2.example.com/x")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_registrable_domain_country_code_suffix() {
        assert_eq!(
            registrable_domain(&parse("https://news.bbc.co.uk/")),
            Some("bbc.co.uk".to_string())
        );
        // two-letter TLD without a second-level suffix
        assert_eq!(
            registrable_domain(&parse("https://docs.example.io/")),
            Some("example.io".to_string())
        );
    }

    #[test]
    fn test_registrable_domain_ip_host() {
        assert_eq!(
            registrable_domain(&parse("http://127.0.0.1:3000/")),
            Some("127.0.0.1".to_string())
        );
    }

    #[test]
    fn test_registrable_domain_single_label() {
        assert_eq!(
            registrable_domain(&parse("http://localhost/")),
            Some("localhost".to_string())
        );
    }
}
