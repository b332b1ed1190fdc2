//! Robots.txt parser implementation
//!
//! Allow/disallow matching is delegated to the robotstxt crate; crawl-delay
//! and sitemap directives are read here since that crate does not expose them.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Parsed robots.txt data
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt is missing, denied, or failed to load.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns true if this ruleset carries no directives at all
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if an absolute URL is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product_token(user_agent), url)
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let agent = product_token(user_agent).to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut group_open = false;
        let mut for_agent: Option<f64> = None;
        let mut for_wildcard: Option<f64> = None;

        for (key, value) in directives(&self.content) {
            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after other directives starts a new group
                    if !group_open {
                        group.clear();
                        group_open = true;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_open = false;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        for_agent.get_or_insert(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        for_wildcard.get_or_insert(delay);
                    }
                }
                _ => group_open = false,
            }
        }

        // Only finite, non-negative values get here, so the sole failure is overflow
        for_agent
            .or(for_wildcard)
            .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }

    /// Returns every `Sitemap:` URL listed, in file order
    pub fn sitemaps(&self) -> Vec<String> {
        directives(&self.content)
            .filter(|(key, value)| key == "sitemap" && !value.is_empty())
            .map(|(_, value)| value)
            .collect()
    }
}

/// Splits robots.txt content into lowercase-key / trimmed-value pairs
fn directives(content: &str) -> impl Iterator<Item = (String, String)> + '_ {
    content.lines().filter_map(|line| {
        let line = line.split('#').next().unwrap_or("").trim();
        let (key, value) = line.split_once(':')?;
        Some((key.trim().to_lowercase(), value.trim().to_string()))
    })
}

/// Reduces a full user agent string to its product token ("Bot/1.0 (+url)" -> "Bot")
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|s| !s.is_empty())
        .unwrap_or("*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("https://example.com/admin", "TestBot"));
        assert!(robots.is_empty());
    }

    #[test]
    fn test_parse_disallow_specific() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /admin");
        assert!(robots.is_allowed("https://example.com/", "TestBot"));
        assert!(robots.is_allowed("https://example.com/page", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/admin", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/admin/users", "TestBot"));
    }

    #[test]
    fn test_parse_allow_and_disallow() {
        let robots =
            ParsedRobots::from_content("User-agent: *\nDisallow: /private\nAllow: /private/public");
        assert!(!robots.is_allowed("https://example.com/private", "TestBot"));
        assert!(robots.is_allowed("https://example.com/private/public", "TestBot"));
    }

    #[test]
    fn test_full_user_agent_string_matches_group() {
        let robots =
            ParsedRobots::from_content("User-agent: HarvestBot\nDisallow: /\n\nUser-agent: *\nAllow: /");
        assert!(!robots.is_allowed(
            "https://example.com/page",
            "HarvestBot/0.1 (+https://example.com/bot)"
        ));
        assert!(robots.is_allowed("https://example.com/page", "OtherBot/2.0"));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 10\nDisallow: /admin");
        assert_eq!(robots.crawl_delay("TestBot"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_crawl_delay_specific_agent_wins() {
        let robots = ParsedRobots::from_content(
            "User-agent: *\nCrawl-delay: 10\n\nUser-agent: TestBot\nCrawl-delay: 5",
        );
        assert_eq!(robots.crawl_delay("TestBot/1.0"), Some(Duration::from_secs(5)));
        assert_eq!(robots.crawl_delay("OtherBot"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_crawl_delay_grouped_agents() {
        let robots =
            ParsedRobots::from_content("User-agent: BotA\nUser-agent: BotB\nCrawl-delay: 3");
        assert_eq!(robots.crawl_delay("BotA"), Some(Duration::from_secs(3)));
        assert_eq!(robots.crawl_delay("BotB"), Some(Duration::from_secs(3)));
        assert_eq!(robots.crawl_delay("BotC"), None);
    }

    #[test]
    fn test_crawl_delay_decimal_and_invalid() {
        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 2.5");
        assert_eq!(robots.crawl_delay("TestBot"), Some(Duration::from_millis(2500)));

        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: soon");
        assert_eq!(robots.crawl_delay("TestBot"), None);
    }

    #[test]
    fn test_crawl_delay_out_of_range_saturates() {
        for huge in ["1e30", "99999999999999999999"] {
            let robots = ParsedRobots::from_content(&format!("User-agent: *\nCrawl-delay: {}", huge));
            assert_eq!(robots.crawl_delay("TestBot"), Some(Duration::MAX));
        }

        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: inf");
        assert_eq!(robots.crawl_delay("TestBot"), None);
    }

    #[test]
    fn test_sitemaps() {
        let robots = ParsedRobots::from_content(
            "Sitemap: https://example.com/sitemap.xml\nUser-agent: *\nDisallow:\n# Sitemap: https://ignored.com/x.xml\nsitemap: https://example.com/news.xml",
        );
        assert_eq!(
            robots.sitemaps(),
            vec![
                "https://example.com/sitemap.xml".to_string(),
                "https://example.com/news.xml".to_string()
            ]
        );
    }

    #[test]
    fn test_product_token() {
        assert_eq!(product_token("HarvestBot/0.1 (+https://x)"), "HarvestBot");
        assert_eq!(product_token("plain"), "plain");
        assert_eq!(product_token(""), "*");
    }
}
