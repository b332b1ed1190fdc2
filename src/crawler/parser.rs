//! HTML extraction
//!
//! Turns rendered markup into the title, visible text, raw link targets and
//! meta tags of a page. Extraction is pure: no I/O, no URL resolution (the
//! worker resolves and scope-checks links itself).

use crate::{HarvestError, Result};
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// Elements whose text is never part of the visible page text
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible text, one trimmed line per text run
    pub text: String,

    /// Raw `href` values, in document order
    pub links: Vec<String>,

    /// `<meta name|property=... content=...>` pairs
    pub meta: BTreeMap<String, String>,
}

/// Converts a rendered document into a [`ParsedPage`]
pub trait Extractor: Send + Sync {
    fn extract(&self, url: &Url, markup: &str) -> Result<ParsedPage>;
}

/// Default extractor built on `scraper`
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn extract(&self, url: &Url, markup: &str) -> Result<ParsedPage> {
        parse_html(markup).map_err(|message| HarvestError::Extraction {
            url: url.to_string(),
            message,
        })
    }
}

/// Parses HTML content and extracts title, text, links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">`
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
///
/// Scheme filtering (`javascript:`, `mailto:`, ...) happens during link
/// normalization, not here.
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html).unwrap();
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["/page".to_string()]);
/// ```
pub fn parse_html(html: &str) -> std::result::Result<ParsedPage, String> {
    if html.trim().is_empty() {
        return Err("empty document".to_string());
    }

    let document = Html::parse_document(html);

    Ok(ParsedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document),
        meta: extract_meta(&document),
    })
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects visible text, skipping script-like elements
fn extract_text(document: &Html) -> String {
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        lines.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    lines.join("\n")
}

/// Extracts raw link targets from the HTML document
fn extract_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                links.push(href.to_string());
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                links.push(href.to_string());
            }
        }
    }

    links
}

fn extract_meta(document: &Html) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();

    let Ok(selector) = Selector::parse("meta[content]") else {
        return meta;
    };

    for element in document.select(&selector) {
        let value = element.value();
        let key = value.attr("name").or_else(|| value.attr("property"));
        if let (Some(key), Some(content)) = (key, value.attr("content")) {
            meta.entry(key.to_string())
                .or_insert_with(|| content.to_string());
        }
    }

    meta
}
