//! Form-driven seeding
//!
//! Submits configured search forms once per query and harvests the links on
//! each result page as depth-0 seeds.

use crate::config::FormSeed;
use crate::crawler::Extractor;
use crate::politeness::PolitenessManager;
use crate::render::{RenderError, RenderPage, RenderSession};
use crate::url::{extract_domain, normalize_seed, resolve_links, ScopeRules};
use crate::Result;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Builds the script that fills `selector` with `query` and fires input events
///
/// Evaluates to `false` when no element matches.
pub fn fill_script(selector: &str, query: &str) -> String {
    // JSON string literals are valid JavaScript string literals
    let selector = serde_json::Value::from(selector);
    let query = serde_json::Value::from(query);

    format!(
        "(() => {{ const el = document.querySelector({selector}); \
         if (!el) return false; \
         el.value = {query}; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
         return true; }})()"
    )
}

/// Runs every configured form query and returns the in-scope links found
///
/// Form pages get the same robots.txt check and per-domain admission as
/// crawled pages. A failing query is logged and skipped.
pub async fn seed_from_forms(
    session: &dyn RenderSession,
    forms: &[FormSeed],
    extractor: &dyn Extractor,
    scope: &ScopeRules,
    politeness: &PolitenessManager,
    wait_after_submit: Duration,
) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for form in forms {
        let form_url = match normalize_seed(&form.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping form {}: {}", form.url, e);
                continue;
            }
        };

        politeness.prime(&form_url).await;
        if !politeness.is_allowed(&form_url) {
            tracing::info!("Skipping form {}: disallowed by robots.txt", form_url);
            continue;
        }
        let domain = extract_domain(&form_url).unwrap_or_default();

        for query in &form.queries {
            let token = politeness.acquire(&domain, &form_url).await;
            let result =
                submit_query(session, form, &form_url, query, extractor, wait_after_submit).await;
            politeness.release(token);

            let links = match result {
                Ok(links) => links,
                Err(e) => {
                    tracing::warn!("Form query {:?} on {} failed: {}", query, form_url, e);
                    continue;
                }
            };

            let before = seeds.len();
            for link in links {
                if scope.check(&link).is_ok() && seen.insert(link.as_str().to_string()) {
                    seeds.push(link);
                }
            }
            tracing::debug!(
                "Form query {:?} on {} yielded {} new seeds",
                query,
                form_url,
                seeds.len() - before
            );
        }
    }

    seeds
}

async fn submit_query(
    session: &dyn RenderSession,
    form: &FormSeed,
    form_url: &Url,
    query: &str,
    extractor: &dyn Extractor,
    wait_after_submit: Duration,
) -> Result<Vec<Url>> {
    let mut page = session.open().await?;
    let links = run_query(page.as_mut(), form, form_url, query, extractor, wait_after_submit).await;
    page.close().await;
    links
}

async fn run_query(
    page: &mut dyn RenderPage,
    form: &FormSeed,
    form_url: &Url,
    query: &str,
    extractor: &dyn Extractor,
    wait_after_submit: Duration,
) -> Result<Vec<Url>> {
    let navigation = page.navigate(form_url).await?;
    if navigation.is_error() {
        return Err(RenderError::Navigation(format!("HTTP {}", navigation.status)).into());
    }

    let filled = page
        .evaluate(&fill_script(&form.input_selector, query))
        .await?;
    if filled == serde_json::Value::Bool(false) {
        return Err(RenderError::Backend(format!(
            "no element matches {}",
            form.input_selector
        ))
        .into());
    }

    page.click(&form.submit_selector).await?;
    if !wait_after_submit.is_zero() {
        tokio::time::sleep(wait_after_submit).await;
    }

    let markup = page.content().await?;
    let parsed = extractor.extract(form_url, &markup)?;
    Ok(resolve_links(&parsed.links, form_url))
}
