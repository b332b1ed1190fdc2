//! Deep-interaction steps run on a loaded page
//!
//! Infinite-scroll pages are scrolled until the document stops growing, then
//! "load more"-style controls are clicked. Every step is bounded by the
//! configured iteration and click counts.

use crate::config::InteractionConfig;
use crate::render::{RenderPage, RenderResult};
use std::time::Duration;

/// Script that reads the current document height
pub const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// What the interaction pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionReport {
    pub scrolls: u32,
    pub clicks: u32,
}

/// Runs the configured interaction steps; failures end a step early but are not fatal
pub async fn run_interactions(
    page: &mut dyn RenderPage,
    config: &InteractionConfig,
) -> InteractionReport {
    let mut report = InteractionReport::default();

    if config.scroll {
        match scroll_until_stable(
            page,
            config.max_scroll_iterations,
            Duration::from_millis(config.scroll_wait_ms),
        )
        .await
        {
            Ok(scrolls) => report.scrolls = scrolls,
            Err(e) => tracing::debug!("Scrolling stopped: {}", e),
        }
    }

    for selector in &config.click_selectors {
        report.clicks += click_repeatedly(
            page,
            selector,
            config.max_clicks,
            Duration::from_millis(config.click_wait_ms),
        )
        .await;
    }

    report
}

/// Scrolls to the bottom until the page height stops increasing
///
/// Returns the number of scrolls performed.
pub async fn scroll_until_stable(
    page: &mut dyn RenderPage,
    max_iterations: u32,
    wait: Duration,
) -> RenderResult<u32> {
    let mut height = read_height(page).await?;
    let mut scrolls = 0;

    while scrolls < max_iterations {
        page.evaluate(SCROLL_TO_BOTTOM).await?;
        scrolls += 1;
        tokio::time::sleep(wait).await;

        let new_height = read_height(page).await?;
        if new_height <= height {
            break;
        }
        height = new_height;
    }

    Ok(scrolls)
}

/// Clicks `selector` up to `max_clicks` times, stopping at the first failure
async fn click_repeatedly(
    page: &mut dyn RenderPage,
    selector: &str,
    max_clicks: u32,
    wait: Duration,
) -> u32 {
    let mut clicks = 0;

    while clicks < max_clicks {
        if let Err(e) = page.click(selector).await {
            tracing::debug!("Stopped clicking {}: {}", selector, e);
            break;
        }
        clicks += 1;
        tokio::time::sleep(wait).await;
    }

    clicks
}

async fn read_height(page: &mut dyn RenderPage) -> RenderResult<i64> {
    let value = page.evaluate(HEIGHT_SCRIPT).await?;
    Ok(value.as_i64().unwrap_or(0))
}
