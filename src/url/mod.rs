//! URL handling module for Sumi-Harvest
//!
//! This module provides link normalization, domain extraction, wildcard matching,
//! and the domain-scope rules that decide which discovered links are followed.

mod domain;
mod matcher;
mod normalize;

use crate::config::CrawlerConfig;
use ::url::Url;

// Re-export main functions
pub use domain::{extract_domain, registrable_domain};
pub use matcher::{matches_any, matches_wildcard};
pub use normalize::{has_denied_extension, normalize_link, normalize_seed, resolve_links};

/// Why a URL fell outside the crawl scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeRejection {
    /// URL has no host
    NoDomain,
    /// Host matches the deny list
    Denied,
    /// An allow list exists and the host is not on it
    NotAllowed,
    /// Different registrable domain and external links are not followed
    External,
    /// Path ends in a denied file extension
    DeniedExtension,
}

/// Allow/deny/domain-scope rules shared by seeding and link discovery
#[derive(Debug, Clone)]
pub struct ScopeRules {
    allow_domains: Vec<String>,
    deny_domains: Vec<String>,
    denied_extensions: Vec<String>,
    follow_external: bool,
}

impl ScopeRules {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            allow_domains: config.allow_domains.clone(),
            deny_domains: config.deny_domains.clone(),
            denied_extensions: config.denied_extensions.clone(),
            follow_external: config.follow_external,
        }
    }

    /// Checks a URL against the allow/deny lists and extension denylist
    ///
    /// Priority order:
    /// 1. Deny list (highest priority)
    /// 2. Allow list (when non-empty, only listed domains pass)
    /// 3. Denied file extensions
    pub fn check(&self, url: &Url) -> Result<(), ScopeRejection> {
        let domain = extract_domain(url).ok_or(ScopeRejection::NoDomain)?;

        if matches_any(&self.deny_domains, &domain) {
            return Err(ScopeRejection::Denied);
        }

        if !self.allow_domains.is_empty() && !matches_any(&self.allow_domains, &domain) {
            return Err(ScopeRejection::NotAllowed);
        }

        if has_denied_extension(url, &self.denied_extensions) {
            return Err(ScopeRejection::DeniedExtension);
        }

        Ok(())
    }

    /// Checks a link discovered on `source` for enqueueing
    ///
    /// On top of [`ScopeRules::check`], a link to another registrable domain
    /// is rejected unless `follow-external` is set or an explicit allow list
    /// already admitted it.
    pub fn check_link(&self, url: &Url, source: &Url) -> Result<(), ScopeRejection> {
        self.check(url)?;

        if self.allow_domains.is_empty() && !self.follow_external {
            let same_site = match (registrable_domain(url), registrable_domain(source)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            if !same_site {
                return Err(ScopeRejection::External);
            }
        }

        Ok(())
    }
}
