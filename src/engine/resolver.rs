// Pagebot Engine — Remote Content Fetcher
//
// Resolves a user-supplied paste link to raw text. Strategy objects are
// tried in a fixed priority order: Pastebin (deterministic raw-content URL
// derived from the paste id) before PrivateBin (opaque URL fetched
// verbatim — the raw-content URL shape varies by self-hosted instance).
//
// No retry: a failure surfaces immediately to the invoking command. Every
// request is bounded by the client's configured timeout.

use crate::atoms::constants::HTTP_REQUEST_TIMEOUT_SECS;
use crate::atoms::error::{AddonError, AddonResult};
use async_trait::async_trait;
use log::info;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

// ── Link patterns ──────────────────────────────────────────────────────────

fn pastebin_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:https?://(?:www\.)?)?pastebin\.com/(?:raw/)?([A-Za-z0-9]+)")
            .expect("pastebin regex")
    })
}

fn privatebin_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Any scheme'd URL with a non-empty host and a paste identifier after it.
    RE.get_or_init(|| {
        Regex::new(r"^https?://[^/\s]+/\??[A-Za-z0-9_\-?=/]+$").expect("privatebin regex")
    })
}

// ── Strategy trait ─────────────────────────────────────────────────────────

#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Does this resolver recognize the link shape?
    fn matches(&self, link: &str) -> bool;

    /// Fetch the raw text behind the link.
    async fn fetch(&self, link: &str) -> AddonResult<String>;
}

// ── Pastebin ───────────────────────────────────────────────────────────────

pub struct PastebinResolver {
    client: reqwest::Client,
}

impl PastebinResolver {
    pub fn new(client: reqwest::Client) -> Self {
        PastebinResolver { client }
    }

    /// Extract the paste identifier from a pastebin.com link, accepting the
    /// bare, `www.`, and `/raw/` URL shapes with or without a scheme.
    pub fn paste_id(link: &str) -> Option<&str> {
        pastebin_re().captures(link).map(|c| c.get(1).unwrap().as_str())
    }
}

#[async_trait]
impl LinkResolver for PastebinResolver {
    fn matches(&self, link: &str) -> bool {
        Self::paste_id(link).is_some()
    }

    async fn fetch(&self, link: &str) -> AddonResult<String> {
        let id = Self::paste_id(link).ok_or_else(|| AddonError::InvalidLink(link.into()))?;
        let url = format!("https://pastebin.com/raw/{}", id);
        info!("[resolver] pastebin fetch: {}", url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(AddonError::FetchFailed {
                link: link.into(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

// ── PrivateBin ─────────────────────────────────────────────────────────────

pub struct PrivatebinResolver {
    client: reqwest::Client,
}

impl PrivatebinResolver {
    pub fn new(client: reqwest::Client) -> Self {
        PrivatebinResolver { client }
    }
}

#[async_trait]
impl LinkResolver for PrivatebinResolver {
    fn matches(&self, link: &str) -> bool {
        privatebin_re().is_match(link)
    }

    async fn fetch(&self, link: &str) -> AddonResult<String> {
        // Self-hosted instances differ in raw-URL shape; GET the supplied
        // link verbatim and let the instance answer.
        info!("[resolver] privatebin fetch: {}", link);
        let resp = self.client.get(link).send().await?;
        if !resp.status().is_success() {
            return Err(AddonError::FetchFailed {
                link: link.into(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

// ── Registry ───────────────────────────────────────────────────────────────

/// Resolvers tried in registration order; the first whose `matches` accepts
/// the link handles it. Pastebin is registered before PrivateBin so a
/// pastebin.com link never falls through to the opaque-GET path.
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn LinkResolver>>,
}

impl ResolverRegistry {
    pub fn new(client: reqwest::Client) -> Self {
        ResolverRegistry {
            resolvers: vec![
                Box::new(PastebinResolver::new(client.clone())),
                Box::new(PrivatebinResolver::new(client)),
            ],
        }
    }

    /// Build a registry from explicit strategies (tests, exotic hosts).
    pub fn with_resolvers(resolvers: Vec<Box<dyn LinkResolver>>) -> Self {
        ResolverRegistry { resolvers }
    }

    pub async fn resolve(&self, link: &str) -> AddonResult<String> {
        for resolver in &self.resolvers {
            if resolver.matches(link) {
                return resolver.fetch(link).await;
            }
        }
        Err(AddonError::InvalidLink(link.into()))
    }
}

/// Shared client for every outbound call in the crate. The request timeout
/// is the bound on all fetch/poll suspension points.
pub fn default_client() -> AddonResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .build()?)
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pastebin_link_shapes_are_recognized() {
        for link in [
            "https://pastebin.com/DiuFREBW",
            "http://pastebin.com/DiuFREBW",
            "https://www.pastebin.com/DiuFREBW",
            "pastebin.com/DiuFREBW",
            "https://pastebin.com/raw/DiuFREBW",
        ] {
            assert_eq!(PastebinResolver::paste_id(link), Some("DiuFREBW"), "{}", link);
        }
    }

    #[test]
    fn non_pastebin_links_are_not_matched() {
        assert_eq!(PastebinResolver::paste_id("https://example.com/abc"), None);
        assert_eq!(PastebinResolver::paste_id("not a link"), None);
    }

    #[test]
    fn privatebin_requires_a_schemed_url() {
        let client = reqwest::Client::new();
        let r = PrivatebinResolver::new(client);
        assert!(r.matches("https://paste.example.org/?abc123DEF"));
        assert!(r.matches("http://bin.internal/xyz_9-8"));
        assert!(!r.matches("paste.example.org/abc"));
        assert!(!r.matches("just words"));
    }

    #[tokio::test]
    async fn unrecognized_link_is_invalid_link() {
        let registry = ResolverRegistry::with_resolvers(vec![]);
        let err = registry.resolve("nothing matches this").await.unwrap_err();
        assert!(matches!(err, AddonError::InvalidLink(_)));
    }

    #[tokio::test]
    async fn registry_dispatches_to_first_match() {
        struct Fixed(&'static str);
        #[async_trait]
        impl LinkResolver for Fixed {
            fn matches(&self, link: &str) -> bool {
                link.starts_with(self.0)
            }
            async fn fetch(&self, _link: &str) -> AddonResult<String> {
                Ok(self.0.to_string())
            }
        }
        let registry = ResolverRegistry::with_resolvers(vec![
            Box::new(Fixed("a")),
            Box::new(Fixed("ab")),
        ]);
        assert_eq!(registry.resolve("abc").await.unwrap(), "a");
    }
}
