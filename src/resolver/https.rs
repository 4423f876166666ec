//! `https://` resolver - plain HTTP GET.
//!
//! Fetches the document behind the URL with the request headers from the
//! global config (for API tokens and content negotiation). Responses are
//! cached per URL for the run, including negative entries, so entities
//! sharing a reference cost one request. Not versioning-capable.

use super::{Content, UrlResolver};
use crate::utils::redact_url;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use tracing::warn;

/// Resolver for the `https` scheme.
pub struct HttpsResolver {
    client: reqwest::Client,
    headers: HeaderMap,
    cache: DashMap<String, Option<Content>>,
}

impl HttpsResolver {
    /// Creates the resolver with the configured request headers. Header
    /// pairs that are not valid HTTP are skipped with a warning rather than
    /// failing the run.
    pub fn new(headers: HashMap<String, String>) -> Self {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    header_map.insert(name, value);
                }
                _ => warn!("Ignoring invalid HTTPS header from config: {name}"),
            }
        }
        Self {
            client: reqwest::Client::new(),
            headers: header_map,
            cache: DashMap::new(),
        }
    }

    async fn fetch(&self, url: &str) -> Option<Content> {
        let response = match self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("{}: {}", e, redact_url(url));
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("{}: {}", status, redact_url(url));
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => Some(Content::Plain {
                content: Some(bytes.to_vec()),
            }),
            Err(e) => {
                warn!("{}: {}", e, redact_url(url));
                None
            }
        }
    }
}

#[async_trait]
impl UrlResolver for HttpsResolver {
    async fn resolve(&self, url: &str) -> Result<Option<Content>> {
        if let Some(cached) = self.cache.get(url) {
            return Ok(cached.clone());
        }
        let fetched = self.fetch(url).await;
        self.cache.insert(url.to_string(), fetched.clone());
        Ok(fetched)
    }
}
