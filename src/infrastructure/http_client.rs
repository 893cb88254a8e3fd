//! HTTP page fetcher for the marketplace statistics API
//!
//! One GET per page with a configurable browser-like header set, a fixed
//! request timeout and, unless disabled in configuration, no TLS certificate
//! validation. Retries are decided by [`RetryPolicy`]; the default policy
//! makes exactly one attempt.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, CACHE_CONTROL, CONNECTION, HeaderMap, HeaderValue, USER_AGENT,
};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::FetchError;
use crate::domain::job::JobDescriptor;
use crate::domain::page::RawPage;
use crate::domain::services::PageFetcher;
use crate::infrastructure::config::{ApiConfig, ClientHeaders};
use crate::infrastructure::retry_policy::RetryPolicy;

/// Longest body excerpt quoted in an `InvalidBody` error
const BODY_EXCERPT_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct MarketplaceClient {
    client: Client,
    retry_policy: RetryPolicy,
}

impl MarketplaceClient {
    pub fn from_api_config(config: &ApiConfig, retry_policy: RetryPolicy) -> Result<Self> {
        let headers = build_headers(&config.headers)?;

        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for the marketplace API");
        }

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            retry_policy,
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    async fn fetch_once(&self, job: &JobDescriptor, page: u32) -> Result<RawPage, FetchError> {
        let response = self
            .client
            .get(&job.endpoint_url)
            .query(&job.query(page))
            .send()
            .await
            // the URL carries the API key
            .map_err(|e| FetchError::connection_failed(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::connection_failed(e.without_url().to_string()))?;

        serde_json::from_slice::<RawPage>(&body).map_err(|e| FetchError::InvalidBody {
            message: format!("{e}; body starts with {:?}", excerpt(&body)),
        })
    }
}

#[async_trait]
impl PageFetcher for MarketplaceClient {
    async fn fetch_page(&self, job: &JobDescriptor, page: u32) -> Result<RawPage, FetchError> {
        let mut attempt = 1;
        loop {
            debug!("GET {} page {} (attempt {})", job.endpoint_url, page, attempt);
            match self.fetch_once(job, page).await {
                Ok(raw) => return Ok(raw),
                Err(e) if self.retry_policy.should_retry(&e, attempt) => {
                    let delay = self.retry_policy.delay_after(attempt);
                    warn!(
                        "{} page {} attempt {}/{} failed: {}; retrying in {:?}",
                        job.kind, page, attempt, self.retry_policy.max_attempts, e, delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn build_headers(headers: &ClientHeaders) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in [
        (USER_AGENT, &headers.user_agent),
        (ACCEPT, &headers.accept),
        (CACHE_CONTROL, &headers.cache_control),
        (ACCEPT_ENCODING, &headers.accept_encoding),
        (CONNECTION, &headers.connection),
    ] {
        if value.is_empty() {
            continue;
        }
        let parsed = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header {name}: {value:?}"))?;
        map.insert(name, parsed);
    }
    Ok(map)
}

fn excerpt(body: &[u8]) -> String {
    String::from_utf8_lossy(body).chars().take(BODY_EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers_are_all_set() {
        let map = build_headers(&ClientHeaders::default()).unwrap();
        assert_eq!(map.get(USER_AGENT).unwrap(), "PostmanRuntime/7.51.1");
        assert_eq!(map.get(ACCEPT).unwrap(), "*/*");
        assert_eq!(map.get(CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(map.get(ACCEPT_ENCODING).unwrap(), "gzip, deflate, br");
        assert_eq!(map.get(CONNECTION).unwrap(), "keep-alive");
    }

    #[test]
    fn test_empty_header_values_are_skipped() {
        let headers = ClientHeaders {
            connection: String::new(),
            ..ClientHeaders::default()
        };
        let map = build_headers(&headers).unwrap();
        assert!(map.get(CONNECTION).is_none());
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let headers = ClientHeaders {
            user_agent: "bad\nagent".into(),
            ..ClientHeaders::default()
        };
        assert!(build_headers(&headers).is_err());
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let body = "x".repeat(1_000);
        assert_eq!(excerpt(body.as_bytes()).len(), BODY_EXCERPT_LEN);
    }
}
