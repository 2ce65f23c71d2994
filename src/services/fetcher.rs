// src/services/fetcher.rs

//! Rate-limited document fetching.
//!
//! Every request goes through the adaptive limiter first; the outcome of
//! each request is reported on the next call to the same domain.

use std::collections::HashMap;

use scraper::Html;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::rate_limiter::{AdaptiveRateLimiter, Outcome};
use crate::utils::http::{HttpClient, HttpFetch};

pub struct Fetcher {
    http: Box<dyn HttpFetch>,
    limiter: AdaptiveRateLimiter,
    pending: HashMap<String, Outcome>,
}

impl Fetcher {
    pub fn new(http: Box<dyn HttpFetch>, limiter: AdaptiveRateLimiter) -> Self {
        Self {
            http,
            limiter,
            pending: HashMap::new(),
        }
    }

    /// Live HTTP client paced by the configured rate limits.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = HttpClient::new(&config.http)?;
        Ok(Self::new(
            Box::new(http),
            AdaptiveRateLimiter::new(config.rate_limits.clone()),
        ))
    }

    pub fn limiter(&self) -> &AdaptiveRateLimiter {
        &self.limiter
    }

    pub fn limiter_mut(&mut self) -> &mut AdaptiveRateLimiter {
        &mut self.limiter
    }

    /// Fetch a body. Non-2xx answers become [`AppError::Status`].
    pub fn get_text(&mut self, domain: &str, url: &str, query: &[(&str, String)]) -> Result<String> {
        let previous = self.pending.remove(domain);
        self.limiter.throttle(domain, previous);

        match self.http.get(url, query) {
            Ok(response) => {
                self.pending
                    .insert(domain.to_string(), Outcome::from_status(response.status));
                if !response.is_success() {
                    return Err(AppError::Status {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                Ok(response.body)
            }
            Err(e) => {
                self.pending
                    .insert(domain.to_string(), Outcome::transport_failure());
                Err(e)
            }
        }
    }

    pub fn get_json(&mut self, domain: &str, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let body = self.get_text(domain, url, query)?;
        Ok(serde_json::from_str(&body)?)
    }

    pub fn get_html(&mut self, domain: &str, url: &str) -> Result<Html> {
        let body = self.get_text(domain, url, &[])?;
        Ok(Html::parse_document(&body))
    }

    /// [`Fetcher::get_json`] for a primary fetch.
    ///
    /// Transient failures are retried up to `retry_count` times, each retry
    /// paced by the limiter's backoff. Anything else fails immediately.
    pub fn get_json_with_retry(
        &mut self,
        domain: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value> {
        let retries = self.limiter.retry_count();
        let mut attempt = 0;
        loop {
            match self.get_json(domain, url, query) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < retries => {
                    attempt += 1;
                    log::warn!("Transient failure on {} ({}), retry {}/{}", url, e, attempt, retries);
                }
                Err(e) => return Err(e),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::{StubHttp, stub_fetcher};
    use super::*;
    use crate::models::ESPN_DOMAIN;

    #[test]
    fn non_success_status_is_an_error_and_feeds_the_limiter() {
        let stub = StubHttp::new();
        stub.route("https://x/a", 503, "")
            .route("https://x/a", 200, "{}");
        let (mut fetcher, clock) = stub_fetcher(&stub);

        let err = fetcher.get_json(ESPN_DOMAIN, "https://x/a", &[]).unwrap_err();
        assert_eq!(err.status_code(), Some(503));

        let value = fetcher.get_json(ESPN_DOMAIN, "https://x/a", &[]).unwrap();
        assert!(value.is_object());
        assert_eq!(fetcher.limiter().consecutive_errors(ESPN_DOMAIN), 1);
        // base 1s × 2^1
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn retry_recovers_from_transient_failures() {
        let stub = StubHttp::new();
        stub.route("https://x/s?year=2023", 429, "")
            .route("https://x/s?year=2023", 502, "")
            .route("https://x/s?year=2023", 200, r#"{"events":[]}"#);
        let (mut fetcher, _) = stub_fetcher(&stub);

        let value = fetcher
            .get_json_with_retry(ESPN_DOMAIN, "https://x/s", &[("year", "2023".into())])
            .unwrap();
        assert!(value["events"].is_array());
        assert_eq!(stub.calls().len(), 3);
    }

    #[test]
    fn retry_gives_up_on_permanent_failures() {
        let stub = StubHttp::new();
        let (mut fetcher, _) = stub_fetcher(&stub);
        let err = fetcher
            .get_json_with_retry(ESPN_DOMAIN, "https://x/missing", &[])
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(stub.calls().len(), 1);
    }

    #[test]
    fn retry_is_bounded() {
        let stub = StubHttp::new();
        stub.route("https://x/down", 503, "");
        let (mut fetcher, _) = stub_fetcher(&stub);
        assert!(fetcher.get_json_with_retry(ESPN_DOMAIN, "https://x/down", &[]).is_err());
        // one attempt plus retry_count (3) retries
        assert_eq!(stub.calls().len(), 4);
    }

    #[test]
    fn malformed_json_is_a_parse_failure() {
        let stub = StubHttp::new();
        stub.route("https://x/bad", 200, "not json");
        let (mut fetcher, _) = stub_fetcher(&stub);
        let err = fetcher.get_json(ESPN_DOMAIN, "https://x/bad", &[]).unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
        assert!(!err.is_transient());
    }
}
