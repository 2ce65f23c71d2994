// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET transport.
///
/// A non-2xx answer is still `Ok`; only transport failures are errors.
pub trait HttpFetch {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse>;
}

/// `reqwest` blocking client carrying the canonical header set.
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(config)?,
        })
    }
}

impl HttpFetch for HttpClient {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse> {
        let response = self.client.get(url).query(query).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}

/// Create a configured blocking HTTP client.
///
/// Accept-Encoding is added by reqwest for the enabled decoders.
pub fn create_client(config: &HttpConfig) -> Result<reqwest::blocking::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, header_value("accept", &config.accept)?);
    headers.insert(
        ACCEPT_LANGUAGE,
        header_value("accept_language", &config.accept_language)?,
    );

    let client = reqwest::blocking::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::config(format!("invalid http.{name} header: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_from_default_config() {
        assert!(HttpClient::new(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn invalid_header_is_config_error() {
        let config = HttpConfig {
            accept: "bad\nvalue".into(),
            ..HttpConfig::default()
        };
        assert!(matches!(create_client(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn success_range() {
        let ok = HttpResponse {
            status: 204,
            body: String::new(),
        };
        let limited = HttpResponse {
            status: 429,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!limited.is_success());
    }
}
