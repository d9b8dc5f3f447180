//! Blocking HTTP transport
//!
//! Provides the [`Transport`] trait and its `reqwest` implementation. No
//! retries are attempted; a non-2xx answer surfaces as [`Error::Transport`]
//! carrying the status and the body verbatim.

use crate::http::auth::Credentials;
use crate::params::render;
use crate::{Error, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Sends one request and returns the decoded JSON answer
pub trait Transport: Send + Sync {
    /// GET sends `payload` as query parameters, POST/PUT as a JSON body,
    /// DELETE sends no body. An empty 2xx body decodes to `Null`.
    fn send(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Value>,
        credentials: &Credentials,
    ) -> Result<Value>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Whether to validate TLS certificates
    pub validate_tls: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            validate_tls: true,
        }
    }
}

/// `reqwest` backed transport with basic authentication
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new transport
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.validate_tls)
            .build()
            .map_err(|e| Error::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e.into()),
            })?;
        Ok(Self { client })
    }

    /// Create with default configuration
    pub fn with_default_config() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Value>,
        credentials: &Credentials,
    ) -> Result<Value> {
        let parsed = Url::parse(url).map_err(|e| Error::Configuration {
            message: format!("Invalid request url '{}': {}", url, e),
            source: Some(e.into()),
        })?;

        info!(method = %method, url = %parsed, "Sending request");
        if let Some(payload) = payload {
            debug!(payload = %payload, "Request payload");
        }

        let mut request = self
            .client
            .request(method.clone(), parsed)
            .header(CONTENT_TYPE, "application/json");
        if !credentials.is_anonymous() {
            request = request.basic_auth(&credentials.login, Some(&credentials.password));
        }

        if let Some(payload) = payload {
            if method == Method::GET {
                request = request.query(&query_pairs(payload));
            } else if method != Method::DELETE {
                request = request.json(payload);
            }
        }

        let response = request.send().map_err(|e| transport_error(url, e))?;
        let status = response.status();
        let body = response.text().map_err(|e| transport_error(url, e))?;
        debug!(status = status.as_u16(), bytes = body.len(), "Response received");

        if !status.is_success() {
            return Err(Error::Transport {
                message: body,
                url: url.to_string(),
                status_code: Some(status.as_u16()),
                source: None,
            });
        }

        decode_body(&body).map_err(|e| Error::Transport {
            message: format!("Failed to parse response as JSON: {}", e),
            url: url.to_string(),
            status_code: Some(status.as_u16()),
            source: Some(e.into()),
        })
    }
}

/// Decode a response body; blank bodies are `Null`
pub fn decode_body(body: &str) -> std::result::Result<Value, serde_json::Error> {
    if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(body)
    }
}

// Null parameters are not sent.
fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    payload
        .as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(name, value)| (name.clone(), render(value)))
                .collect()
        })
        .unwrap_or_default()
}

fn transport_error(url: &str, err: reqwest::Error) -> Error {
    Error::Transport {
        message: err.to_string(),
        url: url.to_string(),
        status_code: err.status().map(|s| s.as_u16()),
        source: Some(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_empty_body() {
        assert_eq!(decode_body("").unwrap(), Value::Null);
        assert_eq!(decode_body("  \n").unwrap(), Value::Null);
        assert_eq!(decode_body(r#"{"id": "10"}"#).unwrap(), json!({"id": "10"}));
        assert!(decode_body("<html>").is_err());
    }

    #[test]
    fn test_query_pairs() {
        let pairs = query_pairs(&json!({"jql": "sprint = 7", "startAt": 0, "skip": null}));
        assert_eq!(
            pairs,
            vec![
                ("jql".to_string(), "sprint = 7".to_string()),
                ("startAt".to_string(), "0".to_string()),
            ]
        );
        assert!(query_pairs(&json!("x")).is_empty());
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let transport = HttpTransport::with_default_config().unwrap();
        let err = transport
            .send(Method::GET, "not a url", None, &Credentials::default())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
