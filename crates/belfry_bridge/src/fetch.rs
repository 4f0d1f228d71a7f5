//! Fetch forwarder: the host side of the sandbox's `fetch` capability.
//!
//! The sandbox never opens a socket. It hands the host a value-copied
//! request record and receives a value-copied response record; the real
//! I/O happens behind the [`FetchBackend`] seam so it can be stubbed,
//! audited, or rate-limited.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Fetch failure reported to the sandbox as `{ok: false, error}`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Request record could not be understood
    #[error("Invalid fetch request: {0}")]
    InvalidRequest(String),

    /// Transport-level failure
    #[error("{0}")]
    Transport(String),

    /// The invocation deadline expired while the request was in flight
    #[error("fetch aborted: execution deadline exceeded")]
    DeadlineExceeded,
}

/// Value-copied request record crossing the boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Target URL
    pub url: String,
    /// HTTP method, defaults to GET
    #[serde(default = "default_method")]
    pub method: String,
    /// Request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Optional request body
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Value-copied response record crossing the boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    /// Whether the status is in the 2xx range
    pub ok: bool,
    /// HTTP status code
    pub status: u16,
    /// HTTP status text
    pub status_text: String,
    /// Response body as text
    pub body_text: String,
    /// Response headers
    pub headers: BTreeMap<String, String>,
}

/// Host-side network seam for the fetch capability
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Perform the request within the given budget.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure or budget expiry;
    /// HTTP error statuses are not errors, they are `ok: false`
    /// responses.
    async fn fetch(&self, request: FetchRequest, budget: Duration)
        -> Result<FetchResponse, FetchError>;
}

/// Default backend performing real HTTP through reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a shared connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchBackend for HttpFetcher {
    async fn fetch(
        &self,
        request: FetchRequest,
        budget: Duration,
    ) -> Result<FetchResponse, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("bad method: {}", request.method)))?;

        let mut builder = self.client.request(method, &request.url).timeout(budget);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::DeadlineExceeded
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_string(), v.to_string());
            }
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(FetchResponse {
            ok: status.is_success(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body_text,
            headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: FetchRequest =
            serde_json::from_str(r#"{"url": "https://example.com"}"#).unwrap();
        assert_eq!(req.method, "GET");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn test_request_full_shape() {
        let req: FetchRequest = serde_json::from_str(
            r#"{"url": "https://example.com", "method": "POST",
                "headers": {"content-type": "application/json"},
                "body": "{\"a\":1}"}"#,
        )
        .unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(
            req.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let resp = FetchResponse {
            ok: true,
            status: 200,
            status_text: "OK".to_string(),
            body_text: "hello".to_string(),
            headers: BTreeMap::new(),
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["statusText"], "OK");
        assert_eq!(v["bodyText"], "hello");
    }

    #[test]
    fn test_deadline_error_message() {
        let err = FetchError::DeadlineExceeded;
        assert_eq!(err.to_string(), "fetch aborted: execution deadline exceeded");
    }
}
