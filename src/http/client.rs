//! Low-level HTTP transport: `DashboardHttp`.
//!
//! Implements [`RemoteDataSource`] over `reqwest`: one attempt per call,
//! bounded by the client timeout. Retrying is the cache layer's job.

use crate::error::{FetchError, SyncError};
use crate::source::{Method, RemoteDataSource, Request, SourceFuture};

use async_lock::RwLock;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client for the dashboard REST API.
pub struct DashboardHttp {
    base_url: String,
    client: Client,
    /// Bearer token supplied by the auth layer, if any. Never exposed publicly.
    auth_token: Arc<RwLock<Option<String>>>,
}

impl DashboardHttp {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            auth_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().await = token;
    }

    pub async fn clear_auth_token(&self) {
        *self.auth_token.write().await = None;
    }

    pub(crate) fn url_for(&self, request: &Request) -> String {
        format!("{}{}", self.base_url, request.path_and_query())
    }

    async fn do_request(&self, request: Request) -> Result<Value, FetchError> {
        let url = self.url_for(&request);
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        tracing::trace!(%method, url = %url, "Sending request");

        let mut req = self.client.request(method, &url);
        if let Some(token) = self.auth_token.read().await.as_ref() {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        parse_body(&text)
    }
}

/// Empty bodies (mutation acks) decode as `null`.
fn parse_body(text: &str) -> Result<Value, FetchError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| FetchError::Schema(format!("invalid JSON body: {}", e)))
}

impl RemoteDataSource for DashboardHttp {
    fn fetch(&self, request: Request) -> SourceFuture<'_> {
        Box::pin(self.do_request(request))
    }
}

impl Clone for DashboardHttp {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            auth_token: self.auth_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Endpoint;

    #[test]
    fn test_url_for_joins_base_and_query() {
        let http = DashboardHttp::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(http.base_url(), "http://localhost:8000");
        let req = Request::new(Endpoint::Role).param("email", "x@y.z");
        assert_eq!(
            http.url_for(&req),
            "http://localhost:8000/api/get-role?email=x%40y.z"
        );
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body("").unwrap(), Value::Null);
        assert_eq!(parse_body(" \n").unwrap(), Value::Null);
        assert_eq!(parse_body("[1]").unwrap(), serde_json::json!([1]));
        assert!(matches!(parse_body("<html>"), Err(FetchError::Schema(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let http = DashboardHttp::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = http
            .fetch(Request::new(Endpoint::CryptoLiveData))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
