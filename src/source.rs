//! `RemoteDataSource`: the single-call abstraction over a network request.
//!
//! A source performs exactly one attempt per call: no retries, no caching.
//! Payloads come back as raw JSON and are checked against the caller's wire
//! schema by [`decode_json`], so malformed shapes stop here as
//! [`FetchError::Schema`] instead of reaching the cache.

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::error::FetchError;
use crate::shared::NotificationId;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// Backend endpoints consumed by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Notifications,
    NotificationRead(NotificationId),
    NotificationDismiss(NotificationId),
    CryptoLiveData,
    ClientHistory,
    DeployedStrategies,
    Role,
    /// Any other path, relative to the base URL (e.g. `"/api/health"`).
    Custom(String),
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Notifications => "/api/notifications".to_string(),
            Endpoint::NotificationRead(id) => {
                format!("/api/notifications/{}/read", urlencoding::encode(id.as_str()))
            }
            Endpoint::NotificationDismiss(id) => format!(
                "/api/notifications/{}/dismiss",
                urlencoding::encode(id.as_str())
            ),
            Endpoint::CryptoLiveData => "/api/cryptolive-data".to_string(),
            Endpoint::ClientHistory => "/api/user/client-history".to_string(),
            Endpoint::DeployedStrategies => "/api/strategies/deployed".to_string(),
            Endpoint::Role => "/api/get-role".to_string(),
            Endpoint::Custom(path) => path.clone(),
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Endpoint::NotificationRead(_) | Endpoint::NotificationDismiss(_) => Method::Post,
            _ => Method::Get,
        }
    }
}

/// One remote call: endpoint, query parameters and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub endpoint: Endpoint,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
            body: None,
        }
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> Method {
        self.endpoint.method()
    }

    /// Path plus URL-encoded query string.
    pub fn path_and_query(&self) -> String {
        let path = self.endpoint.path();
        if self.params.is_empty() {
            return path;
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", path, query)
    }
}

/// Boxed future returned by [`RemoteDataSource::fetch`].
pub type SourceFuture<'a> = BoxFuture<'a, Result<Value, FetchError>>;

/// Single-call abstraction over a network request.
///
/// Implementations make exactly one attempt and map every failure to one
/// [`FetchError`] variant. Timeouts surface as [`FetchError::Network`].
pub trait RemoteDataSource: Send + Sync {
    fn fetch(&self, request: Request) -> SourceFuture<'_>;
}

impl<S: RemoteDataSource + ?Sized> RemoteDataSource for Arc<S> {
    fn fetch(&self, request: Request) -> SourceFuture<'_> {
        (**self).fetch(request)
    }
}

/// A value that can be built from a raw payload after a schema check.
pub trait Decode: Sized {
    fn decode(payload: Value) -> Result<Self, FetchError>;
}

/// Deserializes `payload` into wire type `W`, reporting mismatches as `Schema`.
pub fn decode_json<W: DeserializeOwned>(payload: Value) -> Result<W, FetchError> {
    serde_json::from_value(payload).map_err(|e| FetchError::Schema(e.to_string()))
}

/// Fetches and decodes in one step.
pub async fn fetch_typed<T: Decode>(
    source: &dyn RemoteDataSource,
    request: Request,
) -> Result<T, FetchError> {
    let payload = source.fetch(request).await?;
    T::decode(payload)
}

/// Sends a mutation and ignores the (possibly empty) response body.
pub async fn send_mutation(
    source: &dyn RemoteDataSource,
    request: Request,
) -> Result<(), FetchError> {
    source.fetch(request).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_endpoint_paths_and_methods() {
        let id = NotificationId::from("n 1");
        assert_eq!(Endpoint::Notifications.path(), "/api/notifications");
        assert_eq!(
            Endpoint::NotificationRead(id.clone()).path(),
            "/api/notifications/n%201/read"
        );
        assert_eq!(Endpoint::NotificationDismiss(id).method(), Method::Post);
        assert_eq!(Endpoint::CryptoLiveData.method(), Method::Get);
        assert_eq!(Endpoint::Role.path(), "/api/get-role");
    }

    #[test]
    fn test_path_and_query_encodes_params() {
        let req = Request::new(Endpoint::ClientHistory)
            .param("email", "a+b@example.com")
            .param("page", 2);
        assert_eq!(
            req.path_and_query(),
            "/api/user/client-history?email=a%2Bb%40example.com&page=2"
        );
        assert_eq!(
            Request::new(Endpoint::CryptoLiveData).path_and_query(),
            "/api/cryptolive-data"
        );
    }

    #[test]
    fn test_decode_json_schema_error() {
        #[derive(Debug, Deserialize)]
        struct Row {
            #[allow(dead_code)]
            symbol: String,
        }
        let ok: Result<Vec<Row>, _> = decode_json(serde_json::json!([{"symbol": "BTC"}]));
        assert!(ok.is_ok());
        let bad: Result<Vec<Row>, _> = decode_json(serde_json::json!({"symbol": "BTC"}));
        assert!(matches!(bad, Err(FetchError::Schema(_))));
    }
}
