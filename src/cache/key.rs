//! Cache keys: endpoint + ordered parameter tuple.

use crate::source::{Endpoint, Request};

/// Identifies one subscribable query.
///
/// Two keys are equal iff the endpoint and the ordered parameters match, so
/// callers must build parameters in a stable order (the domain clients do).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: Endpoint,
    pub params: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// The GET request this key stands for.
    pub fn request(&self) -> Request {
        Request {
            endpoint: self.endpoint.clone(),
            params: self.params.clone(),
            body: None,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.request().path_and_query())
    }
}
