//! Scripted in-memory source shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::source::{decode_json, Decode, RemoteDataSource, Request, SourceFuture};

struct Scripted {
    delay: Duration,
    result: Result<Value, FetchError>,
}

#[derive(Default)]
struct ScriptState {
    scripts: HashMap<String, VecDeque<Scripted>>,
    requests: Vec<Request>,
}

/// Replays queued responses per endpoint path, in order.
#[derive(Clone, Default)]
pub(crate) struct ScriptedSource {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, path: &str, delay: Duration, result: Result<Value, FetchError>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(path.to_string())
            .or_default()
            .push_back(Scripted { delay, result });
    }

    pub fn push_ok(&self, path: &str, value: Value) {
        self.push(path, Duration::ZERO, Ok(value));
    }

    pub fn push_delayed_ok(&self, path: &str, value: Value, delay: Duration) {
        self.push(path, delay, Ok(value));
    }

    pub fn push_err(&self, path: &str, err: FetchError) {
        self.push(path, Duration::ZERO, Err(err));
    }

    pub fn push_delayed_err(&self, path: &str, err: FetchError, delay: Duration) {
        self.push(path, delay, Err(err));
    }

    /// Number of calls made to `path`.
    pub fn calls(&self, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.endpoint.path() == path)
            .count()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl RemoteDataSource for ScriptedSource {
    fn fetch(&self, request: Request) -> SourceFuture<'_> {
        let path = request.endpoint.path();
        let scripted = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request);
            state.scripts.get_mut(&path).and_then(|q| q.pop_front())
        };
        Box::pin(async move {
            let Some(Scripted { delay, result }) = scripted else {
                return Err(FetchError::Network(format!("no scripted response for {}", path)));
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

/// Minimal cacheable value.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub(crate) struct Count(pub i64);

impl Decode for Count {
    fn decode(payload: Value) -> Result<Self, FetchError> {
        decode_json(payload)
    }
}
