use async_trait::async_trait;
use serde_json::Value;

use super::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One remote mutation, described up front so it can be dispatched later.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RemoteCall {
    pub fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
        }
    }
}

/// A single async request with one success and one failure outcome.
///
/// Success carries the envelope's `data` payload (`Value::Null` when absent).
/// Timeouts and retries are the implementor's business; callers only see
/// success or failure.
#[async_trait]
pub trait RemoteCaller: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;
}
