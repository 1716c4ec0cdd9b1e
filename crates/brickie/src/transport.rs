//! Network seam for the fetch brick.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// One outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".to_string(), url: url.into(), headers: BTreeMap::new(), body: None }
    }

    /// Methods that carry a body.
    pub fn is_mutating(method: &str) -> bool {
        matches!(method.to_ascii_uppercase().as_str(), "POST" | "PUT" | "PATCH" | "DELETE")
    }
}

/// A completed response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub data: Value,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self { status: 200, status_text: "OK".to_string(), data }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("no transport configured")]
    Unavailable,
    #[error("network error: {0}")]
    Network(String),
    #[error("server answered {status} {status_text}")]
    Status { status: u16, status_text: String, data: Value },
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// The value bound into scope when a fetch fails.
    pub fn to_json(&self) -> Value {
        match self {
            TransportError::Status { status, status_text, data } => json!({
                "message": self.to_string(),
                "status": status,
                "statusText": status_text,
                "data": data,
            }),
            other => json!({ "message": other.to_string() }),
        }
    }
}

/// Called exactly once with the outcome of a request.
pub type Completion = Box<dyn FnOnce(Result<Response, TransportError>)>;

/// Issues requests on behalf of fetch bricks.
///
/// `send` must not block: the render pass that mounts a fetch brick keeps
/// going while the request is in flight. Implementations call `done` later,
/// on the thread that owns the brick tree, typically from the host's event
/// loop. Calling it synchronously from inside `send` is allowed.
pub trait Transport {
    fn send(&self, request: Request, done: Completion);
}
