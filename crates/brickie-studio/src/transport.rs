use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context as _;
use brickie::transport::Completion;
use brickie::{Request, Response, Transport, TransportError};
use serde_json::Value;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

type Outcome = (u64, Result<Response, TransportError>);

/// HTTP transport for fetch bricks.
///
/// Requests run on a small tokio runtime. Their outcomes come back over a
/// channel and completions run on the calling thread, inside [`pump`] or
/// [`wait`], never on a runtime worker.
///
/// [`pump`]: HttpTransport::pump
/// [`wait`]: HttpTransport::wait
pub struct HttpTransport {
    runtime:  Runtime,
    client:   reqwest::Client,
    sender:   mpsc::UnboundedSender<Outcome>,
    receiver: RefCell<mpsc::UnboundedReceiver<Outcome>>,
    pending:  RefCell<HashMap<u64, Completion>>,
    next_id:  Cell<u64>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("brickie-http")
            .enable_all()
            .build()
            .context("failed to start the HTTP runtime")?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build the HTTP client")?;
        let (sender, receiver) = mpsc::unbounded_channel();
        Ok(Self {
            runtime,
            client,
            sender,
            receiver: RefCell::new(receiver),
            pending:  RefCell::new(HashMap::new()),
            next_id:  Cell::new(0),
        })
    }

    /// Requests sent whose completion has not run yet.
    pub fn in_flight(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Run the completions of every request that has already finished.
    pub fn pump(&self) -> usize {
        let mut completed = 0;
        loop {
            let outcome = self.receiver.borrow_mut().try_recv();
            match outcome {
                Ok(outcome) => {
                    self.complete(outcome);
                    completed += 1;
                }
                Err(_) => return completed,
            }
        }
    }

    /// Block until at least one request finishes or `timeout` passes, then
    /// run every available completion.
    pub fn wait(&self, timeout: Duration) -> usize {
        let first = {
            let mut receiver = self.receiver.borrow_mut();
            self.runtime.block_on(async { tokio::time::timeout(timeout, receiver.recv()).await })
        };
        match first {
            Ok(Some(outcome)) => {
                self.complete(outcome);
                1 + self.pump()
            }
            _ => 0,
        }
    }

    fn complete(&self, (id, result): Outcome) {
        // Take the completion out before calling it; it may send again.
        let done = self.pending.borrow_mut().remove(&id);
        match done {
            Some(done) => done(result),
            None => log::warn!("response for unknown request #{}", id),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: Request, done: Completion) {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.pending.borrow_mut().insert(id, done);

        log::info!("#{} {} {}", id, request.method, request.url);
        let client = self.client.clone();
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let result = execute(&client, request).await;
            // The receiver only goes away with the transport itself.
            let _ = sender.send((id, result));
        });
    }
}

async fn execute(client: &reqwest::Client, request: Request) -> Result<Response, TransportError> {
    let method = reqwest::Method::from_bytes(request.method.as_bytes())
        .map_err(|e| TransportError::Network(format!("bad method '{}': {}", request.method, e)))?;
    let mut builder = client.request(method, &request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }
    if let Some(body) = &request.body {
        builder = builder.json(body);
    }

    let response = builder.send().await.map_err(|e| TransportError::Network(e.to_string()))?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = response.text().await.map_err(|e| TransportError::Network(e.to_string()))?;
    let data = decode_body(content_type.as_deref(), text)?;
    let status_text = status.canonical_reason().unwrap_or_default().to_string();

    if !status.is_success() {
        return Err(TransportError::Status { status: status.as_u16(), status_text, data });
    }
    Ok(Response { status: status.as_u16(), status_text, data })
}

/// JSON bodies are parsed; anything else is kept as a string.
fn decode_body(content_type: Option<&str>, text: String) -> Result<Value, TransportError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    let declared_json = content_type.is_some_and(|ct| ct.contains("json"));
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(e) if declared_json => Err(TransportError::Decode(e.to_string())),
        Err(_) => Ok(Value::String(text)),
    }
}
