//! Mock completion backend for testing.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;

use super::{CompletionBackend, CompletionRequest};
use crate::error::LlmError;

type Responder = dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync;

/// A hand-rolled mock implementing [`CompletionBackend`] for tests.
///
/// Responses come from a closure over the request, so tests can answer per
/// stage. Every request is recorded for later inspection.
pub struct MockLlm {
    responder: Box<Responder>,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
    call_count: AtomicUsize,
}

impl MockLlm {
    /// Create a mock that answers every request with `responder`.
    pub fn new(
        responder: impl Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: None,
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock that answers `"<stage> output"` for every stage.
    pub fn echo_stage() -> Self {
        Self::new(|request| Ok(format!("{} output", request.stage)))
    }

    /// Set simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `complete()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request for `stage`.
    pub fn request_for(&self, stage: &str) -> Option<CompletionRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.stage == stage)
            .cloned()
    }
}

impl CompletionBackend for MockLlm {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String, LlmError>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            response
        })
    }
}
