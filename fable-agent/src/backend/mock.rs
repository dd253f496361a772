//! Mock generation backend for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use super::traits::*;

/// Mock backend for testing.
///
/// Scripted FIFO responses, an optional hard-failure mode, and a record
/// of every request received, so tests can assert on the instructions
/// the gateway actually sent.
pub struct MockBackend {
    model_id: String,
    available: AtomicBool,
    fail: AtomicBool,
    responses: Mutex<VecDeque<String>>,
    default_response: String,
    call_count: AtomicU32,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            available: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            responses: Mutex::new(VecDeque::new()),
            default_response: "Mock response".to_string(),
            call_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue one scripted response. Responses are consumed in order;
    /// once the queue is drained the default response is returned.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.responses
            .lock()
            .expect("mock responses lock")
            .push_back(content.into());
        self
    }

    /// Queue several scripted responses at once.
    pub fn with_responses<I, S>(self, contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut queue = self.responses.lock().expect("mock responses lock");
            for content in contents {
                queue.push_back(content.into());
            }
        }
        self
    }

    /// Set the default response returned once the queue is drained.
    pub fn with_default(mut self, content: impl Into<String>) -> Self {
        self.default_response = content.into();
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Make every generate call fail.
    pub fn with_failure(self, fail: bool) -> Self {
        self.fail.store(fail, Ordering::SeqCst);
        self
    }

    /// Number of times generate was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("mock requests lock").clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("mock requests lock")
            .push(request);

        if !self.available.load(Ordering::SeqCst) {
            return Err(GenerationError::Unavailable(
                "Mock backend disabled".to_string(),
            ));
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(GenerationError::RequestFailed(
                "Mock backend scripted failure".to_string(),
            ));
        }

        let scripted = self
            .responses
            .lock()
            .expect("mock responses lock")
            .pop_front();

        Ok(scripted.unwrap_or_else(|| self.default_response.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_consumed_in_order() {
        let backend = MockBackend::new("test-model")
            .with_responses(["first", "second"])
            .with_default("later");

        let r1 = backend
            .generate(GenerationRequest::new("s", "a", 16))
            .await
            .unwrap();
        let r2 = backend
            .generate(GenerationRequest::new("s", "b", 16))
            .await
            .unwrap();
        let r3 = backend
            .generate(GenerationRequest::new("s", "c", 16))
            .await
            .unwrap();

        assert_eq!((r1.as_str(), r2.as_str(), r3.as_str()), ("first", "second", "later"));
        assert_eq!(backend.call_count(), 3);
        assert_eq!(backend.requests()[1].user_message, "b");
    }

    #[tokio::test]
    async fn unavailable_backend_reports_and_errors() {
        let backend = MockBackend::default().with_available(false);
        assert!(!backend.is_available().await);

        let result = backend.generate(GenerationRequest::new("s", "hi", 16)).await;
        assert!(matches!(result, Err(GenerationError::Unavailable(_))));
    }

    #[tokio::test]
    async fn failure_mode_errors_every_call() {
        let backend = MockBackend::default().with_failure(true);
        let result = backend.generate(GenerationRequest::new("s", "hi", 16)).await;
        assert!(matches!(result, Err(GenerationError::RequestFailed(_))));
    }
}
