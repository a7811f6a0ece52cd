//! Test providers: mock `CompletionProvider` implementations for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use odyssey_core::provider::{
    CompletionProvider, CompletionRequest, ProviderError, ProviderErrorKind,
};

/// A provider that answers from a queue of canned results and records every
/// request it receives. Once the queue is drained it fails with
/// `MalformedResponse` so an unexpected extra call is visible in tests.
#[derive(Debug)]
pub struct StubProvider {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubProvider {
    /// Answers successive calls with `responses`, in order.
    #[must_use]
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    /// Answers successive calls with `results`, which may include failures.
    #[must_use]
    pub fn with_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<String, ProviderError>>,
    {
        Self {
            responses: Mutex::new(results.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all requests received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(ProviderError::new(
                ProviderErrorKind::MalformedResponse,
                "stub provider has no more responses",
            ))
        })
    }
}

/// A provider that always fails with the given kind.
#[derive(Debug)]
pub struct FailingProvider(pub ProviderErrorKind);

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        Err(ProviderError::new(self.0, "connection refused"))
    }
}

/// A provider that sleeps before answering. Used to exercise timeouts.
#[derive(Debug)]
pub struct SlowProvider {
    /// How long each call takes.
    pub delay: Duration,
    /// What each call eventually returns.
    pub response: String,
}

#[async_trait]
impl CompletionProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.response.clone())
    }
}
