//! Bounded-concurrency gateway in front of the LLM backend.
//!
//! Every component talks to the LLM through this type. It enforces a
//! concurrency bound (semaphore), a per-call timeout, and a single retry at
//! equal temperature on backend failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::warn;

use crate::error::{Error, Result};

use super::client::LlmClient;
use super::types::ChatRequest;

/// Gateway wrapping a shared client.
pub struct LlmGateway {
    client: Arc<dyn LlmClient>,
    permits: Arc<Semaphore>,
    call_timeout: Duration,
}

impl LlmGateway {
    /// Create a gateway with the given concurrency bound and per-call timeout.
    pub fn new(client: Arc<dyn LlmClient>, max_concurrent: usize, call_timeout: Duration) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            call_timeout,
        }
    }

    /// Complete a chat request. Retries once on a recoverable failure; the
    /// second failure is returned to the caller, who degrades per its own
    /// fallback policy.
    pub async fn chat(&self, request: ChatRequest) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Cancelled)?;

        match self.chat_once(request.clone()).await {
            Ok(text) => Ok(text),
            Err(first) if first.is_recoverable() => {
                warn!(error = %first, "LLM call failed, retrying once");
                self.chat_once(request).await
            }
            Err(e) => Err(e),
        }
    }

    async fn chat_once(&self, request: ChatRequest) -> Result<String> {
        match timeout(self.call_timeout, self.client.chat(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(self.call_timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyClient {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn chat(&self, _request: ChatRequest) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(Error::backend("local", "connection refused"))
            } else {
                Ok("ok".to_string())
            }
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Local
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::from_prompt("system", "user")
    }

    #[tokio::test]
    async fn test_retry_once_recovers() {
        let client = Arc::new(FlakyClient {
            calls: AtomicUsize::new(0),
            fail_first: 1,
        });
        let gateway = LlmGateway::new(client.clone(), 16, Duration::from_secs(5));

        let text = gateway.chat(request()).await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_failure_surfaces() {
        let client = Arc::new(FlakyClient {
            calls: AtomicUsize::new(0),
            fail_first: 5,
        });
        let gateway = LlmGateway::new(client.clone(), 16, Duration::from_secs(5));

        let err = gateway.chat(request()).await.unwrap_err();
        assert!(err.is_recoverable());
        // one initial call + one retry, no more
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }
}
