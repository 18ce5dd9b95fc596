//! Generative backend trait consumed by field extraction and decisions

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::error::{Error, Result};

/// Trait for chat-style text generation
///
/// Implementations:
/// - `OpenAiCompatClient`: OpenAI-compatible chat completions (Groq by default)
/// - `OllamaClient`: local Ollama server
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Complete a system + user prompt pair
    ///
    /// Must give up after `timeout` with `Error::GenerationTimeout`.
    async fn complete(&self, system: &str, user: &str, timeout: Duration) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// Run a generation future under a hard deadline
pub async fn with_deadline<F, T>(timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::GenerationTimeout(timeout)),
    }
}

/// Retry a request with exponential backoff (1s, 2s, 4s, ...)
pub async fn retry_request<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                last_error = Some(e);
                if attempt < max_retries {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}), retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
}

/// Map a transport error, keeping timeouts distinguishable
pub(crate) fn request_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::GenerationTimeout(timeout)
    } else {
        Error::llm(format!("Generation request failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_deadline_elapses() {
        let result: Result<()> = with_deadline(Duration::from_millis(10), async {
            sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::GenerationTimeout(_))));
    }

    #[tokio::test]
    async fn test_retry_stops_on_success() {
        let calls = AtomicU32::new(0);
        let result = retry_request(0, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>("done")
        })
        .await;
        assert_eq!(tokio_test::assert_ok!(result), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_request(2, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::llm(format!("attempt {}", n)))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(Error::Llm(msg)) if msg == "attempt 2"));
    }
}
