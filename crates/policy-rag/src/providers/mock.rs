//! In-crate test doubles

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::embedding::EmbeddingBackend;
use super::llm::GenerativeBackend;

/// Scripted generative backend
pub struct MockGenerative {
    replies: Mutex<VecDeque<Result<String>>>,
    pub calls: AtomicUsize,
    pub last_user: Mutex<Option<String>>,
}

impl MockGenerative {
    pub fn replying(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            last_user: Mutex::new(None),
        }
    }

    pub fn always_failing() -> Self {
        Self::replying(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeBackend for MockGenerative {
    async fn complete(&self, _system: &str, user: &str, timeout: Duration) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user.lock() = Some(user.to_string());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or(Err(Error::GenerationTimeout(timeout)))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Bag-of-letters embedder: deterministic and cheap
pub struct MockEmbedder;

pub fn letter_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
    }
    v
}

#[async_trait]
impl EmbeddingBackend for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| letter_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        26
    }

    fn name(&self) -> &str {
        "mock"
    }
}
