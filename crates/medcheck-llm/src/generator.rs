//! Text-generation seam shared by extraction and synthesis.

use std::collections::VecDeque;
use std::sync::Mutex;

use medcheck_core::StageError;
use thiserror::Error;

/// Text-generation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Cannot reach text generation service at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Text generation service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

pub type GenerationResult<T> = Result<T, GenerationError>;

impl From<GenerationError> for StageError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Timeout(secs) => StageError::Timeout(secs),
            GenerationError::ResponseParsing(msg) => StageError::Malformed(msg),
            other => StageError::Unavailable(other.to_string()),
        }
    }
}

/// Single request/response text completion.
pub trait TextGenerator {
    fn generate(&self, system: &str, prompt: &str) -> GenerationResult<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, system: &str, prompt: &str) -> GenerationResult<String> {
        (**self).generate(system, prompt)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn generate(&self, system: &str, prompt: &str) -> GenerationResult<String> {
        (**self).generate(system, prompt)
    }
}

/// Mock generator for testing. Replays scripted responses in order.
///
/// Once the script runs out the last entry repeats. Every call is recorded.
pub struct MockGenerator {
    script: Mutex<VecDeque<GenerationResult<String>>>,
    last: Mutex<Option<GenerationResult<String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockGenerator {
    pub fn scripted(responses: Vec<GenerationResult<String>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `response`.
    pub fn always(response: &str) -> Self {
        Self::scripted(vec![Ok(response.to_string())])
    }

    /// Always fail as if the service were down.
    pub fn unreachable() -> Self {
        Self::scripted(vec![Err(GenerationError::Connection(
            "http://localhost:0".to_string(),
        ))])
    }

    /// (system, prompt) of every call so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl TextGenerator for MockGenerator {
    fn generate(&self, system: &str, prompt: &str) -> GenerationResult<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((system.to_string(), prompt.to_string()));
        }

        let mut script = self
            .script
            .lock()
            .map_err(|_| GenerationError::HttpClient("mock lock poisoned".into()))?;
        let mut last = self
            .last
            .lock()
            .map_err(|_| GenerationError::HttpClient("mock lock poisoned".into()))?;

        if let Some(next) = script.pop_front() {
            *last = Some(next.clone());
            return next;
        }
        last.clone().unwrap_or_else(|| {
            Err(GenerationError::Connection("mock script is empty".into()))
        })
    }
}
