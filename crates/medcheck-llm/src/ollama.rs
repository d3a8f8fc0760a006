//! Ollama backend for local inference.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::generator::{GenerationError, GenerationResult, TextGenerator};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Ollama HTTP client bound to one model.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, temperature: f32, timeout_secs: u64) -> GenerationResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            client,
            timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl TextGenerator for OllamaGenerator {
    fn generate(&self, system: &str, prompt: &str) -> GenerationResult<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Ollama generate");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    GenerationError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout_secs)
            } else {
                GenerationError::ResponseParsing(e.to_string())
            }
        })?;

        Ok(parsed.response)
    }
}
