//! Google Gemini backend (Generative Language REST API).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::generator::{GenerationError, GenerationResult, TextGenerator};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini `generateContent` client bound to one model.
pub struct GeminiGenerator {
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiGenerator {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        temperature: f32,
        timeout_secs: u64,
    ) -> GenerationResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            temperature,
            client,
            timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Join the text parts of the first candidate.
fn extract_text(body: &str) -> GenerationResult<String> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(GenerationError::ResponseParsing(reason));
    };

    Ok(candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}

impl TextGenerator for GeminiGenerator {
    fn generate(&self, system: &str, prompt: &str) -> GenerationResult<String> {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Gemini generateContent");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
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
        let text = response.text().map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout_secs)
            } else {
                GenerationError::HttpClient(e.to_string())
            }
        })?;
        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        extract_text(&text)
    }
}
