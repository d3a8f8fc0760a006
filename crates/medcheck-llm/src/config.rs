//! Text-generation backend configuration.
//!
//! Resolved once at startup, then turned into a boxed [`TextGenerator`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::gemini::{GeminiGenerator, GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL};
use crate::generator::{GenerationError, TextGenerator};
use crate::ollama::{OllamaGenerator, OLLAMA_BASE_URL};

pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown text generation provider: {0} (expected gemini or ollama)")]
    UnknownProvider(String),

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("GEMINI_API_KEY is required for the gemini provider")]
    MissingApiKey,

    #[error(transparent)]
    Client(#[from] GenerationError),
}

/// Hosted or local backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Gemini,
    Ollama,
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "ollama" => Ok(Provider::Ollama),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    provider: Provider,
    model: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: u64,
    temperature: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            base_url: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl GeneratorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(provider) = get("MEDCHECK_LLM_PROVIDER") {
            config.provider = provider.parse()?;
        }
        config.model = get("MEDCHECK_LLM_MODEL");
        config.base_url = get("MEDCHECK_LLM_URL");
        config.api_key = get("GEMINI_API_KEY");
        if let Some(raw) = get("MEDCHECK_LLM_TIMEOUT_SECS") {
            config.timeout_secs = match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "MEDCHECK_LLM_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Model name, falling back to the provider default.
    pub fn model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model.as_str(),
            (None, Provider::Gemini) => GEMINI_DEFAULT_MODEL,
            (None, Provider::Ollama) => DEFAULT_OLLAMA_MODEL,
        }
    }

    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url.as_str(),
            (None, Provider::Gemini) => GEMINI_BASE_URL,
            (None, Provider::Ollama) => OLLAMA_BASE_URL,
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Build the configured backend.
    pub fn connect(&self) -> Result<Box<dyn TextGenerator + Send + Sync>, ConfigError> {
        tracing::info!(provider = %self.provider, model = self.model(), "Configuring text generator");
        match self.provider {
            Provider::Gemini => {
                let key = self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)?;
                Ok(Box::new(GeminiGenerator::new(
                    self.base_url(),
                    self.model(),
                    key,
                    self.temperature,
                    self.timeout_secs,
                )?))
            }
            Provider::Ollama => Ok(Box::new(OllamaGenerator::new(
                self.base_url(),
                self.model(),
                self.temperature,
                self.timeout_secs,
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.provider(), Provider::Gemini);
        assert_eq!(config.model(), "gemini-2.0-flash");
        assert_eq!(config.timeout_secs(), 120);
        assert!((config.temperature() - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ollama_from_env() {
        let config = GeneratorConfig::from_lookup(lookup(&[
            ("MEDCHECK_LLM_PROVIDER", "Ollama"),
            ("MEDCHECK_LLM_URL", "http://gpu-box:11434"),
            ("MEDCHECK_LLM_TIMEOUT_SECS", "300"),
        ]))
        .unwrap();
        assert_eq!(config.provider(), Provider::Ollama);
        assert_eq!(config.model(), DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.base_url(), "http://gpu-box:11434");
        assert_eq!(config.timeout_secs(), 300);
        assert!(config.connect().is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        let err = GeneratorConfig::from_lookup(lookup(&[("MEDCHECK_LLM_PROVIDER", "gpt")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(p) if p == "gpt"));
    }

    #[test]
    fn test_bad_timeout() {
        for value in ["0", "soon"] {
            let err =
                GeneratorConfig::from_lookup(lookup(&[("MEDCHECK_LLM_TIMEOUT_SECS", value)]))
                    .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidNumber { .. }));
        }
    }

    #[test]
    fn test_gemini_requires_key() {
        let config = GeneratorConfig::default();
        assert!(matches!(config.connect(), Err(ConfigError::MissingApiKey)));
        assert!(config.with_api_key("secret").connect().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = GeneratorConfig::default()
            .with_provider(Provider::Ollama)
            .with_model("qwen2.5")
            .with_base_url("http://127.0.0.1:11434");
        assert_eq!(config.model(), "qwen2.5");
        assert_eq!(config.base_url(), "http://127.0.0.1:11434");
    }
}
