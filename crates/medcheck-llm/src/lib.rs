//! Text-generation stages for the medcheck pipeline.
//!
//! This crate provides the Entity Extractor and Report Synthesizer on top of a
//! small [`TextGenerator`] seam, with blocking HTTP backends for Google Gemini
//! and Ollama plus a scripted mock for tests.

pub mod config;
pub mod extraction;
pub mod gemini;
pub mod generator;
pub mod ollama;
pub mod prompts;
pub mod synthesis;

pub use config::{GeneratorConfig, Provider};
pub use extraction::{parse_drug_names, LlmExtractor};
pub use gemini::GeminiGenerator;
pub use generator::{GenerationError, GenerationResult, MockGenerator, TextGenerator};
pub use ollama::OllamaGenerator;
pub use synthesis::{LlmSynthesizer, NO_DATA_PHRASE};
