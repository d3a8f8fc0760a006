//! Medcheck Core Library
//!
//! Drug-interaction analysis for a patient profile and a free-text question.
//!
//! # Architecture
//!
//! ```text
//! PatientContext + question
//!          │
//!          ▼
//!   Entity Extractor ──(text generation)──► drug names
//!          │
//!          ▼
//!    Name Resolver ──(PubChem, bounded fan-out)──► ResolvedDrug
//!          │
//!          ▼
//!    Pair Generator ──► unordered, deduplicated DrugPair set
//!          │
//!          ▼
//!  Interaction Store ──(SQLite, both orientations)──► Finding
//!          │
//!          ▼
//!  Report Synthesizer ──(text generation)──► narrative
//!          │
//!          ▼
//!   PipelineResult: Done(Report) | Failed(PipelineFailure)
//! ```
//!
//! # Modules
//!
//! - [`models`]: Domain types (PatientContext, ResolvedDrug, DrugPair, Finding, Report)
//! - [`resolver`]: Name resolution seam, PubChem client, normalization
//! - [`pairing`]: Unordered pair generation
//! - [`db`]: SQLite interaction store
//! - [`pipeline`]: Stage orchestration and failure policy
//! - [`config`]: Startup configuration

pub mod config;
pub mod db;
pub mod models;
pub mod pairing;
pub mod pipeline;
pub mod resolver;

// Re-export commonly used types
pub use config::{ConfigError, PipelineConfig};
pub use db::{Database, DbError, InteractionStore, SqliteInteractionStore};
pub use models::{
    Diagnostic, DiagnosticKind, DrugName, DrugPair, Finding, PatientContext, PatientProfile,
    PipelineFailure, PipelineResult, Report, ResolutionStatus, ResolvedDrug, Sex, Stage,
    ValidationError,
};
pub use pairing::generate_pairs;
pub use pipeline::{EntityExtractor, Pipeline, ReportSynthesizer, StageError};
pub use resolver::{resolve_all, NameResolver, PubChemResolver, ResolverError};
