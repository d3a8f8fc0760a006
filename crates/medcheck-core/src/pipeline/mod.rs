//! Drug-interaction pipeline orchestrator.
//!
//! Coordinates: extract → resolve → pair → look up → synthesize.
//!
//! Stages run strictly in order. Empty output from any stage moves the state
//! machine forward; only a failed extraction or synthesis call is terminal.
//! Per-name and per-pair failures are absorbed into diagnostics.

use thiserror::Error;
use uuid::Uuid;

use crate::db::InteractionStore;
use crate::models::{
    findings_digest, Diagnostic, DiagnosticKind, DrugName, Finding, PatientContext,
    PipelineFailure, PipelineResult, Report, ResolutionStatus, Stage,
};
use crate::pairing::generate_pairs;
use crate::resolver::{is_grounded, resolve_all, NameResolver};

/// Failure of a text-generation stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("text generation unavailable: {0}")]
    Unavailable(String),

    #[error("text generation timed out after {0}s")]
    Timeout(u64),

    #[error("unusable text generation output: {0}")]
    Malformed(String),
}

/// Derives candidate drug names from patient context and question.
///
/// Unparsable model output must come back as an empty list, not an error.
pub trait EntityExtractor {
    fn extract(&self, context: &PatientContext, question: &str) -> Result<Vec<DrugName>, StageError>;
}

/// Turns findings into the patient-facing narrative.
pub trait ReportSynthesizer {
    fn synthesize(
        &self,
        findings: &[Finding],
        context: &PatientContext,
        question: &str,
    ) -> Result<String, StageError>;
}

/// Tracks the state machine and diagnostics of one invocation.
struct Run {
    request_id: Uuid,
    stage: Stage,
    diagnostics: Vec<Diagnostic>,
}

impl Run {
    fn start() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            stage: Stage::Extracting,
            diagnostics: Vec::new(),
        }
    }

    fn advance(&mut self) {
        let next = self.stage.next();
        tracing::info!(from = %self.stage, to = %next, "Pipeline stage complete");
        self.stage = next;
    }

    fn note(&mut self, kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::new(self.stage, kind, subject, message));
    }

    fn fail(self, error: StageError) -> PipelineResult {
        let action = match self.stage {
            Stage::Extracting => "Could not extract drug names",
            Stage::Synthesizing => "Could not write the interaction report",
            _ => "Pipeline stage failed",
        };
        tracing::error!(stage = %self.stage, error = %error, "Pipeline failed");

        PipelineResult::Failed(PipelineFailure {
            request_id: self.request_id,
            stage: self.stage,
            message: format!("{action}: {error}"),
            diagnostics: self.diagnostics,
        })
    }
}

/// Full pipeline over the four stage seams.
pub struct Pipeline<'a, X, R, S, Y>
where
    X: EntityExtractor,
    R: NameResolver + Sync,
    S: InteractionStore,
    Y: ReportSynthesizer,
{
    extractor: &'a X,
    resolver: &'a R,
    store: &'a S,
    synthesizer: &'a Y,
    max_resolver_workers: usize,
}

impl<'a, X, R, S, Y> Pipeline<'a, X, R, S, Y>
where
    X: EntityExtractor,
    R: NameResolver + Sync,
    S: InteractionStore,
    Y: ReportSynthesizer,
{
    pub fn new(extractor: &'a X, resolver: &'a R, store: &'a S, synthesizer: &'a Y) -> Self {
        Self {
            extractor,
            resolver,
            store,
            synthesizer,
            max_resolver_workers: crate::config::DEFAULT_MAX_RESOLVER_WORKERS,
        }
    }

    /// Cap concurrent name lookups (at least one).
    pub fn with_max_resolver_workers(mut self, workers: usize) -> Self {
        self.max_resolver_workers = workers.max(1);
        self
    }

    /// Run one invocation. Always returns a complete report or a failure record.
    pub fn run(&self, context: &PatientContext, question: &str) -> PipelineResult {
        let mut run = Run::start();
        let span = tracing::info_span!("pipeline", request_id = %run.request_id);
        let _guard = span.enter();

        // Extracting
        let extracted = match self.extractor.extract(context, question) {
            Ok(names) => names,
            Err(e) => return run.fail(e),
        };
        tracing::info!(count = extracted.len(), "Extracted drug names");

        let patient_text = format!("{}\n{}", context.free_text(), question);
        for name in &extracted {
            if !is_grounded(name.as_str(), &patient_text) {
                run.note(
                    DiagnosticKind::UngroundedName,
                    name.as_str(),
                    "name does not appear in the patient's profile or question",
                );
            }
        }
        run.advance();

        // Resolving
        let resolved = resolve_all(self.resolver, &extracted, self.max_resolver_workers);
        for drug in &resolved {
            if let ResolutionStatus::Unresolved { reason } = &drug.status {
                run.note(DiagnosticKind::UnresolvedName, drug.name.as_str(), reason.clone());
            }
        }
        run.advance();

        // Pairing
        let pairs = generate_pairs(&resolved);
        tracing::info!(pairs = pairs.len(), "Generated drug pairs");
        run.advance();

        // LookingUp
        let mut findings = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let outcomes = match self.store.lookup(&pair) {
                Ok(outcomes) => outcomes,
                Err(e) => {
                    tracing::warn!(pair = %pair, error = %e, "Interaction lookup failed");
                    run.note(DiagnosticKind::LookupFailed, pair.to_string(), e.to_string());
                    Vec::new()
                }
            };
            findings.push(Finding::new(pair, outcomes));
        }
        run.advance();

        // Synthesizing
        let narrative = match self.synthesizer.synthesize(&findings, context, question) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => return run.fail(StageError::Malformed("empty narrative".into())),
            Err(e) => return run.fail(e),
        };
        run.advance();

        let digest = findings_digest(&findings);
        PipelineResult::Done(Report {
            request_id: run.request_id,
            generated_at: chrono::Utc::now().to_rfc3339(),
            extracted_names: extracted,
            resolved_drugs: resolved,
            findings,
            diagnostics: run.diagnostics,
            narrative,
            findings_digest: digest,
        })
    }
}
