//! Pipeline result models.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{DrugName, Finding, ResolvedDrug};

/// Pipeline state. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extracting,
    Resolving,
    Pairing,
    LookingUp,
    Synthesizing,
    Done,
    Failed,
}

impl Stage {
    /// Next state on success. Terminal states stay put.
    pub fn next(self) -> Stage {
        match self {
            Stage::Extracting => Stage::Resolving,
            Stage::Resolving => Stage::Pairing,
            Stage::Pairing => Stage::LookingUp,
            Stage::LookingUp => Stage::Synthesizing,
            Stage::Synthesizing => Stage::Done,
            Stage::Done => Stage::Done,
            Stage::Failed => Stage::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extracting => "extracting",
            Stage::Resolving => "resolving",
            Stage::Pairing => "pairing",
            Stage::LookingUp => "looking_up",
            Stage::Synthesizing => "synthesizing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A name could not be mapped to an identifier
    UnresolvedName,
    /// The interaction store failed for one pair
    LookupFailed,
    /// An extracted name has no close match in the patient's own text
    UngroundedName,
}

/// Soft warning recorded during an invocation. Never fails the pipeline.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub kind: DiagnosticKind,
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        stage: Stage,
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// Successful pipeline outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub request_id: Uuid,
    pub generated_at: String,
    pub extracted_names: Vec<DrugName>,
    pub resolved_drugs: Vec<ResolvedDrug>,
    pub findings: Vec<Finding>,
    pub diagnostics: Vec<Diagnostic>,
    pub narrative: String,
    /// SHA-256 over the findings, independent of outcome order
    pub findings_digest: String,
}

impl Report {
    /// Whether any finding carries a recorded outcome.
    pub fn has_interactions(&self) -> bool {
        self.findings.iter().any(Finding::has_outcomes)
    }
}

/// Terminal pipeline failure. Carries no narrative.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelineFailure {
    pub request_id: Uuid,
    pub stage: Stage,
    pub message: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// All-or-nothing result of one invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineResult {
    Done(Report),
    Failed(PipelineFailure),
}

impl PipelineResult {
    /// Terminal state reached.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineResult::Done(_) => Stage::Done,
            PipelineResult::Failed(_) => Stage::Failed,
        }
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            PipelineResult::Done(report) => Some(report),
            PipelineResult::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            PipelineResult::Done(_) => None,
            PipelineResult::Failed(failure) => Some(failure),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, PipelineResult::Done(_))
    }
}

/// Digest of findings by pair keys and sorted outcomes.
///
/// Two runs with the same pairs and outcome sets produce the same digest.
pub fn findings_digest(findings: &[Finding]) -> String {
    let mut entries: Vec<(String, String, Vec<&str>)> = findings
        .iter()
        .map(|f| {
            let mut outcomes: Vec<&str> = f.outcomes.iter().map(String::as_str).collect();
            outcomes.sort_unstable();
            (
                f.pair.first().key().to_string(),
                f.pair.second().key().to_string(),
                outcomes,
            )
        })
        .collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for (a, b, outcomes) in &entries {
        hasher.update(a.as_bytes());
        hasher.update([0x1f]);
        hasher.update(b.as_bytes());
        for outcome in outcomes {
            hasher.update([0x1e]);
            hasher.update(outcome.as_bytes());
        }
        hasher.update([0x1d]);
    }
    hex::encode(hasher.finalize())
}
