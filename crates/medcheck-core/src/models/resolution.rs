//! Drug name resolution models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A drug name as extracted from patient text. Not unique, not canonical.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DrugName(String);

impl DrugName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrugName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DrugName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DrugName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Outcome of looking a name up in the chemical-name database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Mapped to a canonical identifier (e.g. SMILES)
    Resolved { identifier: String },
    /// Not found, timed out, or the lookup failed
    Unresolved { reason: String },
}

/// A drug name paired with its resolution outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedDrug {
    pub name: DrugName,
    #[serde(flatten)]
    pub status: ResolutionStatus,
}

impl ResolvedDrug {
    pub fn resolved(name: DrugName, identifier: impl Into<String>) -> Self {
        Self {
            name,
            status: ResolutionStatus::Resolved {
                identifier: identifier.into(),
            },
        }
    }

    pub fn unresolved(name: DrugName, reason: impl Into<String>) -> Self {
        Self {
            name,
            status: ResolutionStatus::Unresolved {
                reason: reason.into(),
            },
        }
    }

    /// Canonical identifier, if resolved.
    pub fn identifier(&self) -> Option<&str> {
        match &self.status {
            ResolutionStatus::Resolved { identifier } => Some(identifier),
            ResolutionStatus::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.status, ResolutionStatus::Resolved { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_only_when_resolved() {
        let ok = ResolvedDrug::resolved("Aspirin".into(), "CC(=O)OC1=CC=CC=C1C(=O)O");
        assert!(ok.is_resolved());
        assert_eq!(ok.identifier(), Some("CC(=O)OC1=CC=CC=C1C(=O)O"));

        let missing = ResolvedDrug::unresolved("Zzz".into(), "not found");
        assert!(!missing.is_resolved());
        assert_eq!(missing.identifier(), None);
    }

    #[test]
    fn test_serializes_flat_status() {
        let drug = ResolvedDrug::unresolved("Zzz".into(), "not found");
        let json = serde_json::to_value(&drug).unwrap();
        assert_eq!(json["name"], "Zzz");
        assert_eq!(json["status"], "unresolved");
        assert_eq!(json["reason"], "not found");
    }
}
