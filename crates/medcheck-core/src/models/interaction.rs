//! Drug pair and interaction finding models.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::DrugName;
use crate::resolver::normalize_key;

/// One side of a drug pair.
#[derive(Debug, Clone, Serialize)]
pub struct PairMember {
    /// Name the drug was extracted under
    pub name: DrugName,
    /// Canonical identifier as returned by the resolver
    pub identifier: String,
    /// Case- and whitespace-normalized identifier; pair identity key
    #[serde(skip)]
    key: String,
}

impl PairMember {
    pub fn new(name: DrugName, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let key = normalize_key(&identifier);
        Self {
            name,
            identifier,
            key,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Unordered pair of two distinct drugs.
///
/// Sides are stored sorted by key, so `DrugPair::new(a, b) == DrugPair::new(b, a)`.
#[derive(Debug, Clone, Serialize)]
pub struct DrugPair {
    first: PairMember,
    second: PairMember,
}

impl DrugPair {
    /// Build a pair. Returns `None` for a self-pair (same normalized identifier).
    pub fn new(a: PairMember, b: PairMember) -> Option<Self> {
        match a.key().cmp(b.key()) {
            Ordering::Equal => None,
            Ordering::Less => Some(Self { first: a, second: b }),
            Ordering::Greater => Some(Self { first: b, second: a }),
        }
    }

    pub fn first(&self) -> &PairMember {
        &self.first
    }

    pub fn second(&self) -> &PairMember {
        &self.second
    }

    /// Identifiers in stored order.
    pub fn identifiers(&self) -> (&str, &str) {
        (&self.first.identifier, &self.second.identifier)
    }

    /// Names in stored order.
    pub fn names(&self) -> (&DrugName, &DrugName) {
        (&self.first.name, &self.second.name)
    }
}

impl PartialEq for DrugPair {
    fn eq(&self, other: &Self) -> bool {
        self.first.key() == other.first.key() && self.second.key() == other.second.key()
    }
}

impl Eq for DrugPair {}

impl Hash for DrugPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.first.key().hash(state);
        self.second.key().hash(state);
    }
}

impl PartialOrd for DrugPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DrugPair {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.first.key(), self.second.key()).cmp(&(other.first.key(), other.second.key()))
    }
}

impl fmt::Display for DrugPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.first.name, self.second.name)
    }
}

/// Known interaction outcomes for one pair. Empty outcomes mean nothing is recorded.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Finding {
    pub pair: DrugPair,
    pub outcomes: Vec<String>,
}

impl Finding {
    pub fn new(pair: DrugPair, outcomes: Vec<String>) -> Self {
        Self { pair, outcomes }
    }

    pub fn has_outcomes(&self) -> bool {
        !self.outcomes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, id: &str) -> PairMember {
        PairMember::new(name.into(), id)
    }

    #[test]
    fn test_pair_is_order_independent() {
        let ab = DrugPair::new(member("Warfarin", "B"), member("Aspirin", "A")).unwrap();
        let ba = DrugPair::new(member("Aspirin", "A"), member("Warfarin", "B")).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.identifiers(), ("A", "B"));
        assert_eq!(ab.to_string(), "Aspirin + Warfarin");
    }

    #[test]
    fn test_self_pair_rejected() {
        assert!(DrugPair::new(member("Aspirin", "A"), member("aspirin ", " a")).is_none());
    }

    #[test]
    fn test_finding_outcomes() {
        let pair = DrugPair::new(member("x", "X"), member("y", "Y")).unwrap();
        assert!(!Finding::new(pair.clone(), vec![]).has_outcomes());
        assert!(Finding::new(pair, vec!["bleeding".into()]).has_outcomes());
    }
}
