//! Unordered drug pair generation.
//!
//! Unresolved drugs are dropped, identifiers are deduplicated by normalized key
//! (first occurrence wins), and every 2-combination of the remainder is emitted.
//! For k distinct identifiers the output holds exactly C(k, 2) pairs.

use std::collections::{BTreeSet, HashSet};

use crate::models::{DrugPair, PairMember, ResolvedDrug};

/// Build the set of unordered pairs from resolved drugs.
pub fn generate_pairs(resolved: &[ResolvedDrug]) -> BTreeSet<DrugPair> {
    let mut seen = HashSet::new();
    let members: Vec<PairMember> = resolved
        .iter()
        .filter_map(|drug| {
            drug.identifier()
                .map(|id| PairMember::new(drug.name.clone(), id))
        })
        .filter(|m| !m.key().is_empty() && seen.insert(m.key().to_string()))
        .collect();

    let mut pairs = BTreeSet::new();
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            if let Some(pair) = DrugPair::new(a.clone(), b.clone()) {
                pairs.insert(pair);
            }
        }
    }
    pairs
}
