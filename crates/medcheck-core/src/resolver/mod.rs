//! Drug name resolver.
//!
//! Pipeline: extracted names → dedupe → concurrent lookup → ResolvedDrug per name.
//! A failed lookup never propagates; it yields an `Unresolved` entry.

mod normalizer;
mod pubchem;

pub use normalizer::*;
pub use pubchem::*;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use thiserror::Error;

use crate::models::{DrugName, ResolvedDrug};

/// Resolver errors.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Lookup timed out after {0}s")]
    Timeout(u64),

    #[error("Name service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}

pub type ResolverResult<T> = Result<T, ResolverError>;

/// Lookup of a free-text drug name in a chemical-name database.
///
/// Implementors provide `lookup`; `resolve` wraps it so callers never see an error.
pub trait NameResolver {
    /// Look a name up. `Ok(None)` means the database has no match.
    fn lookup(&self, name: &str) -> ResolverResult<Option<String>>;

    /// Resolve a name, absorbing every failure into `Unresolved`.
    fn resolve(&self, name: &DrugName) -> ResolvedDrug {
        let query = name.as_str().trim();
        if query.is_empty() {
            return ResolvedDrug::unresolved(name.clone(), "empty name");
        }

        match self.lookup(query) {
            Ok(Some(identifier)) if !identifier.trim().is_empty() => {
                tracing::debug!(name = %name, identifier = %identifier, "Resolved drug name");
                ResolvedDrug::resolved(name.clone(), identifier)
            }
            Ok(_) => {
                tracing::warn!(name = %name, "Drug name not found");
                ResolvedDrug::unresolved(name.clone(), "not found")
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "Drug name lookup failed");
                ResolvedDrug::unresolved(name.clone(), e.to_string())
            }
        }
    }
}

impl<R: NameResolver + ?Sized> NameResolver for &R {
    fn lookup(&self, name: &str) -> ResolverResult<Option<String>> {
        (**self).lookup(name)
    }
}

/// Drop names that normalize to an already-seen key, keeping first-seen order.
pub fn dedupe_names(names: &[DrugName]) -> Vec<DrugName> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|n| {
            let key = normalize_key(n.as_str());
            !key.is_empty() && seen.insert(key)
        })
        .cloned()
        .collect()
}

/// Resolve every distinct name, at most `max_workers` lookups in flight.
///
/// Duplicate names (after normalization) are looked up once. Output has one
/// entry per distinct name, in first-seen order.
pub fn resolve_all<R>(resolver: &R, names: &[DrugName], max_workers: usize) -> Vec<ResolvedDrug>
where
    R: NameResolver + Sync + ?Sized,
{
    let unique = dedupe_names(names);
    let workers = max_workers.max(1).min(unique.len());

    if workers <= 1 {
        return unique.iter().map(|n| resolver.resolve(n)).collect();
    }

    // Workers log under the caller's span (the pipeline request id).
    let span = tracing::Span::current();
    let next = AtomicUsize::new(0);
    let (next, pending, span) = (&next, &unique, &span);
    let results: Vec<(usize, ResolvedDrug)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || {
                    let _entered = span.enter();
                    let mut out = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some(name) = pending.get(i) else {
                            break;
                        };
                        out.push((i, resolver.resolve(name)));
                    }
                    out
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_default())
            .collect()
    });

    let mut slots: Vec<Option<ResolvedDrug>> = vec![None; unique.len()];
    for (i, drug) in results {
        slots[i] = Some(drug);
    }

    unique
        .into_iter()
        .zip(slots)
        .map(|(name, slot)| {
            slot.unwrap_or_else(|| ResolvedDrug::unresolved(name, "resolver worker panicked"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory resolver counting backend calls per name.
    struct TableResolver {
        table: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl TableResolver {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl NameResolver for TableResolver {
        fn lookup(&self, name: &str) -> ResolverResult<Option<String>> {
            self.calls.lock().unwrap().push(name.to_string());
            if name == "explode" {
                return Err(ResolverError::Timeout(10));
            }
            Ok(self.table.get(&name.to_lowercase()).cloned())
        }
    }

    /// Resolver that records the most lookups ever running at once.
    #[derive(Default)]
    struct SlowResolver {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl NameResolver for SlowResolver {
        fn lookup(&self, name: &str) -> ResolverResult<Option<String>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(name.to_uppercase()))
        }
    }

    fn names(list: &[&str]) -> Vec<DrugName> {
        list.iter().map(|n| DrugName::from(*n)).collect()
    }

    #[test]
    fn test_unknown_name_is_unresolved() {
        let resolver = TableResolver::new(&[]);
        let drug = resolver.resolve(&"Notadrug".into());
        assert!(!drug.is_resolved());
    }

    #[test]
    fn test_lookup_error_is_unresolved() {
        let resolver = TableResolver::new(&[]);
        let drug = resolver.resolve(&"explode".into());
        assert!(!drug.is_resolved());
        assert_eq!(
            drug.status,
            crate::models::ResolutionStatus::Unresolved {
                reason: "Lookup timed out after 10s".into()
            }
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = TableResolver::new(&[("aspirin", "A")]);
        let first = resolver.resolve(&"Aspirin".into());
        let second = resolver.resolve(&"Aspirin".into());
        assert_eq!(first, second);
        assert_eq!(first.identifier(), Some("A"));
    }

    #[test]
    fn test_blank_name_skips_backend() {
        let resolver = TableResolver::new(&[]);
        let drug = resolver.resolve(&"   ".into());
        assert!(!drug.is_resolved());
        assert!(resolver.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_all_dedupes_before_lookup() {
        let resolver = TableResolver::new(&[("aspirin", "A"), ("ibuprofen", "B")]);
        let out = resolve_all(&resolver, &names(&["Aspirin", "aspirin ", "Ibuprofen"]), 4);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name.as_str(), "Aspirin");
        assert_eq!(out[0].identifier(), Some("A"));
        assert_eq!(out[1].identifier(), Some("B"));
        assert_eq!(resolver.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_all_keeps_input_order_with_workers() {
        let entries: Vec<(String, String)> = (0..20)
            .map(|i| (format!("drug{i}"), format!("ID{i}")))
            .collect();
        let refs: Vec<(&str, &str)> = entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let resolver = TableResolver::new(&refs);
        let input: Vec<DrugName> = entries.iter().map(|(k, _)| k.as_str().into()).collect();

        let out = resolve_all(&resolver, &input, 3);
        assert_eq!(out.len(), 20);
        for (i, drug) in out.iter().enumerate() {
            assert_eq!(drug.identifier(), Some(format!("ID{i}").as_str()));
        }
    }

    #[test]
    fn test_resolve_all_empty_and_zero_workers() {
        let resolver = TableResolver::new(&[("aspirin", "A")]);
        assert!(resolve_all(&resolver, &[], 4).is_empty());

        let out = resolve_all(&resolver, &names(&["aspirin"]), 0);
        assert_eq!(out[0].identifier(), Some("A"));
    }

    #[test]
    fn test_resolve_all_caps_concurrent_lookups() {
        let resolver = SlowResolver::default();
        let input: Vec<DrugName> = (0..10).map(|i| DrugName::from(format!("drug{i}"))).collect();

        let out = resolve_all(&resolver, &input, 2);

        assert_eq!(out.len(), 10);
        assert!(out.iter().all(|d| d.is_resolved()));
        let peak = resolver.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak in-flight lookups was {peak}");
        assert_eq!(resolver.in_flight.load(Ordering::SeqCst), 0);
    }
}
