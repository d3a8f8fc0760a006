//! Resolver workers must log inside the caller's span.
//!
//! Installs a global subscriber, so this file holds a single test.

use std::sync::Mutex;

use medcheck_core::resolver::ResolverResult;
use medcheck_core::{resolve_all, DrugName, NameResolver};

/// Records the name of the span active on whichever thread runs the lookup.
#[derive(Default)]
struct SpanRecorder {
    seen: Mutex<Vec<Option<String>>>,
}

impl NameResolver for SpanRecorder {
    fn lookup(&self, name: &str) -> ResolverResult<Option<String>> {
        let current = tracing::Span::current();
        self.seen
            .lock()
            .unwrap()
            .push(current.metadata().map(|m| m.name().to_string()));
        Ok(Some(name.to_uppercase()))
    }
}

#[test]
fn test_workers_inherit_request_span() {
    tracing::subscriber::set_global_default(tracing_subscriber::registry()).unwrap();

    let resolver = SpanRecorder::default();
    let input: Vec<DrugName> = ["Warfarin", "Aspirin", "Ibuprofen", "Metformin"]
        .into_iter()
        .map(DrugName::from)
        .collect();

    let span = tracing::info_span!("pipeline", request_id = "req-1");
    let out = span.in_scope(|| resolve_all(&resolver, &input, 3));

    assert_eq!(out.len(), 4);
    let seen = resolver.seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(seen.iter().all(|name| name.as_deref() == Some("pipeline")));
}
