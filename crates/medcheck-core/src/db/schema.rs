//! SQLite schema definition.

/// Table holding the reference interaction dataset.
pub const INTERACTIONS_TABLE: &str = "interactions";

/// Interaction table schema.
///
/// The production table is populated externally; this schema is applied only
/// by writable handles (`Database`) used for tooling and fixtures.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Drug-drug interactions (read-only reference data)
-- ============================================================================

CREATE TABLE IF NOT EXISTS interactions (
    drug1 TEXT NOT NULL,                         -- canonical identifier (SMILES)
    drug2 TEXT NOT NULL,                         -- canonical identifier (SMILES)
    outcome TEXT NOT NULL                        -- recorded side effect / outcome
);

-- Composite key lookups in either orientation
CREATE INDEX IF NOT EXISTS idx_interactions_pair ON interactions(drug1, drug2);
"#;
