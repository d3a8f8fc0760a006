//! Interaction lookups.
//!
//! The reference table may be directional (populated as drug1→drug2 only), so
//! every lookup matches both orientations of a pair and returns the union in
//! storage order. Outcomes are not deduplicated.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};

use super::{Database, DbError, DbResult, INTERACTIONS_TABLE};
use crate::models::DrugPair;

const OUTCOMES_SQL: &str = r#"
    SELECT outcome
    FROM interactions
    WHERE (drug1 = ?1 AND drug2 = ?2)
       OR (drug1 = ?2 AND drug2 = ?1)
    ORDER BY rowid
"#;

/// Read-only source of known interaction outcomes.
pub trait InteractionStore {
    /// Outcomes recorded for two identifiers, in either orientation.
    fn outcomes(&self, a: &str, b: &str) -> DbResult<Vec<String>>;

    /// Outcomes recorded for a pair.
    fn lookup(&self, pair: &DrugPair) -> DbResult<Vec<String>> {
        let (a, b) = pair.identifiers();
        self.outcomes(a, b)
    }
}

impl<S: InteractionStore + ?Sized> InteractionStore for &S {
    fn outcomes(&self, a: &str, b: &str) -> DbResult<Vec<String>> {
        (**self).outcomes(a, b)
    }
}

fn query_outcomes(conn: &Connection, a: &str, b: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(OUTCOMES_SQL)?;
    let rows = stmt.query_map(params![a, b], |row| row.get::<_, Value>(0))?;

    let mut outcomes = Vec::new();
    for row in rows {
        if let Some(outcome) = value_to_outcome(row?) {
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

/// Reference datasets store outcomes as text or as numeric labels.
fn value_to_outcome(value: Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
        Value::Null => None,
    }
}

/// Store backed by an on-disk SQLite file.
///
/// Opens a read-only connection per lookup and drops it before returning, so no
/// connection state is shared between lookups or requests.
#[derive(Debug, Clone)]
pub struct SqliteInteractionStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteInteractionStore {
    /// Point at an existing database file and check the interaction table is there.
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> DbResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout,
        };
        store.verify()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> DbResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    fn verify(&self) -> DbResult<()> {
        let conn = self.connect()?;
        let found: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [INTERACTIONS_TABLE],
            |row| row.get(0),
        )?;
        if found == 0 {
            return Err(DbError::NotFound(format!(
                "table '{}' in {}",
                INTERACTIONS_TABLE,
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl InteractionStore for SqliteInteractionStore {
    fn outcomes(&self, a: &str, b: &str) -> DbResult<Vec<String>> {
        let conn = self.connect()?;
        query_outcomes(&conn, a, b)
    }
}

impl Database {
    /// Record one interaction row as given (no mirrored row is written).
    pub fn insert_interaction(&self, drug1: &str, drug2: &str, outcome: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO interactions (drug1, drug2, outcome) VALUES (?1, ?2, ?3)",
            params![drug1, drug2, outcome],
        )?;
        Ok(())
    }

    /// Insert many rows in one transaction.
    pub fn insert_interactions(&mut self, rows: &[(&str, &str, &str)]) -> DbResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO interactions (drug1, drug2, outcome) VALUES (?1, ?2, ?3)")?;
            for (drug1, drug2, outcome) in rows {
                stmt.execute(params![drug1, drug2, outcome])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Total number of interaction rows.
    pub fn interaction_count(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM interactions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl InteractionStore for Database {
    fn outcomes(&self, a: &str, b: &str) -> DbResult<Vec<String>> {
        query_outcomes(&self.conn, a, b)
    }
}
