use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

use crate::corpus::CorpusAccessor;
use crate::error::{Error, Result};
use crate::model::{CanonicalRecord, EvaluationRun, NoiseType, NoisyQuery, RunId};

use super::migrations::MIGRATIONS;

/// A canonical record together with the storage keys it was read under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRow {
    pub make_id: String,
    pub model_id: String,
    pub record: CanonicalRecord,
}

/// A noisy variant ready to be written to `noisy_variants`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoisyVariantRow {
    pub noisy_string: String,
    pub model_id: String,
    pub make_id: String,
    pub year: i32,
    pub noise_type: NoiseType,
}

/// A database connection holding the canonical corpus, generated noisy
/// variants, and evaluation run history.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Canonical corpus
impl Database {
    /// Insert a make. Used to seed fixtures; bulk loading happens elsewhere.
    pub fn insert_make(&self, make_id: &str, make_name: &str, data_source: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO makes (make_id, make_name, data_source) VALUES (?1, ?2, ?3)",
            rusqlite::params![make_id, make_name, data_source],
        )?;
        Ok(())
    }

    /// Insert one model-year for an existing make.
    pub fn insert_model(
        &self,
        model_id: &str,
        model_name: &str,
        make_id: &str,
        year: i32,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO models (model_id, model_name, make_id, year) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![model_id, model_name, make_id, year],
        )?;
        Ok(())
    }

    /// Count model-year rows.
    pub fn count_models(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM models")
    }

    /// A stable page of canonical records with their keys.
    ///
    /// Ordering is total over `(make_name, model_name, year, model_id)`,
    /// so consecutive offsets never overlap.
    pub fn fetch_canonical_rows(&self, limit: usize, offset: usize) -> Result<Vec<CanonicalRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT mk.make_id, m.model_id, mk.make_name, m.model_name, m.year
             FROM models m
             JOIN makes mk ON m.make_id = mk.make_id
             ORDER BY mk.make_name, m.model_name, m.year, m.model_id
             LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![to_i64(limit), to_i64(offset)], |row| {
                Ok(CanonicalRow {
                    make_id: row.get(0)?,
                    model_id: row.get(1)?,
                    record: CanonicalRecord::new(
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get(4)?,
                    ),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

// Noisy variants
impl Database {
    /// Insert a batch of noisy variants in one transaction.
    pub fn insert_noisy_variants(&self, rows: &[NoisyVariantRow]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO noisy_variants (noisy_string, model_id, make_id, year, noise_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.noisy_string,
                    row.model_id,
                    row.make_id,
                    row.year,
                    row.noise_type.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Up to `limit` noisy queries, oldest first, with ground truth joined
    /// back to canonical names.
    pub fn list_noisy_queries(&self, limit: usize) -> Result<Vec<NoisyQuery>> {
        let mut stmt = self.conn.prepare(
            "SELECT nv.noisy_string, nv.noise_type, mk.make_name, m.model_name, nv.year
             FROM noisy_variants nv
             JOIN models m ON m.model_id = nv.model_id AND m.year = nv.year
             JOIN makes mk ON mk.make_id = nv.make_id
             ORDER BY nv.id
             LIMIT ?1",
        )?;

        let raw = stmt
            .query_map([to_i64(limit)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i32>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(text, noise_type, make, model, year)| {
                Ok(NoisyQuery::new(
                    text,
                    noise_type.parse()?,
                    CanonicalRecord::new(make, model, year),
                ))
            })
            .collect()
    }

    /// Count stored noisy variants.
    pub fn count_noisy_variants(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM noisy_variants")
    }

    /// Count stored noisy variants per strategy.
    pub fn count_noisy_by_type(&self) -> Result<Vec<(NoiseType, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT noise_type, COUNT(*) FROM noisy_variants GROUP BY noise_type ORDER BY noise_type",
        )?;
        let raw = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(noise_type, count)| Ok((noise_type.parse()?, from_i64(count))))
            .collect()
    }

    /// Delete every stored noisy variant, returning how many were removed.
    pub fn clear_noisy_variants(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM noisy_variants", [])?)
    }
}

// Evaluation runs
impl Database {
    /// Record a finished evaluation run.
    pub fn insert_evaluation_run(&self, run: &EvaluationRun) -> Result<()> {
        self.conn.execute(
            "INSERT INTO evaluation_runs (
                id, backend, top_k, query_count, correct, errored, cancelled,
                precision, recall, started_at, finished_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                run.id.to_string(),
                run.backend,
                to_i64(run.top_k),
                to_i64(run.query_count),
                to_i64(run.correct),
                to_i64(run.errored),
                to_i64(run.cancelled),
                run.precision,
                run.recall,
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The most recent evaluation runs, newest first.
    pub fn list_evaluation_runs(&self, limit: usize) -> Result<Vec<EvaluationRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, backend, top_k, query_count, correct, errored, cancelled,
                    precision, recall, started_at, finished_at
             FROM evaluation_runs
             ORDER BY started_at DESC
             LIMIT ?1",
        )?;

        let runs = stmt
            .query_map([to_i64(limit)], row_to_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(runs)
    }

    /// Fetch one evaluation run by id.
    pub fn get_evaluation_run(&self, id: &RunId) -> Result<EvaluationRun> {
        let mut stmt = self.conn.prepare(
            "SELECT id, backend, top_k, query_count, correct, errored, cancelled,
                    precision, recall, started_at, finished_at
             FROM evaluation_runs
             WHERE id = ?1",
        )?;

        stmt.query_row([id.to_string()], row_to_run)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Error::NotFound {
                    entity: "evaluation_run",
                    id: id.to_string(),
                },
                other => Error::Database(other),
            })
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(from_i64(count))
    }
}

impl CorpusAccessor for Database {
    fn fetch_canonical(&self, limit: usize, offset: usize) -> Result<Vec<CanonicalRecord>> {
        Ok(self
            .fetch_canonical_rows(limit, offset)?
            .into_iter()
            .map(|row| row.record)
            .collect())
    }

    fn fetch_labeled_noisy(&self, limit: usize) -> Result<Vec<NoisyQuery>> {
        self.list_noisy_queries(limit)
    }

    fn count_canonical(&self) -> Result<usize> {
        self.count_models()
    }
}

fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<EvaluationRun> {
    let id_str: String = row.get(0)?;
    let id = id_str.parse::<RunId>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(EvaluationRun {
        id,
        backend: row.get(1)?,
        top_k: from_i64(row.get(2)?),
        query_count: from_i64(row.get(3)?),
        correct: from_i64(row.get(4)?),
        errored: from_i64(row.get(5)?),
        cancelled: from_i64(row.get(6)?),
        precision: row.get(7)?,
        recall: row.get(8)?,
        started_at: parse_timestamp(row, 9)?,
        finished_at: parse_timestamp(row, 10)?,
    })
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(Into::into)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_i64(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
