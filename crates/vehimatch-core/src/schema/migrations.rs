/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Makes (NHTSA make id, or the lower-cased name for EPA-only makes)
CREATE TABLE IF NOT EXISTS makes (
    make_id TEXT PRIMARY KEY,
    make_name TEXT UNIQUE NOT NULL,
    data_source TEXT NOT NULL
);

-- Models, one row per model-year
CREATE TABLE IF NOT EXISTS models (
    model_id TEXT NOT NULL,
    model_name TEXT NOT NULL,
    make_id TEXT NOT NULL REFERENCES makes(make_id),
    year INTEGER NOT NULL,
    PRIMARY KEY (model_id, year)
);

CREATE INDEX IF NOT EXISTS idx_models_make_id ON models(make_id);
CREATE INDEX IF NOT EXISTS idx_models_year ON models(year);
"#;

const MIGRATION_002: &str = r#"
-- Generated noisy query strings with the keys of their ground truth
CREATE TABLE IF NOT EXISTS noisy_variants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    noisy_string TEXT NOT NULL,
    model_id TEXT NOT NULL,
    make_id TEXT NOT NULL,
    year INTEGER NOT NULL,
    noise_type TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_noisy_variants_model ON noisy_variants(model_id, year);
CREATE INDEX IF NOT EXISTS idx_noisy_variants_noise_type ON noisy_variants(noise_type);
"#;

const MIGRATION_003: &str = r#"
-- Evaluation run summaries
CREATE TABLE IF NOT EXISTS evaluation_runs (
    id TEXT PRIMARY KEY,
    backend TEXT NOT NULL,
    top_k INTEGER NOT NULL,
    query_count INTEGER NOT NULL,
    correct INTEGER NOT NULL,
    errored INTEGER NOT NULL,
    cancelled INTEGER NOT NULL,
    precision REAL NOT NULL,
    recall REAL NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_evaluation_runs_started_at ON evaluation_runs(started_at);
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "canonical_corpus",
        sql: MIGRATION_001,
    },
    Migration {
        version: 2,
        name: "noisy_variants",
        sql: MIGRATION_002,
    },
    Migration {
        version: 3,
        name: "evaluation_runs",
        sql: MIGRATION_003,
    },
];
