use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Table definitions. The vote table carries the engine's core invariant:
/// one row per `(poll, identity)`, enforced by the database, with exactly one
/// identity column populated per row.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS poll (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        time_created      TEXT    NOT NULL,
        id_org            TEXT    NOT NULL,
        id_created_by     TEXT    NOT NULL,
        open              INTEGER NOT NULL,
        title             TEXT    NOT NULL,
        description       TEXT    NOT NULL,
        kind              TEXT    NOT NULL,
        visibility        TEXT    NOT NULL,
        voting_method     TEXT    NOT NULL,
        quorum_percentage INTEGER,
        end_time          TEXT,
        final_results     TEXT
    );",
    "CREATE TABLE IF NOT EXISTS poll_option (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        id_poll       INTEGER NOT NULL REFERENCES poll(id),
        label         TEXT    NOT NULL,
        display_order INTEGER NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS vote (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        id_poll           INTEGER NOT NULL REFERENCES poll(id),
        id_option         INTEGER NOT NULL REFERENCES poll_option(id),
        id_member         TEXT,
        hashed_identifier TEXT,
        time_created      TEXT    NOT NULL,
        CHECK ((id_member IS NULL) <> (hashed_identifier IS NULL)),
        UNIQUE (id_poll, id_member),
        UNIQUE (id_poll, hashed_identifier)
    );",
];

pub struct DBClient {
    pool: SqlitePool,
}

impl DBClient {
    /// Connect to the database at `url`, creating the file if missing.
    pub async fn new(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory database for tests and embedded use. Limited to a single
    /// connection: each SQLite `:memory:` connection is its own database.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Apply the schema. Idempotent.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    pub fn conn(&self) -> &SqlitePool {
        &self.pool
    }
}
