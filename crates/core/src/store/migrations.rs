//! Schema versions for the entry store.
//!
//! `_migrations` records the highest version applied; anything newer in
//! `MIGRATIONS` is applied in order, one transaction per version.

use super::Error;
use tokio_rusqlite::{Connection, params};

struct Migration {
    version: i64,
    sql: &'static str,
}

/// Ordered by strictly increasing `version`.
const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, sql: include_str!("../../migrations/001_entries.sql") },
    Migration { version: 2, sql: include_str!("../../migrations/002_entries_content_type.sql") },
];

/// Bring the schema on `conn` up to the latest version.
///
/// # Errors
///
/// `Error::MigrationFailed` if a migration's SQL fails; that version and
/// everything after it stay unapplied.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("version {}: {e}", migration.version)))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![migration.version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version = migration.version, "applied migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
