//! Database connection management, schema sync, and the crate error type.
//!
//! Every store operation in this crate takes an explicit `&Connection`; there
//! is no global connection. Tests open an in-memory or temporary database,
//! call [`sync`] on it, and pass the handle around.

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "TAGWIKI_DB_PATH";

/// Embedded migrations, applied in order. Each one must leave
/// `schema_meta.version` at its own number.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../migrations/001_initial.sql"))];

/// Tables owned by the schema, in drop order (children first).
const TABLES: &[&str] = &["tags", "pages", "users", "schema_meta"];

/// Central error type for the wiki.
#[derive(Debug, Error)]
pub enum WikiError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// I/O operation failed (resolving or creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-supplied fields were rejected before reaching the store.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Options for [`sync`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Drop every table before applying migrations.
    pub force: bool,
}

/// Returns the path to the SQLite database file.
///
/// Resolution order:
/// 1. `TAGWIKI_DB_PATH` environment variable (if set)
/// 2. `~/.tagwiki/wiki.db` (default)
///
/// Creates the parent directory if it doesn't exist.
///
/// # Errors
///
/// Returns `WikiError::Io` if the home directory cannot be determined or the
/// parent directory cannot be created.
pub fn db_path() -> Result<PathBuf, WikiError> {
    let path = if let Ok(custom) = std::env::var(DB_PATH_ENV) {
        PathBuf::from(custom)
    } else {
        let home = dirs::home_dir().ok_or_else(|| {
            WikiError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine home directory",
            ))
        })?;
        home.join(".tagwiki").join("wiki.db")
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    Ok(path)
}

/// Opens a connection to the configured database.
pub fn open_connection() -> Result<Connection, WikiError> {
    let path = db_path()?;
    open_connection_at(&path)
}

/// Opens a SQLite connection at `path`.
///
/// - **WAL mode**: concurrent readers with serialized writers
/// - **Foreign keys**: tag rows cascade with their page
/// - **Busy timeout**: 5 seconds
pub fn open_connection_at(path: &Path) -> Result<Connection, WikiError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    tracing::debug!(path = %path.display(), "Opened wiki database");
    Ok(conn)
}

/// Opens a private in-memory database with foreign keys on and the schema
/// applied.
pub fn open_in_memory() -> Result<Connection, WikiError> {
    let mut conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

/// Current schema version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<i64, WikiError> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_meta'",
        [],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(0);
    }
    let version: i64 = conn
        .query_row("SELECT version FROM schema_meta LIMIT 1", [], |row| row.get(0))
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(0),
            other => Err(other),
        })?;
    Ok(version)
}

/// Runs all pending migrations, each in its own transaction.
pub fn run_migrations(conn: &mut Connection) -> Result<(), WikiError> {
    let current_version = schema_version(conn)?;

    for &(target_version, sql) in MIGRATIONS {
        if target_version > current_version {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.commit()?;
            tracing::info!(version = target_version, "Applied migration");
        }
    }

    Ok(())
}

/// Brings the schema up to date. With `force`, every table is dropped first,
/// leaving an empty database at the latest version.
pub fn sync(conn: &mut Connection, options: SyncOptions) -> Result<(), WikiError> {
    if options.force {
        let tx = conn.transaction()?;
        for table in TABLES {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
        }
        tx.commit()?;
        tracing::info!("Dropped wiki schema");
    }
    run_migrations(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_db_path_respects_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let custom_path = dir.path().join("nested").join("custom.db");

        std::env::set_var(DB_PATH_ENV, &custom_path);
        let result = db_path();
        std::env::remove_var(DB_PATH_ENV);

        let result = result.expect("db_path should succeed");
        assert_eq!(result, custom_path);
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_migration_creates_tables_from_scratch() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();

        assert_eq!(schema_version(&conn).unwrap(), 0);
        run_migrations(&mut conn).expect("Migrations should succeed");
        assert_eq!(schema_version(&conn).unwrap(), 1);

        let tables = table_names(&conn);
        for expected in ["pages", "schema_meta", "tags", "users"] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_migration_is_idempotent() {
        let mut conn = open_in_memory().unwrap();
        run_migrations(&mut conn).expect("Second run should succeed");
        assert_eq!(schema_version(&conn).unwrap(), 1);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_meta", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_sync_force_wipes_rows() {
        let mut conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO users (id, name, email, created_at) VALUES ('u1', 'Ada', 'ada@example.com', 'now')",
            [],
        )
        .unwrap();

        sync(&mut conn, SyncOptions { force: true }).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_sync_without_force_keeps_rows() {
        let mut conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO users (id, name, email, created_at) VALUES ('u1', 'Ada', 'ada@example.com', 'now')",
            [],
        )
        .unwrap();

        sync(&mut conn, SyncOptions::default()).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_open_connection_at_configures_correctly() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_connection_at(&dir.path().join("wiki.db")).expect("Should open connection");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }
}
