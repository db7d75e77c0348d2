pub mod migrations;
pub mod models;
pub mod queries;
pub mod seats;
pub mod sessions;

use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Format of every `created_at` / `updated_at` / `paid_at` column. Millisecond
/// precision keeps FIFO ordering stable for rows written in the same second.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format of event start and end dates, as typed by admins.
pub const EVENT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fresh private database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Writer access. Multi-statement writes open a transaction inside `f`;
    /// holding the lock for the whole closure makes them atomic with respect
    /// to every other caller.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB writer lock poisoned: {}", e))?;
        f(&mut conn)
    }
}

/// True when the error chain bottoms out in a SQLite constraint failure
/// (unique index, primary key, foreign key).
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
        )
    })
}

pub fn now_ts() -> String {
    format_ts(Utc::now().naive_utc())
}

pub fn format_ts(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backed_database_migrates_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanseat.db");

        {
            let db = Database::open(&path).unwrap();
            db.set_setting("logChannel", "123").unwrap();
        }

        // Reopening must not re-run v1 or reseed settings
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_setting("logChannel").unwrap().as_deref(), Some("123"));
        let version: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(version, migrations::LATEST_VERSION);
    }

    #[test]
    fn unique_violation_is_recognised() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .with_conn_mut(|conn| {
                conn.execute("INSERT INTO settings (key, value, description) VALUES ('adminRole', '', '')", [])?;
                Ok(())
            })
            .unwrap_err();
        assert!(is_constraint_violation(&err));
        assert!(!is_constraint_violation(&anyhow::anyhow!("plain failure")));
    }
}
