//! SQLite-based timer state storage.
//!
//! One row per session key in `timer_states`, holding the canonical
//! [`BaseState`] plus bookkeeping (`revision`, `last_updated`, `created_at`).

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, SyncError};
use crate::identity::SessionKey;
use crate::sync::{StateStore, StoredState};
use crate::timer::{BaseState, SprintCategory, SprintStats};

/// SQLite database holding timer state records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/sprintclock.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("sprintclock.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.busy_timeout(std::time::Duration::from_secs(2))?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn row_to_stored(key: &SessionKey, row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
        Ok(RawRecord {
            key: key.as_str().to_string(),
            current_sprint: row.get(0)?,
            start_time_t: row.get(1)?,
            sprint_stats: row.get(2)?,
            last_updated: row.get(3)?,
            created_at: row.get(4)?,
            revision: row.get(5)?,
        })
    }
}

/// A row as read from SQLite, before decoding.
struct RawRecord {
    key: String,
    current_sprint: Option<String>,
    start_time_t: i64,
    sprint_stats: String,
    last_updated: String,
    created_at: Option<String>,
    revision: i64,
}

impl RawRecord {
    fn decode(self) -> Result<StoredState, DatabaseError> {
        let corrupt = |message: String| DatabaseError::CorruptRecord {
            key: self.key.clone(),
            message,
        };
        let current_sprint = self
            .current_sprint
            .as_deref()
            .map(str::parse::<SprintCategory>)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;
        let sprint_stats: SprintStats =
            serde_json::from_str(&self.sprint_stats).map_err(|e| corrupt(e.to_string()))?;
        let last_updated = parse_timestamp(&self.last_updated).map_err(corrupt)?;
        let created_at = self
            .created_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(corrupt)?;

        Ok(StoredState {
            state: BaseState {
                current_sprint,
                start_time_t: self.start_time_t,
                sprint_stats,
            },
            revision: u64::try_from(self.revision).unwrap_or(0),
            last_updated,
            created_at,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp '{raw}': {e}"))
}

impl StateStore for Database {
    fn load(&self, key: &SessionKey) -> Result<Option<StoredState>, SyncError> {
        let raw = self
            .conn
            .query_row(
                "SELECT current_sprint, start_time_t, sprint_stats, last_updated, created_at, revision
                 FROM timer_states WHERE user_key = ?1",
                params![key.as_str()],
                |row| Self::row_to_stored(key, row),
            )
            .optional()?;
        Ok(raw.map(RawRecord::decode).transpose()?)
    }

    fn save(&self, key: &SessionKey, state: &BaseState) -> Result<u64, SyncError> {
        let stats = serde_json::to_string(&state.sprint_stats)?;
        let revision: i64 = self.conn.query_row(
            "INSERT INTO timer_states
                (user_key, current_sprint, start_time_t, sprint_stats, last_updated, revision)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)
             ON CONFLICT(user_key) DO UPDATE SET
                current_sprint = excluded.current_sprint,
                start_time_t   = excluded.start_time_t,
                sprint_stats   = excluded.sprint_stats,
                last_updated   = excluded.last_updated,
                revision       = timer_states.revision + 1
             RETURNING revision",
            params![
                key.as_str(),
                state.current_sprint.map(|s| s.as_str()),
                state.start_time_t,
                stats,
                Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(revision).unwrap_or(0))
    }

    fn create_initial(&self, key: &SessionKey, state: &BaseState) -> Result<bool, SyncError> {
        let stats = serde_json::to_string(&state.sprint_stats)?;
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO timer_states
                (user_key, current_sprint, start_time_t, sprint_stats, last_updated, created_at, revision)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, 1)",
            params![
                key.as_str(),
                state.current_sprint.map(|s| s.as_str()),
                state.start_time_t,
                stats,
                now,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn changes_since(
        &self,
        key: &SessionKey,
        revision: u64,
    ) -> Result<Option<StoredState>, SyncError> {
        let newer: Option<i64> = self
            .conn
            .query_row(
                "SELECT revision FROM timer_states WHERE user_key = ?1 AND revision > ?2",
                params![key.as_str(), i64::try_from(revision).unwrap_or(i64::MAX)],
                |row| row.get(0),
            )
            .optional()?;
        match newer {
            Some(_) => self.load(key),
            None => Ok(None),
        }
    }
}
