use std::{
    marker::PhantomData,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, SecondsFormat, Utc};
use delayq_core::{config::DEFAULT_TABLE_NAME, Job, JobFactory, JobId};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::{
    db::init_db,
    error::{Result, StorageError},
    storage::{check_due_time, new_job_id, rebuild, Storage},
};

/// SQLite-backed storage: one row per scheduled entry.
///
/// Pushes are independent inserts, so scheduling from other tasks while the
/// dispatch loop polls is safe.
pub struct SqliteStorage<C> {
    conn: Mutex<Connection>,
    factory: Arc<dyn JobFactory<C>>,
    table: String,
    _ctx: PhantomData<fn(C)>,
}

impl<C> SqliteStorage<C> {
    /// Wrap `conn`, creating the default `delayq_jobs` table if needed.
    pub fn new(conn: Connection, factory: Arc<dyn JobFactory<C>>) -> Result<Self> {
        Self::with_table_name(conn, factory, DEFAULT_TABLE_NAME)
    }

    /// Wrap `conn` using `table` for the entries. Fails if the table cannot be created.
    pub fn with_table_name(
        conn: Connection,
        factory: Arc<dyn JobFactory<C>>,
        table: &str,
    ) -> Result<Self> {
        init_db(&conn, table)?;
        info!(%table, "sqlite storage ready");
        Ok(Self {
            conn: Mutex::new(conn),
            factory,
            table: table.to_string(),
            _ctx: PhantomData,
        })
    }

    /// Open (or create) the database file at `path` in WAL mode.
    pub fn open(
        path: impl AsRef<Path>,
        factory: Arc<dyn JobFactory<C>>,
        table: &str,
    ) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_table_name(conn, factory, table)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl<C: 'static> Storage<C> for SqliteStorage<C> {
    fn push(&self, job: &mut dyn Job<C>, due_at: DateTime<Utc>) -> Result<JobId> {
        check_due_time(due_at)?;
        let id = new_job_id();
        let state = serde_json::to_string(&job.state_with_id(&id)?)?;

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, time, state, type) VALUES (?1, ?2, ?3, ?4)",
                self.table
            ),
            rusqlite::params![id.as_str(), format_time(due_at), state, job.kind()],
        )?;
        job.set_id(id.clone());

        info!(job_id = %id, kind = %job.kind(), %due_at, "job pushed");
        Ok(id)
    }

    fn delete(&self, id: &JobId) -> Result<()> {
        let conn = self.conn()?;
        let n = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table),
            [id.as_str()],
        )?;
        if n == 0 {
            debug!(job_id = %id, "delete: no such entry");
        } else {
            info!(job_id = %id, "job deleted");
        }
        Ok(())
    }

    fn get_due(&self, now: DateTime<Utc>) -> Result<Vec<Box<dyn Job<C>>>> {
        // Collect rows first so the lock is released before the factory runs.
        // Columns: id, state, type
        let rows: Vec<(String, String, String)> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT id, state, type FROM {}
                 WHERE time <= ?1
                 ORDER BY time, rowid",
                self.table
            ))?;
            let rows = stmt
                .query_map([format_time(now)], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<rusqlite::Result<_>>()?;
            rows
        };

        debug!(count = rows.len(), "due rows fetched");

        rows.into_iter()
            .map(|(id, state, kind)| {
                let state: serde_json::Value = serde_json::from_str(&state)?;
                rebuild(self.factory.as_ref(), &kind, JobId::from(id), state)
            })
            .collect()
    }

    fn len(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Fixed-width UTC text, e.g. `2026-10-18T09:30:00.000000000Z`, for years
/// 0000-9999 (see [`check_due_time`]).
pub(crate) fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn time_text_orders_like_instants() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::nanoseconds(1);
        let c = a + chrono::Duration::days(400);

        assert_eq!(format_time(a), "2026-01-02T03:04:05.000000000Z");
        assert_eq!(format_time(a).len(), format_time(b).len());
        assert!(format_time(a) < format_time(b));
        assert!(format_time(b) < format_time(c));
    }
}
