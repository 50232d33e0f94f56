//! SQLite-backed record store.

use super::schema::CREATE_SCHEMA;
use super::{success_rate, PhoneRecord, PhoneStore, PhoneSummary, QueryLogEntry, StoreStats};
use crate::error::{Error, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Record store backed by a SQLite database file.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema
    /// exists. The parent directory must already exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("connection lock poisoned".into()))
    }
}

impl PhoneStore for SqliteStore {
    fn insert(&self, phone: &str, content: &str) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO phone_records (phone_number, content, created_at) VALUES (?1, ?2, ?3)",
            params![phone, content.trim(), Utc::now().timestamp()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn find_by_phone(&self, phone: &str) -> Result<Vec<PhoneRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, phone_number, content, created_at FROM phone_records
             WHERE phone_number = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![phone], |row| {
            Ok(PhoneRecord {
                id: row.get(0)?,
                phone_number: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn replace_content(&self, phone: &str, old: &str, new: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE phone_records SET content = ?1 WHERE phone_number = ?2 AND content = ?3",
            params![new.trim(), phone, old],
        )?;
        Ok(changed > 0)
    }

    fn delete_by_phone(&self, phone: &str, content: Option<&str>) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = match content {
            Some(content) => conn.execute(
                "DELETE FROM phone_records WHERE phone_number = ?1 AND content = ?2",
                params![phone, content],
            )?,
            None => conn.execute(
                "DELETE FROM phone_records WHERE phone_number = ?1",
                params![phone],
            )?,
        };
        Ok(deleted)
    }

    fn insert_bulk(&self, entries: &[(String, String)]) -> Result<usize> {
        let mut conn = self.lock()?;
        let now = Utc::now().timestamp();
        let tx = conn.transaction()?;
        let mut stored = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO phone_records (phone_number, content, created_at) VALUES (?1, ?2, ?3)",
            )?;
            for (phone, content) in entries {
                stmt.execute(params![phone, content.trim(), now])?;
                stored += 1;
            }
        }
        tx.commit()?;
        Ok(stored)
    }

    fn summarize(&self) -> Result<Vec<PhoneSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT phone_number, COUNT(*), MIN(created_at), MAX(created_at)
             FROM phone_records GROUP BY phone_number
             ORDER BY COUNT(*) DESC, MAX(created_at) DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PhoneSummary {
                phone_number: row.get(0)?,
                count: row.get(1)?,
                first_seen: row.get(2)?,
                last_seen: row.get(3)?,
            })
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    fn append_query_log(&self, entry: &QueryLogEntry) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO query_log (caller_id, caller_name, phone_number, result_count, queried_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.caller_id,
                entry.caller_name,
                entry.phone_number,
                entry.result_count,
                entry.queried_at,
            ],
        )?;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;
        let total_records: i64 =
            conn.query_row("SELECT COUNT(*) FROM phone_records", [], |r| r.get(0))?;
        let unique_phones: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT phone_number) FROM phone_records",
            [],
            |r| r.get(0),
        )?;
        let total_queries: i64 =
            conn.query_row("SELECT COUNT(*) FROM query_log", [], |r| r.get(0))?;
        let successful_queries: i64 = conn.query_row(
            "SELECT COUNT(*) FROM query_log WHERE result_count > 0",
            [],
            |r| r.get(0),
        )?;
        Ok(StoreStats {
            total_records,
            unique_phones,
            total_queries,
            successful_queries,
            success_rate: success_rate(successful_queries, total_queries),
        })
    }
}
