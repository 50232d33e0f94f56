//! Record storage.
//!
//! Two backends implement [`PhoneStore`]: SQLite for the daemon and an
//! in-memory map used both as the degraded-mode fallback and in tests.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use schema::{CREATE_SCHEMA, SCHEMA_VERSION};
pub use sqlite::SqliteStore;

use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// A stored phone record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneRecord {
    /// Row id.
    pub id: i64,
    /// Normalized phone number.
    pub phone_number: String,
    /// Freeform text associated with the number.
    pub content: String,
    /// Unix timestamp of insertion.
    pub created_at: i64,
}

/// One entry in the query audit log.
#[derive(Debug, Clone, Serialize)]
pub struct QueryLogEntry {
    /// Numeric id of the caller.
    pub caller_id: i64,
    /// Caller handle if known.
    pub caller_name: Option<String>,
    /// The number that was looked up.
    pub phone_number: String,
    /// Number of records returned. `-1` means the lookup was denied
    /// before it ran.
    pub result_count: i64,
    /// Unix timestamp of the lookup.
    pub queried_at: i64,
}

/// Per-number aggregate used by the roster listing.
#[derive(Debug, Clone, Serialize)]
pub struct PhoneSummary {
    /// Normalized phone number.
    pub phone_number: String,
    /// Number of records stored for it.
    pub count: i64,
    /// Oldest record timestamp.
    pub first_seen: i64,
    /// Newest record timestamp.
    pub last_seen: i64,
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Total record rows.
    pub total_records: i64,
    /// Distinct phone numbers.
    pub unique_phones: i64,
    /// Total logged lookups, denied ones included.
    pub total_queries: i64,
    /// Lookups that returned at least one record.
    pub successful_queries: i64,
    /// Percentage of successful lookups, rounded to two decimals.
    pub success_rate: f64,
}

/// Storage backend for phone records and the query log.
pub trait PhoneStore: Send + Sync {
    /// Insert a record, returning its row id. Content is stored
    /// trimmed; duplicates for the same number are kept as distinct
    /// rows.
    fn insert(&self, phone: &str, content: &str) -> Result<i64>;

    /// All records for a number, newest first (ties broken by higher
    /// row id first).
    fn find_by_phone(&self, phone: &str) -> Result<Vec<PhoneRecord>>;

    /// Replace the content of every record for `phone` whose content
    /// equals `old`. Returns true when at least one row changed.
    fn replace_content(&self, phone: &str, old: &str, new: &str) -> Result<bool>;

    /// Delete records for a number. With `content` set, only rows with
    /// that exact content go; otherwise all of them. Returns the number
    /// of rows removed.
    fn delete_by_phone(&self, phone: &str, content: Option<&str>) -> Result<usize>;

    /// Insert many (phone, content) pairs, returning how many were
    /// stored. Pairs are pre-validated by the caller.
    fn insert_bulk(&self, entries: &[(String, String)]) -> Result<usize>;

    /// Per-number aggregates, most-recorded first (ties broken by most
    /// recently seen).
    fn summarize(&self) -> Result<Vec<PhoneSummary>>;

    /// Append an audit entry for a lookup.
    fn append_query_log(&self, entry: &QueryLogEntry) -> Result<()>;

    /// Aggregate statistics across records and the query log.
    fn stats(&self) -> Result<StoreStats>;
}

/// Open the SQLite store at `path`, degrading to an in-memory store if
/// the database cannot be opened. The bot stays up either way; records
/// written in degraded mode are lost on restart.
pub fn open_store<P: AsRef<Path>>(path: P) -> Arc<dyn PhoneStore> {
    let path = path.as_ref();
    match SqliteStore::open(path) {
        Ok(store) => {
            info!(path = %path.display(), "opened sqlite store");
            Arc::new(store)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "sqlite unavailable, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Round a success ratio to a two-decimal percentage.
pub(crate) fn success_rate(successful: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = successful as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}
