//! In-memory record store.
//!
//! Used as the degraded-mode fallback when the SQLite file cannot be
//! opened, and by tests. Ordering semantics mirror the SQLite backend.

use super::{success_rate, PhoneRecord, PhoneStore, PhoneSummary, QueryLogEntry, StoreStats};
use crate::error::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    records: Vec<PhoneRecord>,
    query_log: Vec<QueryLogEntry>,
    next_id: i64,
}

/// Volatile record store. Everything is lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Storage("store lock poisoned".into()))
    }
}

impl PhoneStore for MemoryStore {
    fn insert(&self, phone: &str, content: &str) -> Result<i64> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.push(PhoneRecord {
            id,
            phone_number: phone.to_string(),
            content: content.trim().to_string(),
            created_at: Utc::now().timestamp(),
        });
        Ok(id)
    }

    fn find_by_phone(&self, phone: &str) -> Result<Vec<PhoneRecord>> {
        let inner = self.lock()?;
        let mut matches: Vec<PhoneRecord> = inner
            .records
            .iter()
            .filter(|r| r.phone_number == phone)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matches)
    }

    fn replace_content(&self, phone: &str, old: &str, new: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        let mut changed = false;
        for record in inner
            .records
            .iter_mut()
            .filter(|r| r.phone_number == phone && r.content == old)
        {
            record.content = new.trim().to_string();
            changed = true;
        }
        Ok(changed)
    }

    fn delete_by_phone(&self, phone: &str, content: Option<&str>) -> Result<usize> {
        let mut inner = self.lock()?;
        let before = inner.records.len();
        inner.records.retain(|r| {
            r.phone_number != phone || content.is_some_and(|c| r.content != c)
        });
        Ok(before - inner.records.len())
    }

    fn insert_bulk(&self, entries: &[(String, String)]) -> Result<usize> {
        for (phone, content) in entries {
            self.insert(phone, content)?;
        }
        Ok(entries.len())
    }

    fn summarize(&self) -> Result<Vec<PhoneSummary>> {
        let inner = self.lock()?;
        let mut by_phone: HashMap<&str, PhoneSummary> = HashMap::new();
        for record in &inner.records {
            let entry = by_phone
                .entry(record.phone_number.as_str())
                .or_insert_with(|| PhoneSummary {
                    phone_number: record.phone_number.clone(),
                    count: 0,
                    first_seen: record.created_at,
                    last_seen: record.created_at,
                });
            entry.count += 1;
            entry.first_seen = entry.first_seen.min(record.created_at);
            entry.last_seen = entry.last_seen.max(record.created_at);
        }
        let mut summaries: Vec<PhoneSummary> = by_phone.into_values().collect();
        summaries.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
        });
        Ok(summaries)
    }

    fn append_query_log(&self, entry: &QueryLogEntry) -> Result<()> {
        self.lock()?.query_log.push(entry.clone());
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let inner = self.lock()?;
        let unique_phones = inner
            .records
            .iter()
            .map(|r| r.phone_number.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len() as i64;
        let total_queries = inner.query_log.len() as i64;
        let successful_queries =
            inner.query_log.iter().filter(|q| q.result_count > 0).count() as i64;
        Ok(StoreStats {
            total_records: inner.records.len() as i64,
            unique_phones,
            total_queries,
            successful_queries,
            success_rate: success_rate(successful_queries, total_queries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_find_delete() {
        let s = MemoryStore::new();
        s.insert("01012345678", "a").unwrap();
        s.insert("01012345678", "b").unwrap();

        let rows = s.find_by_phone("01012345678").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content, "b");

        assert_eq!(s.delete_by_phone("01012345678", Some("a")).unwrap(), 1);
        assert_eq!(s.delete_by_phone("01012345678", None).unwrap(), 1);
        assert!(s.find_by_phone("01012345678").unwrap().is_empty());
    }

    #[test]
    fn test_replace_all_matching() {
        let s = MemoryStore::new();
        s.insert("01012345678", "x").unwrap();
        s.insert("01012345678", "x").unwrap();
        assert!(s.replace_content("01012345678", "x", "y").unwrap());
        let rows = s.find_by_phone("01012345678").unwrap();
        assert!(rows.iter().all(|r| r.content == "y"));
        assert!(!s.replace_content("01012345678", "x", "z").unwrap());
    }

    #[test]
    fn test_stats_match_sqlite_semantics() {
        let s = MemoryStore::new();
        s.insert("01011112222", "a").unwrap();
        s.append_query_log(&QueryLogEntry {
            caller_id: 1,
            caller_name: None,
            phone_number: "01011112222".into(),
            result_count: 1,
            queried_at: Utc::now().timestamp(),
        })
        .unwrap();
        s.append_query_log(&QueryLogEntry {
            caller_id: 2,
            caller_name: None,
            phone_number: "01099990000".into(),
            result_count: -1,
            queried_at: Utc::now().timestamp(),
        })
        .unwrap();

        let stats = s.stats().unwrap();
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.unique_phones, 1);
        assert_eq!(stats.total_queries, 2);
        assert_eq!(stats.successful_queries, 1);
        assert_eq!(stats.success_rate, 50.0);
    }
}
