//! SQLite schema for phone records and the query log.

/// Schema version for future migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create the database schema.
pub const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS phone_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    phone_number TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_phone
    ON phone_records(phone_number);

CREATE TABLE IF NOT EXISTS query_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    caller_id INTEGER NOT NULL,
    caller_name TEXT,
    phone_number TEXT NOT NULL,
    result_count INTEGER NOT NULL DEFAULT 0,
    queried_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_query_log_caller
    ON query_log(caller_id);
"#;
