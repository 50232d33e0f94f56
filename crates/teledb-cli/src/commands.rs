//! CLI command implementations.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use teledb_core::chat::{ChatPort, InboundMessage, MessageRef};
use teledb_core::config::BotConfig;
use teledb_core::identity::Caller;
use teledb_core::phone::PhoneNumber;
use teledb_core::store::{open_store, PhoneStore, SqliteStore};
use teledb_core::BotEngine;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// Chat adapter that talks to the local console. Messages cannot be
/// unprinted, so deletions are no-ops.
struct ConsoleChat {
    next_ref: AtomicI64,
}

impl ConsoleChat {
    fn new() -> Self {
        Self {
            next_ref: AtomicI64::new(1),
        }
    }
}

#[async_trait::async_trait]
impl ChatPort for ConsoleChat {
    async fn send(&self, _caller_id: i64, text: &str) -> teledb_core::Result<MessageRef> {
        println!("{text}");
        Ok(MessageRef(self.next_ref.fetch_add(1, Ordering::SeqCst)))
    }

    async fn delete(&self, msg: MessageRef) -> teledb_core::Result<()> {
        debug!(message = msg.0, "console cannot retract messages");
        Ok(())
    }
}

fn resolve_db_path(database: Option<String>) -> String {
    database.unwrap_or_else(|| BotConfig::from_env().database_path)
}

fn open_db(database: Option<String>) -> Result<SqliteStore> {
    let path = resolve_db_path(database);
    SqliteStore::open(&path).with_context(|| format!("Failed to open database at {path}"))
}

/// Run the bot loop against stdin. Every line is delivered as the
/// super-admin, which makes the console a maintenance shell.
pub async fn run(database: Option<String>) -> Result<()> {
    let mut config = BotConfig::from_env();
    if let Some(path) = database {
        config.database_path = path;
    }
    config.validate().context("Invalid configuration")?;

    let store = open_store(&config.database_path);
    let caller = Caller::new(config.admin_user_id, config.super_admin_handle.clone());
    let chat: Arc<dyn ChatPort> = Arc::new(ConsoleChat::new());
    let engine = BotEngine::new(config, store, chat);
    let sweep = Arc::clone(engine.sessions()).spawn_sweep();

    info!("console session open, EOF to quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_msg = 0i64;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        next_msg += 1;
        engine
            .handle(InboundMessage {
                caller: caller.clone(),
                message: MessageRef(next_msg),
                text: line,
            })
            .await
            .context("Message handling failed")?;
    }
    sweep.abort();
    Ok(())
}

/// Add a record directly.
pub fn add(database: Option<String>, phone: &str, content: &str) -> Result<()> {
    let phone = PhoneNumber::parse(phone).context("Invalid phone number")?;
    let store = open_db(database)?;
    let id = store.insert(phone.as_str(), content)?;
    println!("Added record {id} for {}", phone.formatted());
    Ok(())
}

/// Print every record for a number.
pub fn search(database: Option<String>, phone: &str) -> Result<()> {
    let phone = PhoneNumber::parse(phone).context("Invalid phone number")?;
    let store = open_db(database)?;
    let records = store.find_by_phone(phone.as_str())?;
    if records.is_empty() {
        println!("No records for {}", phone.formatted());
        return Ok(());
    }
    println!("Records for {} ({} found):", phone.formatted(), records.len());
    for (i, record) in records.iter().enumerate() {
        let when = chrono::DateTime::from_timestamp(record.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| record.created_at.to_string());
        println!("{}. {} ({when})", i + 1, record.content);
    }
    Ok(())
}

/// Replace record text. Every record matching the old text is updated.
pub fn replace(database: Option<String>, phone: &str, old: &str, new: &str) -> Result<()> {
    let phone = PhoneNumber::parse(phone).context("Invalid phone number")?;
    let store = open_db(database)?;
    if store.replace_content(phone.as_str(), old, new)? {
        println!("Updated records for {}", phone.formatted());
    } else {
        println!("No matching records for {}", phone.formatted());
    }
    Ok(())
}

/// Delete records for a number, optionally only those with exact text.
pub fn delete(database: Option<String>, phone: &str, content: Option<&str>) -> Result<()> {
    let phone = PhoneNumber::parse(phone).context("Invalid phone number")?;
    let store = open_db(database)?;
    let count = store.delete_by_phone(phone.as_str(), content)?;
    println!("Deleted {count} record(s) for {}", phone.formatted());
    Ok(())
}

/// Print per-number aggregates, most-recorded first.
pub fn list(database: Option<String>) -> Result<()> {
    let store = open_db(database)?;
    let summaries = store.summarize()?;
    if summaries.is_empty() {
        println!("No records stored");
        return Ok(());
    }
    for item in summaries {
        println!("{}: {} record(s)", item.phone_number, item.count);
    }
    Ok(())
}

/// Print database statistics.
pub fn stats(database: Option<String>) -> Result<()> {
    let store = open_db(database)?;
    let s = store.stats()?;
    println!("Records:            {}", s.total_records);
    println!("Unique numbers:     {}", s.unique_phones);
    println!("Lookups:            {}", s.total_queries);
    println!("Successful lookups: {}", s.successful_queries);
    println!("Success rate:       {}%", s.success_rate);
    Ok(())
}
