//! Runtime configuration.
//!
//! The core consumes configuration; it never produces or persists it.
//! The binary reads it from the environment, tests construct it
//! directly.

use crate::error::{Error, Result};

/// Default SQLite database filename.
pub const DEFAULT_DB_PATH: &str = "teledb.sqlite";

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Messaging-platform authentication token. Carried for the chat
    /// adapter; the core never inspects it.
    pub bot_token: String,
    /// The one fixed handle allowed to grant/revoke rights.
    pub super_admin_handle: String,
    /// Numeric id corroborating the super-admin handle for the most
    /// sensitive operations.
    pub admin_user_id: i64,
    /// Initial access password. `None` disables password auth entirely
    /// (every caller is implicitly authenticated).
    pub access_password: Option<String>,
    /// Path to the SQLite database.
    pub database_path: String,
    /// Enables the per-caller lookup rate limiter.
    pub rate_limit_enabled: bool,
    /// Enables the approved-user allow list. When disabled, any caller
    /// that passes password auth (if configured) may look up numbers.
    pub allow_list_enabled: bool,
    /// Whether denied/rate-limited lookups still write a query-log
    /// entry (with result_count = -1 meaning "not attempted").
    pub log_denied_queries: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            super_admin_handle: String::new(),
            admin_user_id: 0,
            access_password: None,
            database_path: DEFAULT_DB_PATH.to_string(),
            rate_limit_enabled: true,
            allow_list_enabled: true,
            log_denied_queries: false,
        }
    }
}

impl BotConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bot_token: env_string("BOT_TOKEN").unwrap_or_default(),
            super_admin_handle: env_string("SUPER_ADMIN_HANDLE").unwrap_or_default(),
            admin_user_id: env_string("ADMIN_USER_ID")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            access_password: env_string("ACCESS_PASSWORD").filter(|p| !p.is_empty()),
            database_path: env_string("DATABASE_PATH").unwrap_or(defaults.database_path),
            rate_limit_enabled: env_flag("RATE_LIMIT_ENABLED", defaults.rate_limit_enabled),
            allow_list_enabled: env_flag("ALLOW_LIST_ENABLED", defaults.allow_list_enabled),
            log_denied_queries: env_flag("LOG_DENIED_QUERIES", defaults.log_denied_queries),
        }
    }

    /// Validate that the fields a running bot cannot do without are set.
    pub fn validate(&self) -> Result<()> {
        if self.super_admin_handle.is_empty() {
            return Err(Error::Config("SUPER_ADMIN_HANDLE is not set".into()));
        }
        if self.admin_user_id == 0 {
            return Err(Error::Config("ADMIN_USER_ID is not set".into()));
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}
