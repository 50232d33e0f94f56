//! Reply text builders.
//!
//! All user-visible strings live here so the engine stays readable and
//! the denial messages stay uniform. Unauthorized privileged commands
//! and genuinely unknown commands must render identically, so neither
//! leaks which commands exist.

use crate::identity::UserKey;
use crate::phone::PhoneNumber;
use crate::retract::{RESULT_RETRACT_SECS, STEALTH_RETRACT_SECS};
use crate::store::{PhoneRecord, PhoneSummary, StoreStats};
use chrono::DateTime;

/// Maximum numbers shown by the roster listing.
pub const LIST_LIMIT: usize = 20;

fn format_ts(ts: i64) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// `/start` greeting.
pub fn welcome() -> String {
    "Phone record lookup bot.\n\
     Send a phone number to search for records.\n\
     Use /help to see available commands."
        .to_string()
}

/// `/help` text. Shows only what the caller's tier can actually use.
pub fn help(is_admin: bool, is_super_admin: bool) -> String {
    let mut out = String::from(
        "Commands:\n\
         /start - introduction\n\
         /help - this message\n\
         /search <number> - look up records\n\
         /auth <password> - open an access session\n\
         /logout - close your session\n",
    );
    if is_admin {
        out.push_str(
            "/add <number> <text> - add a record\n\
             /delete <number> [text] - delete records\n\
             /list - most-recorded numbers\n\
             /bulk <number> <text> per line - add many records\n\
             /stats - database statistics\n\
             /security - access-control status\n",
        );
    }
    if is_super_admin {
        out.push_str(
            "/approve <user> - allow lookups\n\
             /disapprove <user> - revoke lookups\n\
             /users - approved users\n\
             /admin <user> - grant admin\n\
             /unadmin <user> - revoke admin\n\
             /admins - admin list\n\
             /passwd <new> - change the access password\n\
             /sa - toggle stealth mode\n\
             /exit_admin - leave stealth mode\n",
        );
    }
    out.push_str("\nSend a bare phone number to search directly.");
    out
}

/// Hint shown when a lookup input does not validate.
pub fn format_help() -> String {
    "That doesn't look like a valid phone number.\n\
     Mobile numbers start with 010 (11 digits) or with\n\
     011/016/017/018/019 (10 or 11 digits). Hyphens and spaces are fine."
        .to_string()
}

/// Rate-limit rejection.
pub fn throttled() -> String {
    "Too many lookups. Please wait a minute and try again.".to_string()
}

/// Generic denial. Mentions /auth only when a password session could
/// actually help.
pub fn access_denied(needs_auth: bool) -> String {
    if needs_auth {
        "Access denied. Authenticate with /auth <password>.".to_string()
    } else {
        "Access denied.".to_string()
    }
}

/// `/auth` outcomes.
pub fn auth_usage() -> String {
    "Usage: /auth <password>".to_string()
}

/// Successful `/auth`.
pub fn auth_ok() -> String {
    "Authenticated. Your session is valid for 24 hours.".to_string()
}

/// Failed `/auth`.
pub fn auth_failed() -> String {
    "Authentication failed.".to_string()
}

/// `/auth` when no password is configured.
pub fn auth_not_needed() -> String {
    "No password is configured; you already have access.".to_string()
}

/// `/logout` outcomes.
pub fn logout_ok() -> String {
    "Session closed.".to_string()
}

/// `/logout` with no session open.
pub fn logout_none() -> String {
    "You had no open session.".to_string()
}

/// Lookup hit: enumerated records, newest first.
pub fn results(phone: &PhoneNumber, records: &[PhoneRecord]) -> String {
    let mut out = format!(
        "Records for {} ({} found):\n",
        phone.formatted(),
        records.len()
    );
    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} ({})\n",
            i + 1,
            record.content,
            format_ts(record.created_at)
        ));
    }
    out.push_str(&format!(
        "\nThis message self-destructs in {RESULT_RETRACT_SECS} seconds."
    ));
    out
}

/// Lookup miss.
pub fn not_found(phone: &PhoneNumber) -> String {
    format!("No records for {}.", phone.formatted())
}

/// Lookup failure that must not leak storage details.
pub fn lookup_failed() -> String {
    "Lookup failed. Please try again later.".to_string()
}

/// Write failure that must not leak storage details.
pub fn operation_failed() -> String {
    "Operation failed. Please try again later.".to_string()
}

/// `/stats` report.
pub fn stats(s: &StoreStats) -> String {
    format!(
        "Database statistics:\n\
         Records: {}\n\
         Unique numbers: {}\n\
         Lookups: {}\n\
         Successful lookups: {}\n\
         Success rate: {}%",
        s.total_records, s.unique_phones, s.total_queries, s.successful_queries, s.success_rate
    )
}

/// `/list` report, capped at [`LIST_LIMIT`] numbers.
pub fn summary(items: &[PhoneSummary]) -> String {
    if items.is_empty() {
        return "No records stored yet.".to_string();
    }
    let mut out = String::from("Most recorded numbers:\n");
    for (i, item) in items.iter().take(LIST_LIMIT).enumerate() {
        out.push_str(&format!(
            "{}. {} - {} record(s), last {}\n",
            i + 1,
            item.phone_number,
            item.count,
            format_ts(item.last_seen)
        ));
    }
    if items.len() > LIST_LIMIT {
        out.push_str(&format!("... and {} more", items.len() - LIST_LIMIT));
    }
    out
}

/// The one reply for both nonexistent commands and privileged commands
/// from callers who may not use them.
pub fn unknown_command() -> String {
    "Unknown command. Use /help to see available commands.".to_string()
}

/// Stealth mode banners.
pub fn stealth_on() -> String {
    format!(
        "Stealth mode ON.\n\
         Send \"<number> <text>\" to add a record.\n\
         Send \"<number> d\" to delete all records for a number.\n\
         Confirmations self-destruct in {STEALTH_RETRACT_SECS} seconds."
    )
}

/// Stealth mode disabled.
pub fn stealth_off() -> String {
    "Stealth mode OFF.".to_string()
}

/// `/exit_admin` without stealth mode active.
pub fn stealth_not_active() -> String {
    "Stealth mode is not active.".to_string()
}

/// `/add` and stealth-add confirmation.
pub fn added(phone: &PhoneNumber) -> String {
    format!("Record added for {}.", phone.formatted())
}

/// `/add` argument hint.
pub fn add_usage() -> String {
    "Usage: /add <number> <text>".to_string()
}

/// `/delete` and stealth-delete confirmations.
pub fn deleted(phone: &PhoneNumber, count: usize) -> String {
    if count == 0 {
        format!("Nothing to delete for {}.", phone.formatted())
    } else {
        format!("Deleted {} record(s) for {}.", count, phone.formatted())
    }
}

/// `/delete` argument hint.
pub fn delete_usage() -> String {
    "Usage: /delete <number> [text]".to_string()
}

/// `/bulk` report.
pub fn bulk_report(stored: usize, skipped: usize) -> String {
    format!("Bulk add: {stored} stored, {skipped} skipped.")
}

/// `/bulk` argument hint.
pub fn bulk_usage() -> String {
    "Usage: /bulk, then one \"<number> <text>\" per line.".to_string()
}

/// Roster listings.
pub fn roster(title: &str, keys: &[UserKey]) -> String {
    let mut out = format!("{title} ({}):\n", keys.len());
    for key in keys {
        out.push_str(&format!("- {key}\n"));
    }
    out
}

/// User-management confirmations.
pub fn user_approved(key: &UserKey) -> String {
    format!("{key} may now perform lookups.")
}

/// `/disapprove` confirmation.
pub fn user_disapproved(key: &UserKey) -> String {
    format!("{key} may no longer perform lookups.")
}

/// Revocation target was absent (or protected).
pub fn user_not_found(key: &UserKey) -> String {
    format!("{key} was not on the list.")
}

/// `/admin` confirmation.
pub fn admin_granted(key: &UserKey) -> String {
    format!("{key} is now an admin.")
}

/// `/unadmin` confirmation.
pub fn admin_revoked(key: &UserKey) -> String {
    format!("{key} is no longer an admin.")
}

/// Unparseable user argument.
pub fn user_arg_invalid() -> String {
    "Specify a user as @handle or numeric id.".to_string()
}

/// `/passwd` outcomes.
pub fn passwd_usage() -> String {
    "Usage: /passwd <new password>".to_string()
}

/// `/passwd` success.
pub fn passwd_ok() -> String {
    "Password changed. Existing sessions remain valid.".to_string()
}

/// `/passwd` validation failure.
pub fn passwd_rejected() -> String {
    "Password rejected: it must be at least 3 characters and differ from the current one."
        .to_string()
}

/// `/security` report.
pub fn security_info(
    password_set: bool,
    rate_limit_enabled: bool,
    allow_list_enabled: bool,
    sessions: usize,
    approved: usize,
    admins: usize,
) -> String {
    format!(
        "Access control status:\n\
         Password auth: {}\n\
         Rate limiting: {}\n\
         Allow list: {}\n\
         Open sessions: {}\n\
         Approved users: {}\n\
         Admins: {}",
        on_off(password_set),
        on_off(rate_limit_enabled),
        on_off(allow_list_enabled),
        sessions,
        approved,
        admins
    )
}

fn on_off(v: bool) -> &'static str {
    if v {
        "on"
    } else {
        "off"
    }
}
