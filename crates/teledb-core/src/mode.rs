//! Stealth admin mode.
//!
//! While active for a caller, plain messages of the form
//! `<phone> <payload>` are reinterpreted as record commands and the
//! conversation is scrubbed as it goes. The mode is per-caller runtime
//! state and resets on restart.

use crate::phone::PhoneNumber;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Payloads that mean "delete every record" instead of "add this text".
pub const DELETE_TOKENS: [&str; 3] = ["d", "del", "삭제"];

/// Result of toggling stealth mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StealthToggle {
    /// The caller just entered stealth mode.
    Entered,
    /// The caller just left stealth mode.
    Exited,
}

/// What a stealth message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StealthAction {
    /// Remove every record for the number.
    DeleteAll,
    /// Append a record with this content.
    Add(String),
}

/// A parsed stealth message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthCommand {
    /// Target number.
    pub phone: PhoneNumber,
    /// Requested action.
    pub action: StealthAction,
}

/// Tracks which callers are currently in stealth mode.
#[derive(Default)]
pub struct ModeController {
    active: RwLock<HashSet<i64>>,
}

impl ModeController {
    /// Create with no one in stealth mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip stealth mode for a caller.
    pub async fn toggle(&self, caller_id: i64) -> StealthToggle {
        let mut active = self.active.write().await;
        if active.remove(&caller_id) {
            StealthToggle::Exited
        } else {
            active.insert(caller_id);
            StealthToggle::Entered
        }
    }

    /// Leave stealth mode. Returns whether the caller was in it.
    pub async fn exit(&self, caller_id: i64) -> bool {
        self.active.write().await.remove(&caller_id)
    }

    /// Whether a caller is currently in stealth mode.
    pub async fn is_active(&self, caller_id: i64) -> bool {
        self.active.read().await.contains(&caller_id)
    }
}

/// Parse a stealth-mode message. Returns `None` when the text does not
/// split into a valid phone number and a non-empty payload; such
/// messages fall through to normal handling.
pub fn parse_stealth(text: &str) -> Option<StealthCommand> {
    let (head, tail) = text.trim().split_once(char::is_whitespace)?;
    let phone = PhoneNumber::parse(head).ok()?;
    let payload = tail.trim();
    if payload.is_empty() {
        return None;
    }
    let action = if DELETE_TOKENS.contains(&payload) {
        StealthAction::DeleteAll
    } else {
        StealthAction::Add(payload.to_string())
    };
    Some(StealthCommand { phone, action })
}
