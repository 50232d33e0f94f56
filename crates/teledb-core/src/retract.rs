//! Delayed message retraction.
//!
//! Sensitive replies self-destruct after a delay. Deletions are
//! best-effort: the message may already be gone or the platform may
//! refuse, and neither should surface to the user.

use crate::chat::{ChatPort, MessageRef};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How long lookup results (and the triggering message) stay visible.
pub const RESULT_RETRACT_SECS: u64 = 30;

/// How long stealth-mode confirmations stay visible.
pub const STEALTH_RETRACT_SECS: u64 = 5;

/// Schedules best-effort deletions against the chat port.
#[derive(Clone)]
pub struct Retractor {
    chat: Arc<dyn ChatPort>,
}

impl Retractor {
    /// Wrap a chat port.
    pub fn new(chat: Arc<dyn ChatPort>) -> Self {
        Self { chat }
    }

    /// Delete `msg` after `delay`. Failures are logged and dropped.
    pub fn schedule_delete(&self, msg: MessageRef, delay: Duration) {
        let chat = Arc::clone(&self.chat);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = chat.delete(msg).await {
                debug!(message = msg.0, error = %e, "retraction failed");
            }
        });
    }

    /// Delete `msg` right away, same best-effort contract.
    pub async fn delete_now(&self, msg: MessageRef) {
        if let Err(e) = self.chat.delete(msg).await {
            debug!(message = msg.0, error = %e, "immediate deletion failed");
        }
    }
}
