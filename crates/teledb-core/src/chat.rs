//! Chat transport abstraction.
//!
//! The engine only ever sends text and deletes messages; everything
//! platform-specific lives behind [`ChatPort`].

use crate::error::Result;
use crate::identity::Caller;
use async_trait::async_trait;

/// Opaque reference to a delivered message, used for later deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub i64);

/// An inbound message handed to the engine.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Who sent it.
    pub caller: Caller,
    /// Platform reference to the message itself, so the engine can
    /// scrub it in stealth mode.
    pub message: MessageRef,
    /// Raw message text.
    pub text: String,
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Send `text` to the conversation with `caller_id`, returning a
    /// reference to the delivered message.
    async fn send(&self, caller_id: i64, text: &str) -> Result<MessageRef>;

    /// Delete a previously delivered (or received) message.
    async fn delete(&self, msg: MessageRef) -> Result<()>;
}
