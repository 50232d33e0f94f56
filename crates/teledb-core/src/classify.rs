//! Inbound message classification.

use crate::mode::{parse_stealth, StealthCommand};
use crate::phone::PhoneNumber;

/// What an inbound message turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A stealth-mode record command.
    Stealth(StealthCommand),
    /// A bare phone number, i.e. a lookup request.
    Lookup(PhoneNumber),
    /// A slash command with its arguments.
    Command {
        /// Command name without the slash, lowercased.
        name: String,
        /// Whitespace-separated arguments.
        args: Vec<String>,
    },
    /// Anything else; the engine answers with the format hint.
    Passthrough,
}

/// Classify message text. Slash commands always win; stealth parsing
/// applies only when the caller is in stealth mode.
pub fn classify(text: &str, in_stealth: bool) -> Inbound {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix('/') {
        let mut parts = rest.split_whitespace();
        let name = match parts.next() {
            Some(n) => n.to_lowercase(),
            None => return Inbound::Passthrough,
        };
        return Inbound::Command {
            name,
            args: parts.map(str::to_string).collect(),
        };
    }
    if in_stealth {
        if let Some(cmd) = parse_stealth(trimmed) {
            return Inbound::Stealth(cmd);
        }
    }
    match PhoneNumber::parse(trimmed) {
        Ok(phone) => Inbound::Lookup(phone),
        Err(_) => Inbound::Passthrough,
    }
}
