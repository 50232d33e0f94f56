//! Caller identity and the dual-key scheme for rights lists.
//!
//! Rights can be granted against either a platform handle or a numeric
//! caller id, so membership checks must try both keys for a caller.

use std::fmt;

/// The identity attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Stable numeric id assigned by the chat platform.
    pub id: i64,
    /// Optional platform handle, without the leading `@`.
    pub handle: Option<String>,
}

impl Caller {
    /// Construct a caller with both id and handle.
    pub fn new(id: i64, handle: impl Into<String>) -> Self {
        Self {
            id,
            handle: Some(handle.into()),
        }
    }

    /// Construct a caller known only by numeric id.
    pub fn anonymous(id: i64) -> Self {
        Self { id, handle: None }
    }

    /// Whether this caller matches a rights-list key.
    pub fn matches(&self, key: &UserKey) -> bool {
        match key {
            UserKey::Id(id) => self.id == *id,
            UserKey::Handle(h) => self.handle.as_deref() == Some(h.as_str()),
        }
    }
}

/// A key in the admin or approved-user lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    /// Numeric caller id.
    Id(i64),
    /// Platform handle, stored without the leading `@`.
    Handle(String),
}

impl UserKey {
    /// Parse a command argument into a key.
    ///
    /// `@name` becomes a handle key, a run of digits becomes an id key,
    /// anything else is rejected.
    pub fn parse(arg: &str) -> Option<Self> {
        let arg = arg.trim();
        if let Some(handle) = arg.strip_prefix('@') {
            if handle.is_empty() {
                return None;
            }
            return Some(UserKey::Handle(handle.to_string()));
        }
        if !arg.is_empty() && arg.chars().all(|c| c.is_ascii_digit()) {
            return arg.parse().ok().map(UserKey::Id);
        }
        None
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Id(id) => write!(f, "{id}"),
            UserKey::Handle(h) => write!(f, "@{h}"),
        }
    }
}
