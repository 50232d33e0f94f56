//! Authorization: tier lists, password sessions, and rate limiting.

mod access;
mod session;

pub use access::{AccessControl, Tier};
pub use session::SessionAuthenticator;

/// Password session lifetime in seconds (24 hours).
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Interval between expired-session sweeps in seconds (1 hour).
pub const SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// Rate-limit window length in seconds.
pub const RATE_WINDOW_SECS: i64 = 60;

/// Maximum lookups allowed per window.
pub const RATE_MAX_QUERIES: u32 = 10;
