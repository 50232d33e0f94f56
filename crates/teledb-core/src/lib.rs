//! # TeleDB Core Library
//!
//! A phone-number lookup bot core: given a phone number, return every
//! freeform text record ever associated with it. Duplicate entries per
//! number are preserved, and all access is gated behind a tiered
//! authorization layer.
//!
//! ## Access Model
//!
//! Callers resolve to one of four tiers:
//! - Super-admin: a single fixed handle, the only identity that may
//!   grant or revoke rights
//! - Admin: may add, delete and inspect records
//! - Approved: may perform lookups
//! - Unknown: receives only generic denials
//!
//! On top of tiers sit password sessions (24h expiry), a per-caller
//! rate limiter, and a "stealth admin" interaction mode that
//! reinterprets plain messages as record commands while scrubbing the
//! conversation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          chat adapter (external)        │
//! ├─────────────────────────────────────────┤
//! │   engine  │  classify  │  mode  │ retract│
//! ├─────────────────────────────────────────┤
//! │        auth (access, sessions)          │
//! ├─────────────────────────────────────────┤
//! │        store (sqlite / memory)          │
//! └─────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod auth;
pub mod chat;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod mode;
pub mod phone;
pub mod render;
pub mod retract;
pub mod store;

pub use config::BotConfig;
pub use engine::BotEngine;
pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
