//! Password sessions and the lookup rate limiter.
//!
//! Sessions are keyed by caller id and expire 24 hours after the last
//! successful authentication. The rate limiter is a lazy fixed window:
//! the window resets on the first query after it elapses, no background
//! bookkeeping per caller.

use super::{RATE_MAX_QUERIES, RATE_WINDOW_SECS, SESSION_TTL_SECS, SWEEP_INTERVAL_SECS};
use crate::error::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct RateWindow {
    window_start: i64,
    count: u32,
}

struct State {
    password: Option<String>,
    sessions: HashMap<i64, i64>,
    rate: HashMap<i64, RateWindow>,
}

/// Password session and rate-limit tracking.
pub struct SessionAuthenticator {
    rate_limit_enabled: bool,
    inner: RwLock<State>,
}

impl SessionAuthenticator {
    /// Create the authenticator. `password: None` makes every caller
    /// implicitly authenticated.
    pub fn new(password: Option<String>, rate_limit_enabled: bool) -> Self {
        Self {
            rate_limit_enabled,
            inner: RwLock::new(State {
                password,
                sessions: HashMap::new(),
                rate: HashMap::new(),
            }),
        }
    }

    /// Whether a password is configured at all.
    pub async fn has_password(&self) -> bool {
        self.inner.read().await.password.is_some()
    }

    /// Try to open a session with `attempt`. With no password
    /// configured this always succeeds without recording anything.
    pub async fn authenticate(&self, caller_id: i64, attempt: &str) -> bool {
        self.authenticate_at(caller_id, attempt, Utc::now().timestamp())
            .await
    }

    pub(crate) async fn authenticate_at(&self, caller_id: i64, attempt: &str, now: i64) -> bool {
        let mut state = self.inner.write().await;
        match &state.password {
            None => true,
            Some(p) if p == attempt => {
                state.sessions.insert(caller_id, now);
                info!(caller = caller_id, "session opened");
                true
            }
            Some(_) => {
                debug!(caller = caller_id, "failed authentication attempt");
                false
            }
        }
    }

    /// Whether the caller holds a live session (always true when no
    /// password is configured).
    pub async fn is_authenticated(&self, caller_id: i64) -> bool {
        self.is_authenticated_at(caller_id, Utc::now().timestamp())
            .await
    }

    pub(crate) async fn is_authenticated_at(&self, caller_id: i64, now: i64) -> bool {
        let state = self.inner.read().await;
        if state.password.is_none() {
            return true;
        }
        match state.sessions.get(&caller_id) {
            Some(&opened) => now - opened <= SESSION_TTL_SECS,
            None => false,
        }
    }

    /// Drop the caller's session. Returns whether one existed.
    pub async fn logout(&self, caller_id: i64) -> bool {
        self.inner.write().await.sessions.remove(&caller_id).is_some()
    }

    /// Change the password. Existing sessions stay valid. Rejects
    /// passwords shorter than 3 characters and no-op changes.
    pub async fn change_password(&self, new: &str) -> Result<()> {
        if new.len() < 3 {
            return Err(Error::Validation("password too short".into()));
        }
        let mut state = self.inner.write().await;
        if state.password.as_deref() == Some(new) {
            return Err(Error::Validation("password unchanged".into()));
        }
        state.password = Some(new.to_string());
        info!("access password changed");
        Ok(())
    }

    /// Record one lookup against the caller's rate window.
    pub async fn record_query(&self, caller_id: i64) {
        self.record_query_at(caller_id, Utc::now().timestamp()).await
    }

    pub(crate) async fn record_query_at(&self, caller_id: i64, now: i64) {
        let mut state = self.inner.write().await;
        let window = state.rate.entry(caller_id).or_insert(RateWindow {
            window_start: now,
            count: 0,
        });
        if now - window.window_start >= RATE_WINDOW_SECS {
            window.window_start = now;
            window.count = 0;
        }
        window.count += 1;
    }

    /// Whether the caller has exhausted the current window.
    pub async fn is_rate_limited(&self, caller_id: i64) -> bool {
        self.is_rate_limited_at(caller_id, Utc::now().timestamp())
            .await
    }

    pub(crate) async fn is_rate_limited_at(&self, caller_id: i64, now: i64) -> bool {
        if !self.rate_limit_enabled {
            return false;
        }
        let state = self.inner.read().await;
        match state.rate.get(&caller_id) {
            Some(w) => now - w.window_start < RATE_WINDOW_SECS && w.count >= RATE_MAX_QUERIES,
            None => false,
        }
    }

    /// Remove expired sessions, returning how many were dropped.
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now().timestamp()).await
    }

    pub(crate) async fn sweep_expired_at(&self, now: i64) -> usize {
        let mut state = self.inner.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, opened| now - *opened <= SESSION_TTL_SECS);
        before - state.sessions.len()
    }

    /// Number of currently tracked sessions (live or not yet swept).
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Spawn the hourly sweep of expired sessions.
    pub fn spawn_sweep(self: Arc<Self>) -> JoinHandle<()> {
        let auth = self;
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let dropped = auth.sweep_expired().await;
                if dropped > 0 {
                    info!(dropped, "swept expired sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> SessionAuthenticator {
        SessionAuthenticator::new(Some("hunter2".into()), true)
    }

    #[tokio::test]
    async fn test_authenticate_and_expiry() {
        let a = auth();
        assert!(!a.is_authenticated_at(1, 0).await);

        assert!(!a.authenticate_at(1, "wrong", 0).await);
        assert!(!a.is_authenticated_at(1, 0).await);

        assert!(a.authenticate_at(1, "hunter2", 0).await);
        assert!(a.is_authenticated_at(1, SESSION_TTL_SECS).await);
        assert!(!a.is_authenticated_at(1, SESSION_TTL_SECS + 1).await);
    }

    #[tokio::test]
    async fn test_no_password_is_pass_through() {
        let a = SessionAuthenticator::new(None, true);
        assert!(!a.has_password().await);
        assert!(a.authenticate_at(1, "anything", 0).await);
        assert!(a.is_authenticated_at(2, 0).await);
        // Pass-through auth records no session.
        assert_eq!(a.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_logout() {
        let a = auth();
        assert!(a.authenticate_at(1, "hunter2", 0).await);
        assert!(a.logout(1).await);
        assert!(!a.is_authenticated_at(1, 1).await);
        assert!(!a.logout(1).await);
    }

    #[tokio::test]
    async fn test_change_password_keeps_sessions() {
        let a = auth();
        assert!(a.authenticate_at(1, "hunter2", 0).await);

        assert!(a.change_password("ab").await.is_err());
        assert!(a.change_password("hunter2").await.is_err());
        a.change_password("correct horse").await.unwrap();

        assert!(a.is_authenticated_at(1, 10).await);
        assert!(!a.authenticate_at(2, "hunter2", 10).await);
        assert!(a.authenticate_at(2, "correct horse", 10).await);
    }

    #[tokio::test]
    async fn test_rate_limit_window() {
        let a = auth();
        for _ in 0..RATE_MAX_QUERIES {
            assert!(!a.is_rate_limited_at(1, 0).await);
            a.record_query_at(1, 0).await;
        }
        assert!(a.is_rate_limited_at(1, 0).await);
        // Other callers are unaffected.
        assert!(!a.is_rate_limited_at(2, 0).await);
        // A full window later the counter lazily resets.
        assert!(!a.is_rate_limited_at(1, RATE_WINDOW_SECS).await);
        a.record_query_at(1, RATE_WINDOW_SECS).await;
        assert!(!a.is_rate_limited_at(1, RATE_WINDOW_SECS).await);
    }

    #[tokio::test]
    async fn test_rate_limit_disabled() {
        let a = SessionAuthenticator::new(Some("hunter2".into()), false);
        for _ in 0..RATE_MAX_QUERIES * 2 {
            a.record_query_at(1, 0).await;
        }
        assert!(!a.is_rate_limited_at(1, 0).await);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let a = auth();
        assert!(a.authenticate_at(1, "hunter2", 0).await);
        assert!(a.authenticate_at(2, "hunter2", SESSION_TTL_SECS).await);

        let dropped = a.sweep_expired_at(SESSION_TTL_SECS + 1).await;
        assert_eq!(dropped, 1);
        assert_eq!(a.session_count().await, 1);
        assert!(a.is_authenticated_at(2, SESSION_TTL_SECS + 1).await);
    }
}
