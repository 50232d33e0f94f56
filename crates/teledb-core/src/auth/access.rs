//! Tiered access control.
//!
//! The super-admin is a single fixed handle from configuration. It is
//! seeded into both runtime lists and can never be removed from them.
//! Admin and approved lists are runtime state only and reset on
//! restart.

use crate::identity::{Caller, UserKey};
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::info;

/// Authorization tier of a caller, most privileged first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// The fixed configured identity; may grant and revoke rights.
    SuperAdmin,
    /// May add, delete and inspect records.
    Admin,
    /// May perform lookups.
    Approved,
    /// No rights; receives only generic denials.
    Unknown,
}

#[derive(Default)]
struct Lists {
    admins: HashSet<UserKey>,
    approved: HashSet<UserKey>,
}

/// Runtime admin and approved-user lists plus the super-admin identity.
pub struct AccessControl {
    super_admin_handle: String,
    super_admin_id: i64,
    inner: RwLock<Lists>,
}

impl AccessControl {
    /// Create the lists, seeding the super-admin handle into both.
    pub fn new(super_admin_handle: impl Into<String>, super_admin_id: i64) -> Self {
        let super_admin_handle = super_admin_handle.into();
        let mut lists = Lists::default();
        let seed = UserKey::Handle(super_admin_handle.clone());
        lists.admins.insert(seed.clone());
        lists.approved.insert(seed);
        Self {
            super_admin_handle,
            super_admin_id,
            inner: RwLock::new(lists),
        }
    }

    /// Whether a caller presents the super-admin handle.
    pub fn is_super_admin(&self, caller: &Caller) -> bool {
        caller.handle.as_deref() == Some(self.super_admin_handle.as_str())
    }

    /// Stricter check for the most sensitive operations: the handle
    /// must match AND the numeric id must match the configured one.
    pub fn is_super_admin_strict(&self, caller: &Caller) -> bool {
        self.is_super_admin(caller) && caller.id == self.super_admin_id
    }

    /// Whether a caller is on the admin list (the super-admin always is).
    pub async fn is_admin(&self, caller: &Caller) -> bool {
        if self.is_super_admin(caller) {
            return true;
        }
        let lists = self.inner.read().await;
        lists.admins.iter().any(|k| caller.matches(k))
    }

    /// Whether a caller is on the approved list (admins always are).
    pub async fn is_approved(&self, caller: &Caller) -> bool {
        if self.is_super_admin(caller) {
            return true;
        }
        let lists = self.inner.read().await;
        lists.admins.iter().any(|k| caller.matches(k))
            || lists.approved.iter().any(|k| caller.matches(k))
    }

    /// Resolve a caller to a tier.
    pub async fn tier_of(&self, caller: &Caller) -> Tier {
        if self.is_super_admin(caller) {
            return Tier::SuperAdmin;
        }
        let lists = self.inner.read().await;
        if lists.admins.iter().any(|k| caller.matches(k)) {
            Tier::Admin
        } else if lists.approved.iter().any(|k| caller.matches(k)) {
            Tier::Approved
        } else {
            Tier::Unknown
        }
    }

    /// Grant admin rights. Admins are implicitly approved, so the key
    /// lands in both lists.
    pub async fn grant_admin(&self, key: UserKey) {
        let mut lists = self.inner.write().await;
        info!(user = %key, "granting admin rights");
        lists.approved.insert(key.clone());
        lists.admins.insert(key);
    }

    /// Revoke admin rights. Returns false when the key was not an
    /// admin, or names the super-admin (who cannot be demoted).
    pub async fn revoke_admin(&self, key: &UserKey) -> bool {
        if self.is_protected(key) {
            return false;
        }
        let mut lists = self.inner.write().await;
        let removed = lists.admins.remove(key);
        if removed {
            info!(user = %key, "revoked admin rights");
        }
        removed
    }

    /// Add a key to the approved list.
    pub async fn approve(&self, key: UserKey) {
        let mut lists = self.inner.write().await;
        info!(user = %key, "approving user");
        lists.approved.insert(key);
    }

    /// Remove a key from the approved list. Returns false when the key
    /// was not approved, or names the super-admin.
    pub async fn revoke_approval(&self, key: &UserKey) -> bool {
        if self.is_protected(key) {
            return false;
        }
        let mut lists = self.inner.write().await;
        let removed = lists.approved.remove(key);
        if removed {
            info!(user = %key, "revoked approval");
        }
        removed
    }

    /// Snapshot of the admin list.
    pub async fn admins(&self) -> Vec<UserKey> {
        let mut keys: Vec<UserKey> = self.inner.read().await.admins.iter().cloned().collect();
        keys.sort_by_key(|k| k.to_string());
        keys
    }

    /// Snapshot of the approved list.
    pub async fn approved(&self) -> Vec<UserKey> {
        let mut keys: Vec<UserKey> = self.inner.read().await.approved.iter().cloned().collect();
        keys.sort_by_key(|k| k.to_string());
        keys
    }

    fn is_protected(&self, key: &UserKey) -> bool {
        matches!(key, UserKey::Handle(h) if *h == self.super_admin_handle)
    }
}
