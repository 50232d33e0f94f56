//! Message dispatch.
//!
//! One engine instance serves every caller. It classifies each inbound
//! message, runs the authorization gauntlet, and talks back through the
//! chat port. Privileged commands from unauthorized callers get the
//! same reply as commands that do not exist.

use crate::auth::{AccessControl, SessionAuthenticator};
use crate::chat::{ChatPort, InboundMessage, MessageRef};
use crate::classify::{classify, Inbound};
use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::identity::{Caller, UserKey};
use crate::mode::{ModeController, StealthAction, StealthCommand, StealthToggle};
use crate::phone::PhoneNumber;
use crate::render;
use crate::retract::{Retractor, RESULT_RETRACT_SECS, STEALTH_RETRACT_SECS};
use crate::store::{PhoneStore, QueryLogEntry};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// The bot engine. Cheap to share behind an `Arc`.
pub struct BotEngine {
    config: BotConfig,
    store: Arc<dyn PhoneStore>,
    access: AccessControl,
    sessions: Arc<SessionAuthenticator>,
    mode: ModeController,
    chat: Arc<dyn ChatPort>,
    retractor: Retractor,
}

impl BotEngine {
    /// Wire up an engine from configuration, a store and a chat port.
    pub fn new(config: BotConfig, store: Arc<dyn PhoneStore>, chat: Arc<dyn ChatPort>) -> Self {
        let access = AccessControl::new(config.super_admin_handle.clone(), config.admin_user_id);
        let sessions = Arc::new(SessionAuthenticator::new(
            config.access_password.clone(),
            config.rate_limit_enabled,
        ));
        let retractor = Retractor::new(Arc::clone(&chat));
        Self {
            config,
            store,
            access,
            sessions,
            mode: ModeController::new(),
            chat,
            retractor,
        }
    }

    /// The session authenticator, exposed so the binary can spawn the
    /// expiry sweep.
    pub fn sessions(&self) -> &Arc<SessionAuthenticator> {
        &self.sessions
    }

    /// Handle one inbound message end to end.
    pub async fn handle(&self, msg: InboundMessage) -> Result<()> {
        let caller = &msg.caller;
        let in_stealth =
            self.access.is_super_admin(caller) && self.mode.is_active(caller.id).await;

        match classify(&msg.text, in_stealth) {
            Inbound::Stealth(cmd) => self.handle_stealth(caller, msg.message, cmd).await,
            Inbound::Lookup(phone) => {
                self.handle_lookup(caller, Some(msg.message), phone).await
            }
            Inbound::Command { name, args } => {
                self.handle_command(caller, msg.message, &msg.text, &name, &args)
                    .await
            }
            Inbound::Passthrough => {
                // Anything that is neither a command nor a valid number
                // gets the format hint; nothing is logged for it.
                self.send(caller, &render::format_help()).await?;
                Ok(())
            }
        }
    }

    async fn handle_command(
        &self,
        caller: &Caller,
        message: MessageRef,
        raw_text: &str,
        name: &str,
        args: &[String],
    ) -> Result<()> {
        match name {
            "start" => {
                self.send(caller, &render::welcome()).await?;
            }
            "help" => {
                let is_admin = self.access.is_admin(caller).await;
                let is_super = self.access.is_super_admin(caller);
                self.send(caller, &render::help(is_admin, is_super)).await?;
            }
            "search" => match args.first().map(|a| PhoneNumber::parse(a)) {
                Some(Ok(phone)) => self.handle_lookup(caller, None, phone).await?,
                _ => {
                    self.send(caller, &render::format_help()).await?;
                }
            },
            "auth" => self.cmd_auth(caller, args).await?,
            "logout" => {
                let reply = if self.sessions.logout(caller.id).await {
                    render::logout_ok()
                } else {
                    render::logout_none()
                };
                self.send(caller, &reply).await?;
            }
            "stats" if self.access.is_admin(caller).await => match self.store.stats() {
                Ok(stats) => {
                    self.send(caller, &render::stats(&stats)).await?;
                }
                Err(e) => {
                    error!(error = %e, "stats query failed");
                    self.send(caller, &render::operation_failed()).await?;
                }
            },
            "add" if self.access.is_admin(caller).await => self.cmd_add(caller, args).await?,
            "delete" if self.access.is_admin(caller).await => {
                self.cmd_delete(caller, args).await?
            }
            "list" if self.access.is_admin(caller).await => match self.store.summarize() {
                Ok(items) => {
                    self.send(caller, &render::summary(&items)).await?;
                }
                Err(e) => {
                    error!(error = %e, "summary query failed");
                    self.send(caller, &render::operation_failed()).await?;
                }
            },
            "bulk" if self.access.is_admin(caller).await => {
                self.cmd_bulk(caller, raw_text).await?
            }
            "security" if self.access.is_admin(caller).await => {
                let info = render::security_info(
                    self.sessions.has_password().await,
                    self.config.rate_limit_enabled,
                    self.config.allow_list_enabled,
                    self.sessions.session_count().await,
                    self.access.approved().await.len(),
                    self.access.admins().await.len(),
                );
                self.send(caller, &info).await?;
            }
            "approve" if self.access.is_super_admin(caller) => {
                self.cmd_user_list(caller, args, UserListOp::Approve).await?
            }
            "disapprove" if self.access.is_super_admin(caller) => {
                self.cmd_user_list(caller, args, UserListOp::Disapprove)
                    .await?
            }
            "admin" if self.access.is_super_admin(caller) => {
                self.cmd_user_list(caller, args, UserListOp::GrantAdmin)
                    .await?
            }
            "unadmin" if self.access.is_super_admin(caller) => {
                self.cmd_user_list(caller, args, UserListOp::RevokeAdmin)
                    .await?
            }
            "users" if self.access.is_super_admin(caller) => {
                let keys = self.access.approved().await;
                self.send(caller, &render::roster("Approved users", &keys))
                    .await?;
            }
            "admins" if self.access.is_super_admin(caller) => {
                let keys = self.access.admins().await;
                self.send(caller, &render::roster("Admins", &keys)).await?;
            }
            "passwd" if self.access.is_super_admin_strict(caller) => {
                self.cmd_passwd(caller, args).await?
            }
            "sa" if self.access.is_super_admin_strict(caller) => {
                self.retractor.delete_now(message).await;
                let reply = match self.mode.toggle(caller.id).await {
                    StealthToggle::Entered => render::stealth_on(),
                    StealthToggle::Exited => render::stealth_off(),
                };
                let sent = self.send(caller, &reply).await?;
                self.retractor
                    .schedule_delete(sent, Duration::from_secs(STEALTH_RETRACT_SECS));
            }
            "exit_admin" if self.access.is_super_admin_strict(caller) => {
                self.retractor.delete_now(message).await;
                let reply = if self.mode.exit(caller.id).await {
                    render::stealth_off()
                } else {
                    render::stealth_not_active()
                };
                let sent = self.send(caller, &reply).await?;
                self.retractor
                    .schedule_delete(sent, Duration::from_secs(STEALTH_RETRACT_SECS));
            }
            // Unknown commands and unauthorized privileged commands are
            // indistinguishable on purpose.
            _ => {
                self.send(caller, &render::unknown_command()).await?;
            }
        }
        Ok(())
    }

    async fn cmd_auth(&self, caller: &Caller, args: &[String]) -> Result<()> {
        if !self.sessions.has_password().await {
            self.send(caller, &render::auth_not_needed()).await?;
            return Ok(());
        }
        let attempt = args.join(" ");
        if attempt.is_empty() {
            self.send(caller, &render::auth_usage()).await?;
            return Ok(());
        }
        let reply = if self.sessions.authenticate(caller.id, &attempt).await {
            render::auth_ok()
        } else {
            render::auth_failed()
        };
        self.send(caller, &reply).await?;
        Ok(())
    }

    async fn cmd_add(&self, caller: &Caller, args: &[String]) -> Result<()> {
        let (phone, content) = match args.split_first() {
            Some((head, rest)) if !rest.is_empty() => match PhoneNumber::parse(head) {
                Ok(phone) => (phone, rest.join(" ")),
                Err(_) => {
                    self.send(caller, &render::format_help()).await?;
                    return Ok(());
                }
            },
            _ => {
                self.send(caller, &render::add_usage()).await?;
                return Ok(());
            }
        };
        match self.store.insert(phone.as_str(), &content) {
            Ok(_) => {
                self.send(caller, &render::added(&phone)).await?;
            }
            Err(e) => {
                error!(error = %e, "record insert failed");
                self.send(caller, &render::operation_failed()).await?;
            }
        }
        Ok(())
    }

    async fn cmd_delete(&self, caller: &Caller, args: &[String]) -> Result<()> {
        let (phone, content) = match args.split_first() {
            Some((head, rest)) => match PhoneNumber::parse(head) {
                Ok(phone) => {
                    let content = if rest.is_empty() {
                        None
                    } else {
                        Some(rest.join(" "))
                    };
                    (phone, content)
                }
                Err(_) => {
                    self.send(caller, &render::format_help()).await?;
                    return Ok(());
                }
            },
            None => {
                self.send(caller, &render::delete_usage()).await?;
                return Ok(());
            }
        };
        match self.store.delete_by_phone(phone.as_str(), content.as_deref()) {
            Ok(count) => {
                self.send(caller, &render::deleted(&phone, count)).await?;
            }
            Err(e) => {
                error!(error = %e, "record delete failed");
                self.send(caller, &render::operation_failed()).await?;
            }
        }
        Ok(())
    }

    async fn cmd_bulk(&self, caller: &Caller, raw_text: &str) -> Result<()> {
        // Entries follow the command, one "<number> <text>" per line.
        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for line in raw_text.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line
                .split_once(char::is_whitespace)
                .and_then(|(head, tail)| {
                    let content = tail.trim();
                    if content.is_empty() {
                        return None;
                    }
                    PhoneNumber::parse(head)
                        .ok()
                        .map(|p| (p.as_str().to_string(), content.to_string()))
                }) {
                Some(entry) => entries.push(entry),
                None => skipped += 1,
            }
        }
        if entries.is_empty() && skipped == 0 {
            self.send(caller, &render::bulk_usage()).await?;
            return Ok(());
        }
        match self.store.insert_bulk(&entries) {
            Ok(stored) => {
                self.send(caller, &render::bulk_report(stored, skipped))
                    .await?;
            }
            Err(e) => {
                error!(error = %e, "bulk insert failed");
                self.send(caller, &render::operation_failed()).await?;
            }
        }
        Ok(())
    }

    async fn cmd_user_list(
        &self,
        caller: &Caller,
        args: &[String],
        op: UserListOp,
    ) -> Result<()> {
        let key = match args.first().and_then(|a| UserKey::parse(a)) {
            Some(key) => key,
            None => {
                self.send(caller, &render::user_arg_invalid()).await?;
                return Ok(());
            }
        };
        let reply = match op {
            UserListOp::Approve => {
                self.access.approve(key.clone()).await;
                render::user_approved(&key)
            }
            UserListOp::Disapprove => {
                if self.access.revoke_approval(&key).await {
                    render::user_disapproved(&key)
                } else {
                    render::user_not_found(&key)
                }
            }
            UserListOp::GrantAdmin => {
                self.access.grant_admin(key.clone()).await;
                render::admin_granted(&key)
            }
            UserListOp::RevokeAdmin => {
                if self.access.revoke_admin(&key).await {
                    render::admin_revoked(&key)
                } else {
                    render::user_not_found(&key)
                }
            }
        };
        self.send(caller, &reply).await?;
        Ok(())
    }

    async fn cmd_passwd(&self, caller: &Caller, args: &[String]) -> Result<()> {
        let new = args.join(" ");
        if new.is_empty() {
            self.send(caller, &render::passwd_usage()).await?;
            return Ok(());
        }
        let reply = match self.sessions.change_password(&new).await {
            Ok(()) => render::passwd_ok(),
            Err(Error::Validation(_)) => render::passwd_rejected(),
            Err(e) => return Err(e),
        };
        self.send(caller, &reply).await?;
        Ok(())
    }

    /// Lookup path. `input` carries the caller's own message when the
    /// lookup came from a bare number, so it can be retracted alongside
    /// the reply.
    async fn handle_lookup(
        &self,
        caller: &Caller,
        input: Option<MessageRef>,
        phone: PhoneNumber,
    ) -> Result<()> {
        let is_super = self.access.is_super_admin(caller);

        if !is_super && self.sessions.is_rate_limited(caller.id).await {
            self.log_denied(caller, &phone);
            self.send(caller, &render::throttled()).await?;
            return Ok(());
        }

        if !is_super && !self.is_lookup_authorized(caller).await {
            self.log_denied(caller, &phone);
            let needs_auth = self.sessions.has_password().await;
            self.send(caller, &render::access_denied(needs_auth)).await?;
            return Ok(());
        }

        if !is_super {
            self.sessions.record_query(caller.id).await;
        }

        let records = match self.store.find_by_phone(phone.as_str()) {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, phone = %phone, "lookup failed");
                self.send(caller, &render::lookup_failed()).await?;
                return Ok(());
            }
        };

        self.log_query(caller, &phone, records.len() as i64);

        let reply = if records.is_empty() {
            render::not_found(&phone)
        } else {
            render::results(&phone, &records)
        };
        let sent = self.send(caller, &reply).await?;

        // Hit or miss, lookup replies self-destruct, and on the bare
        // number path so does the caller's own message.
        let delay = Duration::from_secs(RESULT_RETRACT_SECS);
        self.retractor.schedule_delete(sent, delay);
        if let Some(input) = input {
            self.retractor.schedule_delete(input, delay);
        }
        Ok(())
    }

    async fn handle_stealth(
        &self,
        caller: &Caller,
        message: MessageRef,
        cmd: StealthCommand,
    ) -> Result<()> {
        // Scrub the caller's message before doing anything visible.
        self.retractor.delete_now(message).await;

        let reply = match cmd.action {
            StealthAction::DeleteAll => {
                match self.store.delete_by_phone(cmd.phone.as_str(), None) {
                    Ok(count) => render::deleted(&cmd.phone, count),
                    Err(e) => {
                        error!(error = %e, "stealth delete failed");
                        render::operation_failed()
                    }
                }
            }
            StealthAction::Add(content) => {
                match self.store.insert(cmd.phone.as_str(), &content) {
                    Ok(_) => render::added(&cmd.phone),
                    Err(e) => {
                        error!(error = %e, "stealth insert failed");
                        render::operation_failed()
                    }
                }
            }
        };

        let sent = self.send(caller, &reply).await?;
        self.retractor
            .schedule_delete(sent, Duration::from_secs(STEALTH_RETRACT_SECS));
        Ok(())
    }

    async fn is_lookup_authorized(&self, caller: &Caller) -> bool {
        if self.config.allow_list_enabled && self.access.is_approved(caller).await {
            return true;
        }
        if self.sessions.has_password().await {
            return self.sessions.is_authenticated(caller.id).await;
        }
        // No allow list and no password means the bot is open.
        !self.config.allow_list_enabled
    }

    fn log_query(&self, caller: &Caller, phone: &PhoneNumber, result_count: i64) {
        let entry = QueryLogEntry {
            caller_id: caller.id,
            caller_name: caller.handle.clone(),
            phone_number: phone.as_str().to_string(),
            result_count,
            queried_at: Utc::now().timestamp(),
        };
        if let Err(e) = self.store.append_query_log(&entry) {
            warn!(error = %e, "query log write failed");
        }
    }

    fn log_denied(&self, caller: &Caller, phone: &PhoneNumber) {
        if self.config.log_denied_queries {
            self.log_query(caller, phone, -1);
        }
    }

    async fn send(&self, caller: &Caller, text: &str) -> Result<MessageRef> {
        self.chat.send(caller.id, text).await
    }
}

enum UserListOp {
    Approve,
    Disapprove,
    GrantAdmin,
    RevokeAdmin,
}
