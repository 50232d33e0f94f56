//! End-to-end engine tests against an in-memory store and a mock chat
//! port.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use teledb_core::auth::RATE_MAX_QUERIES;
use teledb_core::chat::{ChatPort, InboundMessage, MessageRef};
use teledb_core::identity::Caller;
use teledb_core::store::{MemoryStore, PhoneStore};
use teledb_core::{BotConfig, BotEngine, Result};

/// Chat port that records every send and delete.
#[derive(Default)]
struct MockChat {
    sent: Mutex<Vec<(i64, String)>>,
    deleted: Mutex<Vec<MessageRef>>,
    next_ref: AtomicI64,
}

impl MockChat {
    fn last_reply(&self) -> String {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    }

    fn deleted_refs(&self) -> Vec<MessageRef> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPort for MockChat {
    async fn send(&self, caller_id: i64, text: &str) -> Result<MessageRef> {
        self.sent.lock().unwrap().push((caller_id, text.to_string()));
        Ok(MessageRef(self.next_ref.fetch_add(1, Ordering::SeqCst) + 1000))
    }

    async fn delete(&self, msg: MessageRef) -> Result<()> {
        self.deleted.lock().unwrap().push(msg);
        Ok(())
    }
}

struct Fixture {
    engine: BotEngine,
    chat: Arc<MockChat>,
    store: Arc<MemoryStore>,
    next_msg: AtomicI64,
}

impl Fixture {
    fn new(config: BotConfig) -> Self {
        let chat = Arc::new(MockChat::default());
        let store = Arc::new(MemoryStore::new());
        let engine = BotEngine::new(
            config,
            Arc::clone(&store) as Arc<dyn PhoneStore>,
            Arc::clone(&chat) as Arc<dyn ChatPort>,
        );
        Self {
            engine,
            chat,
            store,
            next_msg: AtomicI64::new(0),
        }
    }

    async fn deliver(&self, caller: &Caller, text: &str) -> MessageRef {
        let message = MessageRef(self.next_msg.fetch_add(1, Ordering::SeqCst));
        self.engine
            .handle(InboundMessage {
                caller: caller.clone(),
                message,
                text: text.to_string(),
            })
            .await
            .expect("handle should not fail");
        message
    }
}

fn config() -> BotConfig {
    BotConfig {
        super_admin_handle: "ops".into(),
        admin_user_id: 100,
        ..BotConfig::default()
    }
}

fn boss() -> Caller {
    Caller::new(100, "ops")
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_unknown_caller_is_denied_and_not_logged() {
    let fx = Fixture::new(config());
    let stranger = Caller::new(1, "stranger");

    fx.deliver(&stranger, "010-1234-5678").await;
    assert_eq!(fx.chat.last_reply(), "Access denied.");

    // Denied lookups stay out of the audit log by default.
    assert_eq!(fx.store.stats().unwrap().total_queries, 0);
}

#[tokio::test]
async fn test_denied_lookup_logged_when_configured() {
    let mut cfg = config();
    cfg.log_denied_queries = true;
    let fx = Fixture::new(cfg);

    fx.deliver(&Caller::new(1, "stranger"), "01012345678").await;
    let stats = fx.store.stats().unwrap();
    assert_eq!(stats.total_queries, 1);
    assert_eq!(stats.successful_queries, 0);
}

#[tokio::test(start_paused = true)]
async fn test_approved_lookup_hit_retracts_after_delay() {
    let fx = Fixture::new(config());
    let alice = Caller::new(1, "alice");

    fx.store.insert("01012345678", "office line").unwrap();
    fx.deliver(&boss(), "/approve @alice").await;

    let input = fx.deliver(&alice, "010-1234-5678").await;
    let reply = fx.chat.last_reply();
    assert!(reply.contains("1 found"));
    assert!(reply.contains("office line"));
    assert!(fx.chat.deleted_refs().is_empty());

    settle().await;
    tokio::time::advance(Duration::from_secs(31)).await;
    settle().await;

    // Both the reply and the caller's own message are gone.
    let deleted = fx.chat.deleted_refs();
    assert_eq!(deleted.len(), 2);
    assert!(deleted.contains(&input));

    // The lookup was audited.
    let stats = fx.store.stats().unwrap();
    assert_eq!(stats.total_queries, 1);
    assert_eq!(stats.successful_queries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_miss_is_retracted_too() {
    let fx = Fixture::new(config());
    fx.deliver(&boss(), "/approve @alice").await;

    let input = fx.deliver(&Caller::new(1, "alice"), "01099990000").await;
    assert!(fx.chat.last_reply().contains("No records"));
    assert!(fx.chat.deleted_refs().is_empty());

    settle().await;
    tokio::time::advance(Duration::from_secs(31)).await;
    settle().await;
    assert!(fx.chat.deleted_refs().contains(&input));
}

#[tokio::test]
async fn test_password_session_grants_lookups() {
    let mut cfg = config();
    cfg.access_password = Some("hunter2".into());
    let fx = Fixture::new(cfg);
    let dana = Caller::new(7, "dana");

    fx.deliver(&dana, "01012345678").await;
    assert!(fx.chat.last_reply().contains("/auth"));

    fx.deliver(&dana, "/auth wrong").await;
    assert_eq!(fx.chat.last_reply(), "Authentication failed.");

    fx.deliver(&dana, "/auth hunter2").await;
    assert!(fx.chat.last_reply().contains("24 hours"));

    fx.deliver(&dana, "01012345678").await;
    assert!(fx.chat.last_reply().contains("No records"));

    fx.deliver(&dana, "/logout").await;
    fx.deliver(&dana, "01012345678").await;
    assert!(fx.chat.last_reply().starts_with("Access denied"));
}

#[tokio::test]
async fn test_rate_limit_kicks_in() {
    let fx = Fixture::new(config());
    fx.deliver(&boss(), "/approve @alice").await;
    let alice = Caller::new(1, "alice");

    for _ in 0..RATE_MAX_QUERIES {
        fx.deliver(&alice, "01099990000").await;
        assert!(fx.chat.last_reply().contains("No records"));
    }
    fx.deliver(&alice, "01099990000").await;
    assert!(fx.chat.last_reply().contains("Too many lookups"));

    // The super-admin is never throttled.
    for _ in 0..RATE_MAX_QUERIES + 1 {
        fx.deliver(&boss(), "01099990000").await;
    }
    assert!(fx.chat.last_reply().contains("No records"));
}

#[tokio::test]
async fn test_privileged_probe_matches_unknown_command() {
    let fx = Fixture::new(config());
    let stranger = Caller::new(1, "stranger");

    fx.deliver(&stranger, "/no_such_command").await;
    let unknown = fx.chat.last_reply();
    fx.deliver(&stranger, "/admins").await;
    let probe = fx.chat.last_reply();
    fx.deliver(&stranger, "/sa").await;
    let stealth_probe = fx.chat.last_reply();

    assert_eq!(unknown, probe);
    assert_eq!(unknown, stealth_probe);
}

#[tokio::test]
async fn test_admin_record_management() {
    let fx = Fixture::new(config());
    fx.deliver(&boss(), "/admin @carol").await;
    let carol = Caller::new(2, "carol");

    fx.deliver(&carol, "/add 01012345678 shared desk phone").await;
    assert!(fx.chat.last_reply().contains("Record added"));

    fx.deliver(&carol, "/add 01012345678 second note").await;
    fx.deliver(&carol, "/list").await;
    assert!(fx.chat.last_reply().contains("01012345678"));

    fx.deliver(&carol, "/delete 01012345678 second note").await;
    assert!(fx.chat.last_reply().contains("Deleted 1"));

    fx.deliver(&carol, "/delete 01012345678").await;
    assert!(fx.chat.last_reply().contains("Deleted 1"));
    assert!(fx.store.find_by_phone("01012345678").unwrap().is_empty());

    // Admins are implicitly approved for lookups.
    fx.deliver(&carol, "01012345678").await;
    assert!(fx.chat.last_reply().contains("No records"));
}

#[tokio::test]
async fn test_bulk_add_reports_skipped_lines() {
    let fx = Fixture::new(config());
    fx.deliver(&boss(), "/bulk\n01011112222 first\nnot-a-number oops\n01033334444 second")
        .await;
    assert_eq!(fx.chat.last_reply(), "Bulk add: 2 stored, 1 skipped.");
    assert_eq!(fx.store.find_by_phone("01011112222").unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stealth_mode_flow() {
    let fx = Fixture::new(config());
    let boss = boss();

    let sa_msg = fx.deliver(&boss, "/sa").await;
    assert!(fx.chat.last_reply().contains("Stealth mode ON"));
    // The toggle command itself is scrubbed immediately.
    assert!(fx.chat.deleted_refs().contains(&sa_msg));

    let add_msg = fx.deliver(&boss, "01012345678 burner contact").await;
    assert!(fx.chat.deleted_refs().contains(&add_msg));
    assert!(fx.chat.last_reply().contains("Record added"));
    assert_eq!(fx.store.find_by_phone("01012345678").unwrap().len(), 1);

    let del_msg = fx.deliver(&boss, "01012345678 d").await;
    assert!(fx.chat.deleted_refs().contains(&del_msg));
    assert!(fx.chat.last_reply().contains("Deleted 1"));
    assert!(fx.store.find_by_phone("01012345678").unwrap().is_empty());

    // Confirmations self-destruct after a few seconds.
    let before = fx.chat.deleted_refs().len();
    settle().await;
    tokio::time::advance(Duration::from_secs(6)).await;
    settle().await;
    assert!(fx.chat.deleted_refs().len() > before);

    fx.deliver(&boss, "/exit_admin").await;
    assert!(fx.chat.last_reply().contains("Stealth mode OFF"));

    // Out of stealth mode, the same text gets the format hint and
    // nothing is stored.
    fx.deliver(&boss, "01012345678 burner contact").await;
    assert!(fx.chat.last_reply().contains("valid phone number"));
    assert!(fx.store.find_by_phone("01012345678").unwrap().is_empty());
}

#[tokio::test]
async fn test_stealth_requires_strict_identity() {
    let fx = Fixture::new(config());
    // Right handle, wrong numeric id.
    let imposter = Caller::new(999, "ops");

    fx.deliver(&imposter, "/sa").await;
    assert_eq!(fx.chat.last_reply(), "Unknown command. Use /help to see available commands.");
}

#[tokio::test]
async fn test_user_roster_management() {
    let fx = Fixture::new(config());
    let boss = boss();

    fx.deliver(&boss, "/approve @alice").await;
    fx.deliver(&boss, "/approve 42").await;
    fx.deliver(&boss, "/users").await;
    let roster = fx.chat.last_reply();
    assert!(roster.contains("@alice"));
    assert!(roster.contains("42"));
    assert!(roster.contains("@ops"));

    fx.deliver(&boss, "/disapprove @alice").await;
    fx.deliver(&boss, "/users").await;
    assert!(!fx.chat.last_reply().contains("@alice"));

    fx.deliver(&boss, "/disapprove @alice").await;
    assert!(fx.chat.last_reply().contains("was not on the list"));

    // The super-admin cannot be removed from the lists.
    fx.deliver(&boss, "/disapprove @ops").await;
    assert!(fx.chat.last_reply().contains("was not on the list"));
    fx.deliver(&boss, "/users").await;
    assert!(fx.chat.last_reply().contains("@ops"));
}

#[tokio::test]
async fn test_password_change_at_runtime() {
    let mut cfg = config();
    cfg.access_password = Some("hunter2".into());
    let fx = Fixture::new(cfg);
    let boss = boss();
    let dana = Caller::new(7, "dana");

    fx.deliver(&dana, "/auth hunter2").await;
    fx.deliver(&boss, "/passwd correct horse").await;
    assert!(fx.chat.last_reply().contains("Password changed"));

    // Old sessions survive, the old password does not.
    fx.deliver(&dana, "01099990000").await;
    assert!(fx.chat.last_reply().contains("No records"));
    fx.deliver(&Caller::new(8, "erin"), "/auth hunter2").await;
    assert_eq!(fx.chat.last_reply(), "Authentication failed.");
    fx.deliver(&Caller::new(8, "erin"), "/auth correct horse").await;
    assert!(fx.chat.last_reply().contains("24 hours"));

    fx.deliver(&boss, "/passwd ab").await;
    assert!(fx.chat.last_reply().contains("rejected"));
}

#[tokio::test]
async fn test_help_is_tiered_and_stats_gated() {
    let fx = Fixture::new(config());
    let stranger = Caller::new(1, "stranger");

    fx.deliver(&stranger, "/help").await;
    assert!(!fx.chat.last_reply().contains("/add"));

    fx.deliver(&stranger, "/stats").await;
    assert!(fx.chat.last_reply().starts_with("Unknown command"));

    fx.deliver(&boss(), "/help").await;
    let help = fx.chat.last_reply();
    assert!(help.contains("/add"));
    assert!(help.contains("/sa"));

    fx.deliver(&boss(), "/stats").await;
    assert!(fx.chat.last_reply().contains("Database statistics"));
}

#[tokio::test]
async fn test_plain_chatter_gets_format_hint() {
    let fx = Fixture::new(config());
    fx.deliver(&Caller::new(1, "stranger"), "hello there").await;
    assert!(fx.chat.last_reply().contains("valid phone number"));
    assert_eq!(fx.store.stats().unwrap().total_queries, 0);
}

#[tokio::test]
async fn test_search_command_validates_input() {
    let fx = Fixture::new(config());
    fx.deliver(&boss(), "/search nonsense").await;
    assert!(fx.chat.last_reply().contains("valid phone number"));

    fx.deliver(&boss(), "/search 010-1234-5678").await;
    assert!(fx.chat.last_reply().contains("No records"));
}
