//! In-process tab bus.
//!
//! Stands in for the browser runtime: every context (the background and
//! each tab) registers a bounded mailbox, and `send_to` delivers a wire
//! message into it and waits for the reply with a timeout. Tabs carry an
//! `active` flag so `active_tabs` can report which ones should receive
//! broadcasts.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use pagechat_core::message::Transport;
use pagechat_types::error::TransportError;
use pagechat_types::message::{Message, Scope, TabId, TabInfo};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Buffer size for per-context mailboxes.
const MAILBOX_BUFFER: usize = 64;

/// One delivered message plus the channel for its reply.
#[derive(Debug)]
pub struct TabEnvelope {
    /// The message in its wire shape.
    pub payload: Value,
    reply: oneshot::Sender<Value>,
}

impl TabEnvelope {
    /// Answer the sender. Returns false if the sender stopped waiting.
    pub fn reply(self, value: Value) -> bool {
        self.reply.send(value).is_ok()
    }
}

#[derive(Debug, Clone)]
struct TabEntry {
    url: Option<String>,
    active: bool,
}

/// Process-local message router between contexts.
#[derive(Debug)]
pub struct TabBus {
    mailboxes: DashMap<Scope, mpsc::Sender<TabEnvelope>>,
    tabs: DashMap<TabId, TabEntry>,
    reply_timeout: Duration,
}

impl TabBus {
    pub fn new(reply_timeout: Duration) -> Self {
        Self {
            mailboxes: DashMap::new(),
            tabs: DashMap::new(),
            reply_timeout,
        }
    }

    /// Register the background context and return its mailbox.
    pub fn register_background(&self) -> mpsc::Receiver<TabEnvelope> {
        let (tx, rx) = mpsc::channel(MAILBOX_BUFFER);
        self.mailboxes.insert(Scope::Background, tx);
        debug!("registered background context");
        rx
    }

    /// Register a tab and return its mailbox. New tabs start inactive.
    ///
    /// Registering an existing id replaces its mailbox.
    pub fn register_tab(&self, id: TabId, url: Option<String>) -> mpsc::Receiver<TabEnvelope> {
        let (tx, rx) = mpsc::channel(MAILBOX_BUFFER);
        self.mailboxes.insert(Scope::Tab(id), tx);
        self.tabs.insert(id, TabEntry { url, active: false });
        debug!(tab = %id, "registered tab");
        rx
    }

    /// Forget a tab. Returns whether it was registered.
    pub fn close_tab(&self, id: TabId) -> bool {
        self.mailboxes.remove(&Scope::Tab(id));
        let removed = self.tabs.remove(&id).is_some();
        if removed {
            debug!(tab = %id, "closed tab");
        }
        removed
    }

    /// Mark a tab as active (or not) in the focused window.
    pub fn set_active(&self, id: TabId, active: bool) -> bool {
        match self.tabs.get_mut(&id) {
            Some(mut entry) => {
                entry.active = active;
                true
            }
            None => false,
        }
    }

    async fn deliver(&self, scope: Scope, payload: Value) -> Result<Value, TransportError> {
        // Clone the sender out so no map guard is held across an await.
        let sender = self
            .mailboxes
            .get(&scope)
            .map(|s| s.value().clone())
            .ok_or(TransportError::NoReceiver(scope))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .send(TabEnvelope {
                payload,
                reply: reply_tx,
            })
            .await
            .map_err(|_| TransportError::Send {
                scope,
                reason: "mailbox closed".to_string(),
            })?;

        match tokio::time::timeout(self.reply_timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(TransportError::Send {
                scope,
                reason: "receiver dropped the message without replying".to_string(),
            }),
            Err(_) => Err(TransportError::Timeout {
                scope,
                timeout_ms: self.reply_timeout.as_millis() as u64,
            }),
        }
    }
}

impl Transport for TabBus {
    async fn active_tabs(&self) -> Result<Vec<TabInfo>, TransportError> {
        let mut tabs: Vec<TabInfo> = self
            .tabs
            .iter()
            .filter(|entry| entry.value().active)
            .map(|entry| TabInfo {
                id: Some(*entry.key()),
                url: entry.value().url.clone(),
            })
            .collect();
        tabs.sort_by_key(|t| t.id);
        Ok(tabs)
    }

    async fn send_to(&self, scope: Scope, message: &Message) -> Result<Value, TransportError> {
        self.deliver(scope, message.to_wire()).await
    }
}

/// Serve a mailbox with `respond` until every sender is gone.
///
/// `None` from `respond` means the value was not for this context; the
/// sender then gets `null`, the same as a runtime message nobody answered.
pub fn spawn_responder<F, Fut>(mut mailbox: mpsc::Receiver<TabEnvelope>, respond: F) -> JoinHandle<()>
where
    F: Fn(Value) -> Fut + Send + 'static,
    Fut: Future<Output = Option<Value>> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(envelope) = mailbox.recv().await {
            let reply = respond(envelope.payload.clone()).await.unwrap_or(Value::Null);
            if !envelope.reply(reply) {
                warn!("sender stopped waiting before the reply was ready");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagechat_core::message::send_to_all_active_tabs;
    use pagechat_types::message::MessageKind;
    use serde_json::json;

    fn bus() -> TabBus {
        TabBus::new(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn delivers_and_returns_reply() {
        let bus = bus();
        let rx = bus.register_tab(TabId(1), Some("https://a.example".to_string()));
        let _server = spawn_responder(rx, |raw| async move {
            Some(json!({ "echo": raw["messageType"] }))
        });

        let reply = bus
            .send_to(Scope::Tab(TabId(1)), &Message::new(MessageKind::IconClicked))
            .await
            .unwrap();

        assert_eq!(reply, json!({ "echo": "clickExtIcon" }));
    }

    #[tokio::test]
    async fn unregistered_scope_has_no_receiver() {
        let bus = bus();
        let err = bus
            .send_to(Scope::Background, &Message::new(MessageKind::IconClicked))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NoReceiver(Scope::Background)));
    }

    #[tokio::test]
    async fn silent_receiver_times_out() {
        let bus = bus();
        // Keep the mailbox alive but never read it.
        let _rx = bus.register_tab(TabId(3), None);

        let err = bus
            .send_to(Scope::Tab(TabId(3)), &Message::new(MessageKind::IconClicked))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Timeout { timeout_ms: 200, .. }));
    }

    #[tokio::test]
    async fn closed_tab_is_unreachable() {
        let bus = bus();
        let rx = bus.register_tab(TabId(4), None);
        drop(rx);

        let err = bus
            .send_to(Scope::Tab(TabId(4)), &Message::new(MessageKind::IconClicked))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Send { .. }));

        assert!(bus.close_tab(TabId(4)));
        assert!(!bus.close_tab(TabId(4)));
    }

    #[tokio::test]
    async fn only_active_tabs_are_listed() {
        let bus = bus();
        let _a = bus.register_tab(TabId(2), None);
        let _b = bus.register_tab(TabId(1), None);
        let _c = bus.register_tab(TabId(3), None);
        bus.set_active(TabId(2), true);
        bus.set_active(TabId(1), true);
        assert!(!bus.set_active(TabId(99), true));

        let ids: Vec<_> = bus
            .active_tabs()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![TabId(1), TabId(2)]);
    }

    #[tokio::test]
    async fn broadcast_tolerates_unresponsive_tab() {
        let bus = bus();
        let live = bus.register_tab(TabId(1), None);
        let _dead = bus.register_tab(TabId(2), None);
        bus.set_active(TabId(1), true);
        bus.set_active(TabId(2), true);
        let _server = spawn_responder(live, |_| async { Some(json!(true)) });

        let replies = send_to_all_active_tabs(&bus, &Message::new(MessageKind::IconClicked))
            .await
            .unwrap();

        assert_eq!(replies, vec![json!(true)]);
    }

    #[tokio::test]
    async fn unanswered_value_replies_null() {
        let bus = bus();
        let rx = bus.register_background();
        let _server = spawn_responder(rx, |_| async { None });

        let reply = bus
            .send_to(Scope::Background, &Message::new(MessageKind::Unknown))
            .await
            .unwrap();
        assert_eq!(reply, Value::Null);
    }
}
