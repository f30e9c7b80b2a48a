//! Transport trait and fan-out helper.
//!
//! Extension contexts cannot call into each other's memory; everything goes
//! through a transport. Background and content contexts each receive a
//! transport configured for their direction.

use std::future::Future;

use pagechat_types::error::TransportError;
use pagechat_types::message::{Message, Scope, TabInfo};
use tracing::{debug, warn};

/// Cross-context send capability.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in pagechat-infra (e.g., `TabBus`).
pub trait Transport: Send + Sync {
    /// Active tabs in the currently focused window.
    fn active_tabs(&self) -> impl Future<Output = Result<Vec<TabInfo>, TransportError>> + Send;

    /// Deliver `message` to `scope` and wait for the receiver's response.
    fn send_to(
        &self,
        scope: Scope,
        message: &Message,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> + Send;
}

/// Send `message` to every active tab of the focused window.
///
/// Tabs without an id are skipped. A failed send to one tab is logged and
/// contributes no response; the remaining tabs are still tried. Only a
/// failure to list the tabs is returned as an error.
pub async fn send_to_all_active_tabs<T: Transport>(
    transport: &T,
    message: &Message,
) -> Result<Vec<serde_json::Value>, TransportError> {
    let tabs = transport.active_tabs().await?;
    let mut responses = Vec::with_capacity(tabs.len());

    for tab in tabs {
        let Some(tab_id) = tab.id else {
            continue;
        };
        match transport.send_to(Scope::Tab(tab_id), message).await {
            Ok(response) => {
                debug!(%tab_id, kind = %message.kind, "delivered message to tab");
                responses.push(response);
            }
            Err(e) => {
                warn!(%tab_id, kind = %message.kind, error = %e, "error sending message to tab");
            }
        }
    }

    Ok(responses)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use pagechat_types::message::{MessageKind, TabId};
    use serde_json::json;

    /// Scripted transport: fixed tab list, per-tab failures, records sends.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub tabs: Vec<TabInfo>,
        pub failing: Vec<TabId>,
        pub query_fails: bool,
        pub sent: Mutex<Vec<(Scope, Message)>>,
    }

    impl FakeTransport {
        pub(crate) fn with_tabs(ids: &[Option<u32>]) -> Self {
            Self {
                tabs: ids
                    .iter()
                    .map(|id| TabInfo {
                        id: id.map(TabId),
                        url: None,
                    })
                    .collect(),
                ..Default::default()
            }
        }

        pub(crate) fn sent(&self) -> Vec<(Scope, Message)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        async fn active_tabs(&self) -> Result<Vec<TabInfo>, TransportError> {
            if self.query_fails {
                return Err(TransportError::Query("no focused window".to_string()));
            }
            Ok(self.tabs.clone())
        }

        async fn send_to(
            &self,
            scope: Scope,
            message: &Message,
        ) -> Result<serde_json::Value, TransportError> {
            if let Scope::Tab(id) = scope {
                if self.failing.contains(&id) {
                    return Err(TransportError::NoReceiver(scope));
                }
            }
            self.sent.lock().unwrap().push((scope, message.clone()));
            Ok(json!({"ok": scope.to_string()}))
        }
    }

    #[tokio::test]
    async fn sends_to_every_tab_with_an_id() {
        let transport = FakeTransport::with_tabs(&[Some(1), None, Some(2)]);
        let msg = Message::new(MessageKind::IconClicked);

        let responses = send_to_all_active_tabs(&transport, &msg).await.unwrap();

        assert_eq!(responses, vec![json!({"ok": "tab 1"}), json!({"ok": "tab 2"})]);
        let scopes: Vec<Scope> = transport.sent().into_iter().map(|(s, _)| s).collect();
        assert_eq!(scopes, vec![Scope::Tab(TabId(1)), Scope::Tab(TabId(2))]);
    }

    #[tokio::test]
    async fn one_failing_tab_does_not_block_the_rest() {
        let mut transport = FakeTransport::with_tabs(&[Some(1), Some(2), Some(3)]);
        transport.failing = vec![TabId(2)];
        let msg = Message::with_payload(MessageKind::ThemeChanged, "dark");

        let responses = send_to_all_active_tabs(&transport, &msg).await.unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn query_failure_propagates() {
        let transport = FakeTransport {
            query_fails: true,
            ..Default::default()
        };
        let result = send_to_all_active_tabs(&transport, &Message::new(MessageKind::IconClicked)).await;
        assert!(matches!(result, Err(TransportError::Query(_))));
    }

    #[tokio::test]
    async fn no_tabs_yields_no_responses() {
        let transport = FakeTransport::default();
        let responses = send_to_all_active_tabs(&transport, &Message::new(MessageKind::IconClicked))
            .await
            .unwrap();
        assert!(responses.is_empty());
    }
}
