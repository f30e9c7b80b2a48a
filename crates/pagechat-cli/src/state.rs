//! Application state wiring all services together.
//!
//! AppState pins the generic core services to the concrete infra
//! implementations and plays the part of the browser: it owns the tab bus,
//! runs the background context on it, and can open content-context tabs.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use pagechat_core::chat::ChatEngine;
use pagechat_core::llm::{BoxGenerationClient, TokenBudgeter};
use pagechat_core::message::{BackgroundRuntime, ContentReceiver, MessageDispatcher};
use pagechat_infra::config::{load_config, resolve_data_dir, store_path};
use pagechat_infra::extract::PageExtractor;
use pagechat_infra::llm::build_generation_client;
use pagechat_infra::storage::JsonFileKvStore;
use pagechat_infra::transport::{TabBus, spawn_responder};
use pagechat_types::config::AppConfig;
use pagechat_types::message::TabId;
use serde_json::Value;
use tokio::task::JoinHandle;

/// Store shared by the engine, the settings and the session commands.
pub type SharedStore = Arc<JsonFileKvStore>;

/// Chat engine pinned to the file store, the configured backend and the
/// page extractor.
pub type ConcreteChatEngine = ChatEngine<SharedStore, BoxGenerationClient, PageExtractor>;

/// A content-context tab opened on the bus.
pub struct OpenTab {
    pub id: TabId,
    pub receiver: Arc<ContentReceiver>,
    responder: JoinHandle<()>,
}

/// Shared application state holding all services.
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub store: SharedStore,
    pub engine: Arc<ConcreteChatEngine>,
    pub bus: Arc<TabBus>,
    pub background: BackgroundRuntime,
    next_tab: AtomicU32,
    _background_task: JoinHandle<()>,
}

impl AppState {
    /// Initialize the application state: load config, open the store, wire
    /// services, and start the background context.
    pub async fn init() -> anyhow::Result<Self> {
        Self::with_data_dir(resolve_data_dir()).await
    }

    pub async fn with_data_dir(data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let store = Arc::new(JsonFileKvStore::open(store_path(&data_dir)).await?);

        let client = build_generation_client(&config)?;
        let extractor = PageExtractor::new()?;
        let engine = ChatEngine::new(
            Arc::clone(&store),
            client,
            extractor,
            TokenBudgeter::from_config(&config),
        )
        .with_output_language(config.output_language.clone());

        let bus = Arc::new(TabBus::new(Duration::from_millis(
            config.tab_reply_timeout_ms,
        )));
        let background = BackgroundRuntime::new(Arc::new(
            MessageDispatcher::with_default_handlers(Arc::clone(&bus)),
        ));

        let runtime = background.clone();
        let background_task = spawn_responder(bus.register_background(), move |raw| {
            let runtime = runtime.clone();
            async move { runtime.on_message(&raw).await.map(Value::Bool) }
        });

        tracing::debug!(data_dir = %data_dir.display(), model = %config.model, "application state ready");

        Ok(Self {
            data_dir,
            config,
            store,
            engine: Arc::new(engine),
            bus,
            background,
            next_tab: AtomicU32::new(1),
            _background_task: background_task,
        })
    }

    /// Open an active tab on `url` whose content context answers bus
    /// messages with its sidebar state.
    pub async fn open_tab(&self, url: Option<String>) -> anyhow::Result<OpenTab> {
        let theme = self.engine.settings().theme().await?;
        let id = TabId(self.next_tab.fetch_add(1, Ordering::Relaxed));
        let receiver = Arc::new(ContentReceiver::new(theme));

        let mailbox = self.bus.register_tab(id, url);
        self.bus.set_active(id, true);

        let handle = Arc::clone(&receiver);
        let responder = spawn_responder(mailbox, move |raw| {
            let receiver = Arc::clone(&handle);
            async move { receiver.on_message(&raw) }
        });

        Ok(OpenTab {
            id,
            receiver,
            responder,
        })
    }

    /// Close a tab opened with [`AppState::open_tab`].
    pub fn close_tab(&self, tab: OpenTab) {
        self.bus.close_tab(tab.id);
        tab.responder.abort();
    }
}
