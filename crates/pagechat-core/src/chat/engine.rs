//! Chat engine: one page, one session, one turn at a time.
//!
//! ChatEngine ties together the session store, the settings, the content
//! loader and a generation client. A turn moves through
//! `Idle -> Sending -> Streaming -> Idle`, or `Idle -> Sending -> Failed -> Idle`
//! when generation fails. Either way the session gains exactly one assistant
//! message per accepted turn.
//!
//! The partially streamed answer is published through a `watch` channel so a
//! UI can render it while the turn is still running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use futures_util::StreamExt;
use pagechat_types::chat::{ChatMessage, ChatSession, SessionId};
use pagechat_types::content::PageContent;
use pagechat_types::error::{RepositoryError, SubmitError};
use pagechat_types::llm::{GenerationError, OutputLanguage};
use secrecy::SecretString;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::prompt::PromptBuilder;
use super::session_store::SessionStore;
use crate::content::{ContentExtractor, load_page_content};
use crate::llm::{GenerationClient, TokenBudgeter};
use crate::settings::Settings;
use crate::storage::KvStore;

/// Prefix of the assistant message recorded when generation fails.
pub const ERROR_PREFIX: &str = "Error processing your request. The error was: ";

/// Where the current turn is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    /// Prompt sent, nothing received yet.
    Sending,
    /// At least one chunk received.
    Streaming,
    /// Generation failed; the error message is being recorded.
    Failed,
}

/// How an accepted turn ended. Both variants carry the assistant message
/// that was appended to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed(ChatMessage),
    Failed(ChatMessage),
}

impl TurnOutcome {
    pub fn message(&self) -> &ChatMessage {
        match self {
            TurnOutcome::Completed(m) | TurnOutcome::Failed(m) => m,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TurnOutcome::Failed(_))
    }
}

/// The open page: its session and its budget-fitted text.
#[derive(Debug, Clone)]
struct ActiveChat {
    session: ChatSession,
    page: PageContent,
}

/// Clears the in-flight flag when a turn ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Answers user turns about one page at a time.
///
/// Generic over the store, the generation client and the extractor so the
/// core never depends on a concrete backend.
pub struct ChatEngine<S, G, E>
where
    S: KvStore + Clone,
    G: GenerationClient,
    E: ContentExtractor,
{
    sessions: SessionStore<S>,
    settings: Settings<S>,
    client: G,
    extractor: E,
    budgeter: TokenBudgeter,
    language: RwLock<OutputLanguage>,
    active: tokio::sync::Mutex<Option<ActiveChat>>,
    in_flight: AtomicBool,
    state: watch::Sender<TurnState>,
    streaming: watch::Sender<String>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl<S, G, E> ChatEngine<S, G, E>
where
    S: KvStore + Clone,
    G: GenerationClient,
    E: ContentExtractor,
{
    pub fn new(store: S, client: G, extractor: E, budgeter: TokenBudgeter) -> Self {
        Self {
            sessions: SessionStore::new(store.clone()),
            settings: Settings::new(store),
            client,
            extractor,
            budgeter,
            language: RwLock::new(OutputLanguage::Auto),
            active: tokio::sync::Mutex::new(None),
            in_flight: AtomicBool::new(false),
            state: watch::Sender::new(TurnState::Idle),
            streaming: watch::Sender::new(String::new()),
            cancel: Mutex::new(None),
        }
    }

    /// Builder-style output language.
    pub fn with_output_language(self, language: OutputLanguage) -> Self {
        self.set_output_language(language);
        self
    }

    pub fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    pub fn settings(&self) -> &Settings<S> {
        &self.settings
    }

    pub fn client(&self) -> &G {
        &self.client
    }

    pub fn set_output_language(&self, language: OutputLanguage) {
        *self.language.write().unwrap_or_else(PoisonError::into_inner) = language;
    }

    pub fn output_language(&self) -> OutputLanguage {
        self.language
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> TurnState {
        *self.state.borrow()
    }

    /// Follow state transitions.
    pub fn watch_state(&self) -> watch::Receiver<TurnState> {
        self.state.subscribe()
    }

    /// Follow the partial answer of the running turn. Empty between turns.
    pub fn streaming(&self) -> watch::Receiver<String> {
        self.streaming.subscribe()
    }

    /// Snapshot of the open session, if any.
    pub async fn session(&self) -> Option<ChatSession> {
        self.active.lock().await.as_ref().map(|a| a.session.clone())
    }

    /// Text of the open page as it goes into prompts.
    pub async fn page_content(&self) -> Option<PageContent> {
        self.active.lock().await.as_ref().map(|a| a.page.clone())
    }

    /// Open the chat for `url`, loading its page text.
    ///
    /// With `force_new` any previous conversation for the page is discarded.
    pub async fn open(&self, url: &str, force_new: bool) -> Result<ChatSession, RepositoryError> {
        let session = self.sessions.resolve(url, force_new).await?;
        let page = load_page_content(&self.extractor, &self.budgeter, url).await;
        info!(
            session_id = %session.id,
            %url,
            force_new,
            messages = session.messages.len(),
            truncated = page.is_truncated(),
            "chat opened"
        );

        *self.active.lock().await = Some(ActiveChat {
            session: session.clone(),
            page,
        });
        Ok(session)
    }

    /// Start over on the current page.
    pub async fn reset(&self) -> Result<ChatSession, RepositoryError> {
        let url = self
            .active
            .lock()
            .await
            .as_ref()
            .map(|a| a.session.page_url.clone())
            .ok_or(RepositoryError::NotFound)?;
        self.open(&url, true).await
    }

    /// Abort the running turn, if there is one.
    ///
    /// The turn still completes through the failure path, so the session
    /// records a cancellation message. Returns whether a turn was running.
    pub fn cancel(&self) -> bool {
        let token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        match token.as_ref() {
            Some(token) => {
                token.cancel();
                info!("cancelling in-flight turn");
                true
            }
            None => false,
        }
    }

    /// Run one user turn to completion.
    ///
    /// Rejected turns leave the session and the state untouched and never
    /// reach the generation client.
    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }

        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            debug!("submit rejected: turn already in flight");
            return Err(SubmitError::TurnInFlight);
        };

        let credential = match self.settings.api_key().await {
            Ok(Some(key)) => key,
            Ok(None) => return Err(SubmitError::MissingCredential),
            Err(e) => {
                warn!(error = %e, "could not read API key");
                return Err(SubmitError::MissingCredential);
            }
        };

        let (session_id, prompt) = {
            let mut active = self.active.lock().await;
            let Some(chat) = active.as_mut() else {
                return Err(SubmitError::NoSession);
            };

            let prompt = PromptBuilder::new(self.output_language()).build(
                &chat.page,
                &chat.session.messages,
                text,
            );

            if let Err(e) = self
                .sessions
                .append(&mut chat.session, ChatMessage::user(text))
                .await
            {
                error!(session_id = %chat.session.id, error = %e, "failed to persist user message");
            }
            (chat.session.id, prompt)
        };

        let token = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        self.state.send_replace(TurnState::Sending);
        debug!(%session_id, client = self.client.name(), prompt_chars = prompt.len(), "turn started");

        let result = self.generate(&credential, prompt, &token).await;

        let outcome = match result {
            Ok(answer) => {
                info!(%session_id, chars = answer.chars().count(), "turn completed");
                TurnOutcome::Completed(ChatMessage::assistant(answer))
            }
            Err(e) => {
                self.state.send_replace(TurnState::Failed);
                warn!(%session_id, error = %e, "turn failed");
                TurnOutcome::Failed(ChatMessage::assistant(format!("{ERROR_PREFIX}{e}")))
            }
        };

        self.record(session_id, outcome.message().clone()).await;

        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.streaming.send_replace(String::new());
        self.state.send_replace(TurnState::Idle);
        Ok(outcome)
    }

    /// Drain the client's stream into one answer, publishing progress.
    async fn generate(
        &self,
        credential: &SecretString,
        prompt: String,
        token: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let mut stream = self.client.generate(credential, prompt);
        let mut full_response = String::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(GenerationError::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    if full_response.is_empty() && self.state() == TurnState::Sending {
                        self.state.send_replace(TurnState::Streaming);
                    }
                    full_response.push_str(&chunk);
                    self.streaming.send_replace(full_response.clone());
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(full_response),
            }
        }
    }

    /// Append the assistant message to the session the turn belongs to.
    ///
    /// If the page was reopened mid-turn, the message goes to the original
    /// session in the store instead of the new one. If that session was
    /// deleted by a reset, the answer has nowhere to go and is dropped.
    async fn record(&self, session_id: SessionId, message: ChatMessage) {
        let mut active = self.active.lock().await;
        let result = match active.as_mut() {
            Some(chat) if chat.session.id == session_id => {
                self.sessions.append(&mut chat.session, message).await
            }
            _ => {
                debug!(%session_id, "session changed during turn, appending by id");
                self.sessions.append_by_id(session_id, message).await.map(|_| ())
            }
        };
        match result {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => {
                debug!(%session_id, "session was reset during turn, dropping answer");
            }
            Err(e) => error!(%session_id, error = %e, "failed to persist assistant message"),
        }
    }
}

impl<S, G, E> std::fmt::Debug for ChatEngine<S, G, E>
where
    S: KvStore + Clone,
    G: GenerationClient,
    E: ContentExtractor,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatEngine")
            .field("client", &self.client.name())
            .field("budgeter", &self.budgeter)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use pagechat_types::settings::API_KEY_KEY;
    use serde_json::json;

    use crate::content::tests::StaticExtractor;
    use crate::llm::TextStream;
    use crate::storage::MemoryKvStore;

    const URL: &str = "https://example.com/tos";

    /// Replays a fixed script of chunks, optionally hanging afterwards.
    struct ScriptedClient {
        script: Vec<Result<String, GenerationError>>,
        hang: bool,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                script,
                hang: false,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn hanging(script: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                hang: true,
                ..Self::new(script)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl GenerationClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate(&self, _credential: &SecretString, prompt: String) -> TextStream {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt);
            let script = self.script.clone();
            let hang = self.hang;
            Box::pin(async_stream::stream! {
                for item in script {
                    yield item;
                }
                if hang {
                    std::future::pending::<()>().await;
                }
            })
        }
    }

    type TestEngine = ChatEngine<Arc<MemoryKvStore>, ScriptedClient, StaticExtractor>;

    async fn engine_with(client: ScriptedClient, page: &str, with_key: bool) -> (TestEngine, Arc<MemoryKvStore>) {
        let store = Arc::new(MemoryKvStore::new());
        if with_key {
            store.set(API_KEY_KEY, &json!("test-key")).await.unwrap();
        }
        let engine = ChatEngine::new(
            Arc::clone(&store),
            client,
            StaticExtractor(Some(page.to_string())),
            TokenBudgeter::default(),
        );
        engine.open(URL, false).await.unwrap();
        (engine, store)
    }

    fn chunks(parts: &[&str]) -> Vec<Result<String, GenerationError>> {
        parts.iter().map(|p| Ok(p.to_string())).collect()
    }

    async fn stored_messages(engine: &TestEngine) -> Vec<(String, bool)> {
        let id = engine.session().await.unwrap().id;
        engine
            .sessions()
            .get(id)
            .await
            .unwrap()
            .unwrap()
            .messages
            .into_iter()
            .map(|m| (m.text, m.from_user))
            .collect()
    }

    #[tokio::test]
    async fn streamed_chunks_become_one_answer() {
        let (engine, _store) =
            engine_with(ScriptedClient::new(chunks(&["Hi", " there"])), "terms", true).await;

        let outcome = engine.submit("hello").await.unwrap();

        assert!(!outcome.is_failed());
        assert_eq!(outcome.message().text, "Hi there");
        assert_eq!(
            stored_messages(&engine).await,
            vec![("hello".to_string(), true), ("Hi there".to_string(), false)]
        );
        assert_eq!(engine.state(), TurnState::Idle);
        assert_eq!(*engine.streaming().borrow(), "");
    }

    #[tokio::test]
    async fn missing_key_refuses_without_side_effects() {
        let (engine, _store) = engine_with(ScriptedClient::new(chunks(&["x"])), "terms", false).await;

        let result = engine.submit("hello").await;

        assert_eq!(result, Err(SubmitError::MissingCredential));
        assert_eq!(engine.client().calls(), 0);
        assert!(stored_messages(&engine).await.is_empty());
        assert_eq!(engine.state(), TurnState::Idle);

        // The in-flight flag was released.
        engine.settings().set_api_key(&SecretString::from("k")).await.unwrap();
        assert!(engine.submit("hello").await.is_ok());
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let (engine, _store) = engine_with(ScriptedClient::new(chunks(&["x"])), "terms", true).await;

        assert_eq!(engine.submit("   \n").await, Err(SubmitError::EmptyInput));
        assert_eq!(engine.client().calls(), 0);
        assert!(stored_messages(&engine).await.is_empty());
    }

    #[tokio::test]
    async fn submit_without_open_session_is_rejected() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(API_KEY_KEY, &json!("k")).await.unwrap();
        let engine = ChatEngine::new(
            store,
            ScriptedClient::new(chunks(&["x"])),
            StaticExtractor(Some(String::new())),
            TokenBudgeter::default(),
        );

        assert_eq!(engine.submit("hello").await, Err(SubmitError::NoSession));
        assert_eq!(engine.client().calls(), 0);
    }

    #[tokio::test]
    async fn generation_error_becomes_assistant_message() {
        let client = ScriptedClient::new(vec![Err(GenerationError::Request("network down".to_string()))]);
        let (engine, _store) = engine_with(client, "terms", true).await;

        let outcome = engine.submit("hello").await.unwrap();

        assert!(outcome.is_failed());
        assert_eq!(
            stored_messages(&engine).await,
            vec![
                ("hello".to_string(), true),
                (
                    "Error processing your request. The error was: network down".to_string(),
                    false
                ),
            ]
        );
        assert_eq!(engine.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn mid_stream_error_discards_partial_answer() {
        let client = ScriptedClient::new(vec![
            Ok("Partial".to_string()),
            Err(GenerationError::Stream("connection reset".to_string())),
        ]);
        let (engine, _store) = engine_with(client, "terms", true).await;

        let outcome = engine.submit("hello").await.unwrap();

        assert_eq!(
            outcome.message().text,
            "Error processing your request. The error was: connection reset"
        );
        assert_eq!(*engine.streaming().borrow(), "");
    }

    #[tokio::test]
    async fn prompt_carries_history_and_truncation_note() {
        let client = ScriptedClient::new(chunks(&["ok"]));
        let store = Arc::new(MemoryKvStore::new());
        store.set(API_KEY_KEY, &json!("k")).await.unwrap();
        let engine = ChatEngine::new(
            store,
            client,
            StaticExtractor(Some("a".repeat(100))),
            TokenBudgeter::new(4, 10),
        );
        engine.open(URL, false).await.unwrap();

        engine.submit("first").await.unwrap();
        engine.submit("second").await.unwrap();

        let prompt = engine.client().last_prompt();
        assert!(prompt.contains("(note: only the first 40% could be processed due to length)"));
        assert!(prompt.contains("Previous conversation:\nUser: first\nAssistant: ok\n\n"));
        assert!(prompt.contains("User's request: second"));
        assert!(!prompt.contains("User: second"));
    }

    #[tokio::test]
    async fn output_language_is_threaded_into_prompt() {
        let (engine, _store) = engine_with(ScriptedClient::new(chunks(&["ok"])), "terms", true).await;
        engine.set_output_language(OutputLanguage::from_code("fr"));

        engine.submit("hello").await.unwrap();

        assert!(engine.client().last_prompt().contains("You MUST respond in French even if"));
        assert_eq!(engine.output_language().code(), "fr");
    }

    #[tokio::test]
    async fn concurrent_submit_is_rejected_and_cancel_fails_turn() {
        let client = ScriptedClient::hanging(chunks(&["Partial"]));
        let (engine, _store) = engine_with(client, "terms", true).await;
        let engine = Arc::new(engine);
        let mut partial = engine.streaming();

        let running = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.submit("hello").await }
        });

        partial.changed().await.unwrap();
        assert_eq!(*partial.borrow(), "Partial");
        assert_eq!(engine.state(), TurnState::Streaming);

        assert_eq!(engine.submit("again").await, Err(SubmitError::TurnInFlight));
        assert_eq!(engine.client().calls(), 1);

        assert!(engine.cancel());
        let outcome = running.await.unwrap().unwrap();

        assert!(outcome.is_failed());
        assert_eq!(
            outcome.message().text,
            "Error processing your request. The error was: generation cancelled"
        );
        assert_eq!(stored_messages(&engine).await.len(), 2);
        assert_eq!(engine.state(), TurnState::Idle);
        assert!(!engine.cancel());
    }

    #[tokio::test]
    async fn user_message_is_stored_verbatim() {
        let (engine, _store) = engine_with(ScriptedClient::new(chunks(&["ok"])), "terms", true).await;

        engine.submit("  line one\n  line two  ").await.unwrap();

        let stored = stored_messages(&engine).await;
        assert_eq!(stored[0], ("  line one\n  line two  ".to_string(), true));
    }

    #[tokio::test]
    async fn reset_during_turn_drops_answer_and_keeps_fresh_session_clean() {
        let client = ScriptedClient::hanging(chunks(&["Partial"]));
        let (engine, _store) = engine_with(client, "terms", true).await;
        let engine = Arc::new(engine);
        let mut partial = engine.streaming();
        let original = engine.session().await.unwrap();

        let running = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.submit("hello").await }
        });
        partial.changed().await.unwrap();

        let fresh = engine.reset().await.unwrap();
        assert!(engine.cancel());
        let outcome = running.await.unwrap().unwrap();

        assert!(outcome.is_failed());
        assert!(engine.sessions().get(original.id).await.unwrap().is_none());
        let stored = engine.sessions().get(fresh.id).await.unwrap().unwrap();
        assert!(stored.messages.is_empty());
        assert!(engine.session().await.unwrap().messages.is_empty());
        assert_eq!(engine.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn reset_starts_a_fresh_session() {
        let (engine, _store) = engine_with(ScriptedClient::new(chunks(&["ok"])), "terms", true).await;
        engine.submit("hello").await.unwrap();
        let before = engine.session().await.unwrap();

        let after = engine.reset().await.unwrap();

        assert_ne!(before.id, after.id);
        assert!(after.messages.is_empty());
        assert!(engine.sessions().get(before.id).await.unwrap().is_none());
        assert_eq!(engine.sessions().list_for_url(URL).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reopening_resumes_existing_conversation() {
        let (engine, store) = engine_with(ScriptedClient::new(chunks(&["ok"])), "terms", true).await;
        engine.submit("hello").await.unwrap();

        let again = ChatEngine::new(
            store,
            ScriptedClient::new(Vec::new()),
            StaticExtractor(None),
            TokenBudgeter::default(),
        );
        let session = again.open(URL, false).await.unwrap();

        assert_eq!(session.messages.len(), 2);
        assert_eq!(again.page_content().await.unwrap().text, "");
    }
}
