//! Session-scoped assistant orchestrator.
//!
//! Owns the live [`SessionState`], drives replies through the configured
//! [`ResponseGenerator`], persists every change through [`SessionStorage`],
//! and broadcasts [`AssistantEvent`]s for whatever renders the conversation.
//!
//! Replies are produced on spawned tasks. Each send appends the user message
//! before returning and the reply task appends exactly one more, so callers
//! never observe a half-finished turn. Concurrent sends are not serialized:
//! each races its own timer and replies land in completion order.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::delay::Delay;
use super::handoff::{HandoffRecord, NavigationKind, Navigator, handoff_destination, path_of};
use super::state::{AssistantEvent, SessionState};
use crate::chat::{
    Message, MessageMetadata, create_assistant_message, create_bot_message, create_error_message,
    create_handoff_message, create_user_choice_message, create_user_message,
    create_welcome_message,
};
use crate::config::AssistantConfig;
use crate::error::GenerationError;
use crate::flow::{FormData, Step};
use crate::responses::{self, ResponseGenerator};
use crate::store::{KeyValueStore, SessionStorage};

const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Text of the error message produced by [`AssistantOrchestrator::test_error_handling`].
pub const SELF_TEST_ERROR_TEXT: &str =
    "This is a test error message. If you can read it, error handling works.";

/// Collaborators injected into an orchestrator.
#[derive(Clone)]
pub struct AssistantDeps {
    pub store: Arc<dyn KeyValueStore>,
    pub responder: Arc<dyn ResponseGenerator>,
    pub delay: Arc<dyn Delay>,
    pub navigator: Arc<dyn Navigator>,
}

/// Handle to a reply (or other delayed action) still in progress.
#[must_use = "dropping a PendingReply detaches it; await `finished` to observe completion"]
#[derive(Debug)]
pub struct PendingReply {
    handle: JoinHandle<()>,
}

impl PendingReply {
    fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until the delayed work has been applied to the session.
    pub async fn finished(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Pending assistant task did not complete");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ReplyKind {
    Standard,
    Contextual,
}

/// Cheaply cloneable handle to one assistant session.
#[derive(Clone)]
pub struct AssistantOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    state: RwLock<SessionState>,
    storage: SessionStorage,
    responder: Arc<dyn ResponseGenerator>,
    delay: Arc<dyn Delay>,
    navigator: Arc<dyn Navigator>,
    config: AssistantConfig,
    events: broadcast::Sender<AssistantEvent>,
    // Serializes snapshot-and-save so the last write always reflects the latest state.
    persist_lock: Mutex<()>,
}

impl AssistantOrchestrator {
    /// Create the session, restoring any messages persisted under `session_id`.
    pub async fn new(
        session_id: impl Into<String>,
        config: AssistantConfig,
        deps: AssistantDeps,
    ) -> Self {
        let session_id = session_id.into();
        let storage = SessionStorage::with_keys(
            deps.store,
            config.storage_key_prefix.clone(),
            config.handoff_key.clone(),
        );
        let messages = storage.load(&session_id).await;
        info!(
            session_id = %session_id,
            restored = messages.len(),
            responder = deps.responder.name(),
            "Assistant session started"
        );

        let (events, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(SessionState::new(session_id, messages)),
                storage,
                responder: deps.responder,
                delay: deps.delay,
                navigator: deps.navigator,
                config,
                events,
                persist_lock: Mutex::new(()),
            }),
        }
    }

    /// Subscribe to state change events.
    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.inner.config
    }

    // --- Read accessors ---

    pub async fn snapshot(&self) -> SessionState {
        self.inner.state.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.state.read().await.messages.clone()
    }

    pub async fn is_typing(&self) -> bool {
        self.inner.state.read().await.is_typing
    }

    pub async fn is_open(&self) -> bool {
        self.inner.state.read().await.is_open
    }

    pub async fn current_step(&self) -> Option<Step> {
        self.inner.state.read().await.current_step
    }

    pub async fn session_id(&self) -> String {
        self.inner.state.read().await.session_id.clone()
    }

    // --- Panel ---

    pub async fn open_assistant(&self) {
        self.inner.set_open(true).await;
    }

    pub async fn close_assistant(&self) {
        self.inner.set_open(false).await;
    }

    // --- Conversation ---

    /// Send a user message. Blank input is ignored and returns `None`.
    pub async fn send_message(&self, text: &str) -> Option<PendingReply> {
        self.send(text, ReplyKind::Standard).await
    }

    /// Like [`send_message`](Self::send_message), with the shorter delay and
    /// the reply tagged as context-aware.
    pub async fn send_contextual_message(&self, text: &str) -> Option<PendingReply> {
        self.send(text, ReplyKind::Contextual).await
    }

    async fn send(&self, text: &str, kind: ReplyKind) -> Option<PendingReply> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring blank message");
            return None;
        }

        let (step, form_data) = {
            let mut state = self.inner.state.write().await;
            let step = state.current_step;
            let form_data = state.form_data.clone();
            let message = create_user_message(text, MessageMetadata::for_context(step, &form_data));
            state.messages.push(message.clone());
            state.begin_reply();
            let _ = self.inner.events.send(AssistantEvent::MessageAdded(message));
            (step, form_data)
        };
        let _ = self.inner.events.send(AssistantEvent::TypingChanged(true));
        info!(step = ?step, kind = ?kind, "User message sent");
        self.inner.persist().await;

        let inner = Arc::clone(&self.inner);
        let input = text.to_string();
        let handle = tokio::spawn(async move {
            inner.complete_reply(input, step, form_data, kind).await;
        });
        Some(PendingReply::new(handle))
    }

    /// Record a choice made in the calculator. `None` uses the current step.
    pub async fn add_user_choice(&self, choice: &str, step: Option<Step>) {
        self.add_user_choice_with_data(choice, step, None).await;
    }

    /// Record a choice together with the calculation it produced.
    pub async fn add_user_choice_with_data(
        &self,
        choice: &str,
        step: Option<Step>,
        calculation_data: Option<serde_json::Value>,
    ) {
        let current = self.current_step().await;
        let message = create_user_choice_message(choice, step.or(current), calculation_data);
        info!(choice, step = ?message.metadata.step, "User choice recorded");
        self.inner.append(message).await;
    }

    pub async fn add_bot_message(&self, text: &str) {
        let metadata = self.inner.context_metadata().await;
        self.inner.append(create_bot_message(text, metadata)).await;
    }

    /// Append an error message. `None` uses the default error copy.
    pub async fn add_error_message(&self, text: Option<&str>) {
        let metadata = self.inner.context_metadata().await;
        self.inner.append(create_error_message(text, metadata)).await;
    }

    /// Post a bot message describing where the user now is in the flow.
    pub async fn announce_step_change(&self) {
        let step = self.current_step().await;
        self.add_bot_message(&responses::step_change_message(step)).await;
    }

    /// Greet the user for the current step. Returns whether a greeting was added.
    pub async fn show_welcome_message(&self) -> bool {
        let (step, form_data) = self.inner.context().await;
        let Some(step) = step else {
            debug!("No current step, skipping welcome message");
            return false;
        };
        let Some(message) = create_welcome_message(step, &form_data) else {
            debug!(step = %step, "Step has no welcome message");
            return false;
        };
        self.inner.append(message).await;
        true
    }

    /// Drop every message from memory and storage.
    pub async fn clear_messages(&self) {
        let session_id = {
            let mut state = self.inner.state.write().await;
            state.messages.clear();
            state.session_id.clone()
        };
        let _ = self.inner.events.send(AssistantEvent::MessagesCleared);
        info!(session_id = %session_id, "Messages cleared");

        let _guard = self.inner.persist_lock.lock().await;
        self.inner.storage.clear(&session_id).await;
    }

    // --- Flow context ---

    pub async fn set_current_step(&self, step: Option<Step>) {
        {
            let mut state = self.inner.state.write().await;
            state.current_step = step;
        }
        info!(step = ?step, "Current step changed");
        let _ = self.inner.events.send(AssistantEvent::StepChanged(step));
    }

    /// Replace the calculator's form snapshot.
    pub async fn update_form_data(&self, form_data: FormData) {
        {
            let mut state = self.inner.state.write().await;
            state.form_data = form_data;
        }
        debug!("Form data updated");
        let _ = self.inner.events.send(AssistantEvent::FormUpdated);
    }

    pub async fn step_guidance(&self) -> String {
        let (step, form_data) = self.inner.context().await;
        responses::step_guidance(step, &form_data)
    }

    pub async fn summary_for_handoff(&self) -> String {
        let (_, form_data) = self.inner.context().await;
        responses::handoff_summary(&form_data)
    }

    // --- Delayed actions ---

    /// Show the typing indicator, then post a fixed error message.
    pub async fn test_error_handling(&self) -> PendingReply {
        self.inner.begin_reply().await;
        info!("Error handling self-test started");

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            inner.delay.sleep(inner.config.error_test_delay).await;
            let metadata = inner.context_metadata().await;
            let message = create_error_message(Some(SELF_TEST_ERROR_TEXT), metadata);
            inner.finish_reply(message).await;
        });
        PendingReply::new(handle)
    }

    /// Write the handoff record, say goodbye, and after a pause close the panel
    /// and move the user to the main chat surface.
    pub async fn handoff_to_main_chat(&self) -> PendingReply {
        let (step, form_data, session_id) = {
            let state = self.inner.state.read().await;
            (
                state.current_step,
                state.form_data.clone(),
                state.session_id.clone(),
            )
        };

        let summary = responses::handoff_summary(&form_data);
        let record = HandoffRecord::new(summary, step, form_data.clone());
        if !self.inner.storage.save_handoff(&record).await {
            warn!(session_id = %session_id, "Continuing handoff without a stored record");
        }
        info!(session_id = %session_id, from_step = ?step, "Handoff to main chat started");
        let _ = self.inner.events.send(AssistantEvent::HandoffStarted(record));

        let farewell = create_handoff_message(MessageMetadata::for_context(step, &form_data));
        self.inner.append(farewell).await;

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            inner.delay.sleep(inner.config.handoff_delay).await;
            inner.set_open(false).await;
            inner.navigate_to_main_chat(&session_id);
        });
        PendingReply::new(handle)
    }
}

impl Inner {
    async fn context(&self) -> (Option<Step>, FormData) {
        let state = self.state.read().await;
        (state.current_step, state.form_data.clone())
    }

    async fn context_metadata(&self) -> MessageMetadata {
        let (step, form_data) = self.context().await;
        MessageMetadata::for_context(step, &form_data)
    }

    async fn set_open(&self, open: bool) {
        {
            let mut state = self.state.write().await;
            if state.is_open == open {
                return;
            }
            state.is_open = open;
        }
        info!(open, "Assistant panel toggled");
        let _ = self.events.send(AssistantEvent::PanelToggled(open));
    }

    /// Append one message and persist.
    async fn append(&self, message: Message) {
        {
            let mut state = self.state.write().await;
            state.messages.push(message.clone());
        }
        let _ = self.events.send(AssistantEvent::MessageAdded(message));
        self.persist().await;
    }

    async fn begin_reply(&self) {
        {
            let mut state = self.state.write().await;
            state.begin_reply();
        }
        let _ = self.events.send(AssistantEvent::TypingChanged(true));
    }

    /// Append the outcome of an in-flight reply, settle typing, persist.
    async fn finish_reply(&self, message: Message) {
        let typing = {
            let mut state = self.state.write().await;
            state.messages.push(message.clone());
            state.end_reply();
            state.is_typing
        };
        let _ = self.events.send(AssistantEvent::MessageAdded(message));
        if !typing {
            let _ = self.events.send(AssistantEvent::TypingChanged(false));
        }
        self.persist().await;
    }

    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let (session_id, messages) = {
            let state = self.state.read().await;
            (state.session_id.clone(), state.messages.clone())
        };
        self.storage.save(&session_id, &messages).await;
    }

    async fn complete_reply(
        self: Arc<Self>,
        input: String,
        step: Option<Step>,
        form_data: FormData,
        kind: ReplyKind,
    ) {
        let delay = match kind {
            ReplyKind::Standard => self.config.reply_delay,
            ReplyKind::Contextual => self.config.contextual_reply_delay,
        };
        self.delay.sleep(delay).await;

        let metadata = MessageMetadata {
            context_aware: matches!(kind, ReplyKind::Contextual),
            ..MessageMetadata::for_context(step, &form_data)
        };

        let message = match self.generate(input, step, form_data).await {
            Ok(text) => create_assistant_message(text, metadata),
            Err(e) => {
                warn!(
                    responder = self.responder.name(),
                    error = %e,
                    "Reply generation failed"
                );
                create_error_message(None, metadata)
            }
        };
        self.finish_reply(message).await;
    }

    /// Run the generator on its own task so a panicking backend still
    /// produces an error reply.
    async fn generate(
        &self,
        input: String,
        step: Option<Step>,
        form_data: FormData,
    ) -> Result<String, GenerationError> {
        let responder = Arc::clone(&self.responder);
        let name = responder.name().to_string();
        let task = tokio::spawn(async move { responder.generate(&input, step, &form_data).await });

        let text = match task.await {
            Ok(result) => result?,
            Err(e) => return Err(GenerationError::Aborted(e.to_string())),
        };
        if text.trim().is_empty() {
            return Err(GenerationError::Backend {
                backend: name,
                reason: "empty reply".to_string(),
            });
        }
        Ok(text)
    }

    fn navigate_to_main_chat(&self, session_id: &str) {
        let destination = handoff_destination(&self.config.main_chat_path, session_id);
        let current = self.navigator.current_path();
        let kind = if path_of(&current) == path_of(&self.config.main_chat_path) {
            self.navigator.replace(&destination);
            NavigationKind::Replace
        } else {
            self.navigator.navigate(&destination);
            NavigationKind::Navigate
        };
        info!(destination = %destination, kind = ?kind, "Navigated to main chat");
        let _ = self.events.send(AssistantEvent::Navigated { destination, kind });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::assistant::delay::{ImmediateDelay, TokioDelay};
    use crate::assistant::handoff::{COMPLETED_FLOW, MemoryNavigator};
    use crate::chat::{DEFAULT_ERROR_TEXT, HANDOFF_TEXT, MessageType, Sender};
    use crate::responses::ScriptedResponder;
    use crate::store::InMemoryStore;

    struct FailingResponder;

    #[async_trait]
    impl ResponseGenerator for FailingResponder {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(
            &self,
            _input: &str,
            _step: Option<Step>,
            _form_data: &FormData,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::Backend {
                backend: "failing".to_string(),
                reason: "backend offline".to_string(),
            })
        }
    }

    struct PanickingResponder;

    #[async_trait]
    impl ResponseGenerator for PanickingResponder {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn generate(
            &self,
            _input: &str,
            _step: Option<Step>,
            _form_data: &FormData,
        ) -> Result<String, GenerationError> {
            panic!("backend exploded")
        }
    }

    /// Echoes input and counts calls.
    #[derive(Default)]
    struct EchoResponder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResponseGenerator for EchoResponder {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            input: &str,
            _step: Option<Step>,
            _form_data: &FormData,
        ) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("echo: {input}"))
        }
    }

    struct Harness {
        assistant: AssistantOrchestrator,
        store: InMemoryStore,
        navigator: Arc<MemoryNavigator>,
    }

    async fn harness_with(
        responder: Arc<dyn ResponseGenerator>,
        delay: Arc<dyn Delay>,
        start_path: &str,
    ) -> Harness {
        let store = InMemoryStore::new();
        let navigator = Arc::new(MemoryNavigator::new(start_path));
        let deps = AssistantDeps {
            store: Arc::new(store.clone()),
            responder,
            delay,
            navigator: navigator.clone(),
        };
        let assistant = AssistantOrchestrator::new("s1", AssistantConfig::default(), deps).await;
        Harness {
            assistant,
            store,
            navigator,
        }
    }

    async fn harness() -> Harness {
        harness_with(
            Arc::new(ScriptedResponder::new()),
            Arc::new(ImmediateDelay),
            "/calculator",
        )
        .await
    }

    async fn stored_messages(store: &InMemoryStore) -> Vec<Message> {
        let raw = store
            .get("chatbot_messages_s1")
            .await
            .unwrap()
            .unwrap_or_else(|| "[]".to_string());
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn blank_message_is_ignored() {
        let h = harness().await;
        assert!(h.assistant.send_message("").await.is_none());
        assert!(h.assistant.send_message("   \n").await.is_none());
        assert!(h.assistant.messages().await.is_empty());
        assert!(!h.assistant.is_typing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn send_appends_user_message_then_reply() {
        let h = harness_with(
            Arc::new(ScriptedResponder::new()),
            Arc::new(TokioDelay),
            "/calculator",
        )
        .await;

        let pending = h.assistant.send_message("Hello").await.unwrap();
        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "Hello");
        assert!(h.assistant.is_typing().await);

        pending.finished().await;
        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert!(!messages[1].metadata.context_aware);
        assert!(!h.assistant.is_typing().await);
        assert_eq!(stored_messages(&h.store).await, messages);
    }

    #[tokio::test(start_paused = true)]
    async fn reply_waits_for_configured_delay() {
        let h = harness_with(
            Arc::new(ScriptedResponder::new()),
            Arc::new(TokioDelay),
            "/calculator",
        )
        .await;
        let start = tokio::time::Instant::now();

        h.assistant.send_message("Hi").await.unwrap().finished().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));

        let start = tokio::time::Instant::now();
        h.assistant
            .send_contextual_message("Hi again")
            .await
            .unwrap()
            .finished()
            .await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(600));
        assert!(elapsed < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn documents_question_on_guaranteed_payment() {
        let h = harness().await;
        h.assistant
            .set_current_step(Some(Step::GuaranteedPayment))
            .await;

        h.assistant
            .send_message("What documents do I need?")
            .await
            .unwrap()
            .finished()
            .await;

        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].metadata.step, Some(Step::GuaranteedPayment));
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert!(messages[1].text.contains("settlement agreement"));
        assert!(!messages[1].metadata.is_error);
    }

    #[tokio::test]
    async fn contextual_reply_is_tagged() {
        let h = harness().await;
        h.assistant
            .send_contextual_message("How long does this take?")
            .await
            .unwrap()
            .finished()
            .await;

        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].metadata.context_aware);
    }

    #[tokio::test]
    async fn generator_failure_becomes_error_message() {
        let h = harness_with(
            Arc::new(FailingResponder),
            Arc::new(ImmediateDelay),
            "/calculator",
        )
        .await;

        h.assistant.send_message("Anything").await.unwrap().finished().await;

        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].metadata.is_error);
        assert_eq!(messages[1].text, DEFAULT_ERROR_TEXT);
        assert!(!h.assistant.is_typing().await);
    }

    #[tokio::test]
    async fn generator_panic_becomes_error_message() {
        let h = harness_with(
            Arc::new(PanickingResponder),
            Arc::new(ImmediateDelay),
            "/calculator",
        )
        .await;

        h.assistant.send_message("Anything").await.unwrap().finished().await;

        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].metadata.is_error);
        assert!(!h.assistant.is_typing().await);
    }

    #[tokio::test]
    async fn storage_failure_keeps_conversation_going() {
        let h = harness().await;
        h.store.set_failing(true);

        h.assistant.send_message("Hello").await.unwrap().finished().await;

        assert_eq!(h.assistant.messages().await.len(), 2);
        assert!(!h.assistant.is_typing().await);
        h.store.set_failing(false);
        assert!(h.store.get("chatbot_messages_s1").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sends_interleave_by_completion() {
        let responder = Arc::new(EchoResponder::default());
        let h = harness_with(responder.clone(), Arc::new(TokioDelay), "/calculator").await;

        let first = h.assistant.send_message("first").await.unwrap();
        let second = h.assistant.send_contextual_message("second").await.unwrap();
        assert_eq!(h.assistant.messages().await.len(), 2);

        // The contextual reply has the shorter timer and lands first.
        second.finished().await;
        assert!(h.assistant.is_typing().await);
        first.finished().await;
        assert!(!h.assistant.is_typing().await);

        let texts: Vec<String> = h
            .assistant
            .messages()
            .await
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "echo: second", "echo: first"]);
        assert_eq!(responder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn user_choice_records_step() {
        let h = harness().await;
        h.assistant
            .add_user_choice("Yes", Some(Step::GuaranteedLumpSum))
            .await;

        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type, MessageType::UserChoice);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "Selected: Yes");
        assert_eq!(messages[0].metadata.step, Some(Step::GuaranteedLumpSum));
        assert_eq!(messages[0].metadata.choice.as_deref(), Some("Yes"));
    }

    #[tokio::test]
    async fn user_choice_defaults_to_current_step() {
        let h = harness().await;
        h.assistant.set_current_step(Some(Step::Amount)).await;
        h.assistant.add_user_choice("Monthly", None).await;
        assert_eq!(
            h.assistant.messages().await[0].metadata.step,
            Some(Step::Amount)
        );
    }

    #[tokio::test]
    async fn bot_and_error_messages_are_tagged() {
        let h = harness().await;
        h.assistant.add_bot_message("Heads up").await;
        h.assistant.add_error_message(None).await;
        h.assistant.add_error_message(Some("Custom failure")).await;

        let messages = h.assistant.messages().await;
        assert!(messages[0].metadata.is_bot_message);
        assert!(messages[1].metadata.is_error);
        assert_eq!(messages[1].text, DEFAULT_ERROR_TEXT);
        assert_eq!(messages[2].text, "Custom failure");
        assert_eq!(stored_messages(&h.store).await.len(), 3);
    }

    #[tokio::test]
    async fn welcome_message_requires_step_with_greeting() {
        let h = harness().await;
        assert!(!h.assistant.show_welcome_message().await);

        h.assistant.set_current_step(Some(Step::Review)).await;
        assert!(!h.assistant.show_welcome_message().await);
        assert!(h.assistant.messages().await.is_empty());

        h.assistant.set_current_step(Some(Step::Mode)).await;
        assert!(h.assistant.show_welcome_message().await);
        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].metadata.is_welcome);
    }

    #[tokio::test]
    async fn step_change_is_announced() {
        let h = harness().await;
        h.assistant.set_current_step(Some(Step::Amount)).await;
        h.assistant.announce_step_change().await;

        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].metadata.is_bot_message);
        assert_eq!(messages[0].text, responses::step_change_message(Some(Step::Amount)));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let h = harness().await;
        h.assistant.add_bot_message("one").await;
        h.assistant.clear_messages().await;
        assert!(h.assistant.messages().await.is_empty());
        assert!(h.store.get("chatbot_messages_s1").await.unwrap().is_none());

        h.assistant.clear_messages().await;
        assert!(h.assistant.messages().await.is_empty());
        assert!(h.store.get("chatbot_messages_s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_then_actions_append_in_order() {
        let h = harness().await;
        h.assistant.add_bot_message("old one").await;
        h.assistant.add_bot_message("old two").await;
        h.assistant.clear_messages().await;

        h.assistant.set_current_step(Some(Step::Mode)).await;
        h.assistant.add_user_choice("Guaranteed", None).await;
        h.assistant.add_bot_message("Noted").await;
        h.assistant.add_error_message(Some("Lookup failed")).await;
        assert!(h.assistant.show_welcome_message().await);

        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].text, "Selected: Guaranteed");
        assert_eq!(messages[1].text, "Noted");
        assert_eq!(messages[2].text, "Lookup failed");
        assert!(messages[3].metadata.is_welcome);
        assert_eq!(stored_messages(&h.store).await, messages);
    }

    #[tokio::test]
    async fn messages_are_restored_for_same_session() {
        let h = harness().await;
        h.assistant.add_bot_message("remember me").await;

        let deps = AssistantDeps {
            store: Arc::new(h.store.clone()),
            responder: Arc::new(ScriptedResponder::new()),
            delay: Arc::new(ImmediateDelay),
            navigator: h.navigator.clone(),
        };
        let restored = AssistantOrchestrator::new("s1", AssistantConfig::default(), deps.clone()).await;
        assert_eq!(restored.messages().await, h.assistant.messages().await);

        let other = AssistantOrchestrator::new("s2", AssistantConfig::default(), deps).await;
        assert!(other.messages().await.is_empty());
    }

    #[tokio::test]
    async fn panel_toggles() {
        let h = harness().await;
        let mut events = h.assistant.subscribe();
        assert!(!h.assistant.is_open().await);

        h.assistant.open_assistant().await;
        assert!(h.assistant.is_open().await);
        assert!(matches!(events.recv().await, Ok(AssistantEvent::PanelToggled(true))));

        h.assistant.close_assistant().await;
        assert!(!h.assistant.is_open().await);
        assert!(matches!(events.recv().await, Ok(AssistantEvent::PanelToggled(false))));
    }

    #[tokio::test(start_paused = true)]
    async fn self_test_posts_error_after_delay() {
        let h = harness_with(
            Arc::new(ScriptedResponder::new()),
            Arc::new(TokioDelay),
            "/calculator",
        )
        .await;
        let start = tokio::time::Instant::now();

        let pending = h.assistant.test_error_handling().await;
        assert!(h.assistant.is_typing().await);
        assert!(h.assistant.messages().await.is_empty());

        pending.finished().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].metadata.is_error);
        assert_eq!(messages[0].text, SELF_TEST_ERROR_TEXT);
        assert!(!h.assistant.is_typing().await);
    }

    #[tokio::test]
    async fn handoff_writes_record_and_navigates() {
        let h = harness().await;
        h.assistant.open_assistant().await;
        h.assistant.set_current_step(Some(Step::Offer)).await;
        h.assistant
            .update_form_data(FormData::new(serde_json::json!({
                "paymentType": "guaranteed",
                "paymentAmount": 1500
            })))
            .await;

        let pending = h.assistant.handoff_to_main_chat().await;
        let messages = h.assistant.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].metadata.is_handoff);
        assert_eq!(messages[0].text, HANDOFF_TEXT);

        pending.finished().await;
        assert!(!h.assistant.is_open().await);

        let raw = h.store.get("chatbot_handoff").await.unwrap().unwrap();
        let record: HandoffRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.from_step, Some(Step::Offer));
        assert_eq!(record.completed_flow, COMPLETED_FLOW);
        assert!(!record.summary.is_empty());
        assert_eq!(record.form_data.as_value()["paymentAmount"], 1500);

        assert_eq!(
            h.navigator.history(),
            vec![(
                NavigationKind::Navigate,
                "/chat?session=s1&handoff=true".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn handoff_on_main_chat_replaces_in_place() {
        let h = harness_with(
            Arc::new(ScriptedResponder::new()),
            Arc::new(ImmediateDelay),
            "/chat?tab=history",
        )
        .await;

        h.assistant.handoff_to_main_chat().await.finished().await;

        assert_eq!(
            h.navigator.history(),
            vec![(
                NavigationKind::Replace,
                "/chat?session=s1&handoff=true".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn handoff_survives_storage_failure() {
        let h = harness().await;
        h.store.set_failing(true);

        h.assistant.handoff_to_main_chat().await.finished().await;

        assert_eq!(h.assistant.messages().await.len(), 1);
        assert_eq!(h.navigator.history().len(), 1);
    }

    #[tokio::test]
    async fn guidance_and_summary_follow_context() {
        let h = harness().await;
        h.assistant.set_current_step(Some(Step::Amount)).await;
        let form = FormData::new(serde_json::json!({"paymentAmount": "2,500"}));
        h.assistant.update_form_data(form.clone()).await;

        assert_eq!(
            h.assistant.step_guidance().await,
            responses::step_guidance(Some(Step::Amount), &form)
        );
        assert_eq!(
            h.assistant.summary_for_handoff().await,
            responses::handoff_summary(&form)
        );
        assert!(h.assistant.messages().await.is_empty());
    }
}
