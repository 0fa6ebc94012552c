//! The chat widget controller.
//!
//! `ChatWidget` owns the transcript, the readiness flag and the view model.
//! It is only ever mutated from the host's event loop: background work (the
//! readiness loop and chat calls) reports back through [`WidgetEvent`]s which
//! the host feeds to [`ChatWidget::apply`].

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::client::ChatBackend;
use crate::config::WidgetConfig;
use crate::error::WidgetError;
use crate::readiness::ReadinessLoop;
use crate::state::{ChatMessage, ChatRole, Transcript};
use crate::view::{self, Author, BubbleId, WidgetView};

pub const NOTICE_MISSING_ORIGIN: &str = "⚠️ Falta configurar la URL del servidor.";
pub const NOTICE_STARTING: &str = "⏳ Estoy activándome, dame unos segundos y prueba otra vez.";
pub const NOTICE_CONNECTION_ERROR: &str = "⚠️ Error de conexión.";

/// Completions reported by background tasks.
#[derive(Debug)]
pub enum WidgetEvent {
    BackendReady,
    BackendUnavailable,
    ReplyReceived(Result<String, WidgetError>),
}

/// Receiving end of the widget's event channel, pumped by the host.
pub struct WidgetEvents {
    rx: UnboundedReceiver<WidgetEvent>,
}

impl WidgetEvents {
    pub async fn next(&mut self) -> Option<WidgetEvent> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<WidgetEvent> {
        self.rx.try_recv().ok()
    }
}

pub struct ChatWidget<B: ChatBackend> {
    config: WidgetConfig,
    backend: Arc<B>,
    transcript: Transcript,
    ready: bool,
    view: WidgetView,
    pending_reply: Option<BubbleId>,
    config_error_shown: bool,
    readiness: Option<ReadinessLoop>,
    events: UnboundedSender<WidgetEvent>,
}

impl<B: ChatBackend> ChatWidget<B> {
    /// Mount the widget and start watching the backend.
    ///
    /// Must be called from within a tokio runtime. Each call builds an
    /// independent widget; hosts call it once.
    pub fn initialize(config: WidgetConfig, backend: B) -> (Self, WidgetEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let view = WidgetView::mount(&config.title, config.max_message_chars);

        let mut widget = Self {
            config,
            backend: Arc::new(backend),
            transcript: Transcript::new(),
            ready: false,
            view,
            pending_reply: None,
            config_error_shown: false,
            readiness: None,
            events: tx,
        };

        debug!(origin = ?widget.config.api_origin, "chat widget mounted");
        widget.set_backend_state(false);
        widget.probe_readiness();

        (widget, WidgetEvents { rx })
    }

    /// Check the backend. With no origin configured the widget stays offline
    /// and says so once; otherwise a probe loop runs until the backend answers.
    pub fn probe_readiness(&mut self) {
        if self.config.api_origin.is_none() {
            self.set_backend_state(false);
            if !self.config_error_shown {
                warn!("no backend origin configured");
                self.config_error_shown = true;
                self.render_message(ChatRole::Assistant, NOTICE_MISSING_ORIGIN);
            }
            return;
        }

        if self.readiness.as_ref().is_some_and(|l| !l.is_finished()) {
            debug!("readiness loop already running");
            return;
        }

        self.readiness = Some(ReadinessLoop::spawn(
            self.backend.clone(),
            self.config.retry_delay,
            self.events.clone(),
        ));
    }

    /// Apply a completion reported by a background task.
    pub fn apply(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::BackendReady => {
                info!("chat backend online");
                self.set_backend_state(true);
            }
            WidgetEvent::BackendUnavailable => self.set_backend_state(false),
            WidgetEvent::ReplyReceived(result) => self.finish_send(result),
        }
    }

    fn set_backend_state(&mut self, ready: bool) {
        self.ready = ready;
        self.view.input.enabled = ready;
        self.view.send_enabled = ready;
        self.view.status = if ready {
            view::STATUS_ONLINE.to_string()
        } else {
            view::STATUS_STARTING.to_string()
        };
    }

    /// Input-change handler: truncates to the configured cap and refreshes
    /// the counter.
    pub fn input_changed(&mut self, value: &str) {
        self.view.input.set_value(value);
    }

    /// Send whatever is in the input field.
    pub fn send_message(&mut self) {
        if !self.ready {
            self.render_message(ChatRole::Assistant, NOTICE_STARTING);
            return;
        }

        let text = self.view.input.value().trim().to_string();
        if text.is_empty() {
            return;
        }

        if self.pending_reply.is_some() {
            debug!("reply still pending, ignoring send");
            return;
        }

        self.render_message(ChatRole::User, &text);
        self.view.input.clear();
        self.transcript.push(ChatMessage::user(text));

        self.pending_reply = Some(self.view.push_bubble(Author::Bot, view::THINKING_TEXT, true));

        let backend = self.backend.clone();
        let messages = self.transcript.as_slice().to_vec();
        let events = self.events.clone();
        debug!(messages = messages.len(), "sending chat request");
        tokio::spawn(async move {
            let result = backend.chat(&messages).await;
            // The widget may be gone by now; its reply is dropped with it.
            let _ = events.send(WidgetEvent::ReplyReceived(result));
        });
    }

    fn finish_send(&mut self, result: Result<String, WidgetError>) {
        if let Some(placeholder) = self.pending_reply.take() {
            self.view.remove_bubble(placeholder);
        }

        match result {
            Ok(reply) => {
                self.render_message(ChatRole::Assistant, &reply);
                self.transcript.push(ChatMessage::assistant(reply));
            }
            Err(err) => {
                warn!(error = %err, "chat request failed");
                self.render_message(ChatRole::Assistant, NOTICE_CONNECTION_ERROR);
            }
        }
    }

    /// Append a bubble. Assistant text is rendered as markdown-lite, user text
    /// literally.
    pub fn render_message(&mut self, role: ChatRole, text: &str) {
        let author = match role {
            ChatRole::User => Author::User,
            ChatRole::Assistant => Author::Bot,
        };
        self.view.push_bubble(author, text, false);
    }

    /// Show or hide the chat panel.
    pub fn toggle(&mut self) {
        self.view.open = !self.view.open;
    }

    /// Stop the readiness loop. Replies still in flight are discarded once the
    /// event receiver goes away.
    pub fn shutdown(&mut self) {
        if let Some(readiness) = self.readiness.take() {
            readiness.stop();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_waiting_for_reply(&self) -> bool {
        self.pending_reply.is_some()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn view(&self) -> &WidgetView {
        &self.view
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }
}

impl<B: ChatBackend> Drop for ChatWidget<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
