//! Chat Session
//!
//! A linear transcript backed by the assistant endpoint, with at most
//! one question in flight.
//!
//! ## States
//!
//! `idle -> awaiting -> idle`. A send while awaiting is rejected with a
//! warning notice and never queued. The in-flight flag is released by a
//! drop guard, so the session returns to idle on every path.
//!
//! The transcript shows what the user typed. The text sent to the
//! backend carries the selected language's instruction suffix.

mod message;

pub use message::{
    ChartSlot, ChatMessage, Language, Notice, NoticeLevel, Role, UnknownLanguage, ANSWER_FAILURE,
    BUSY_NOTICE, CONNECTION_FAILURE, QUICK_QUESTIONS, WELCOME_MESSAGE,
};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::api::{Backend, ChatReply};
use crate::charts::{ChartConfig, ChartError, SharedCharts};

const EVENT_CAPACITY: usize = 256;

/// Result of a [`ChatSession::send_message`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty or whitespace-only input
    Ignored,
    /// Another question is still awaiting its reply
    Busy,
    Answered,
    /// An error message was appended instead of an answer
    Failed,
}

/// Pushed to subscribers as the session changes
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Ready { quick_questions: Vec<String> },
    MessageAdded(ChatMessage),
    Typing(bool),
    Notice(Notice),
    ChartBound { panel_id: String },
    Cleared,
    Opened,
    Closed,
}

#[derive(Debug, Default)]
struct ChatState {
    messages: Vec<ChatMessage>,
    notices: Vec<Notice>,
    language: Language,
    open: bool,
    typing: bool,
}

/// Releases the in-flight flag when the send finishes or is dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ChatSession {
    api: Arc<dyn Backend>,
    charts: SharedCharts,
    state: Mutex<ChatState>,
    awaiting: AtomicBool,
    chart_seq: AtomicU64,
    notice_ttl: Duration,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatSession {
    pub fn new(
        api: Arc<dyn Backend>,
        charts: SharedCharts,
        language: Language,
        notice_ttl: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            api,
            charts,
            state: Mutex::new(ChatState {
                language,
                ..ChatState::default()
            }),
            awaiting: AtomicBool::new(false),
            chart_seq: AtomicU64::new(0),
            notice_ttl,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Arm the session and announce the quick questions
    pub async fn initialize(&self) {
        let language = self.language().await;
        tracing::info!(language = language.code(), "Chat initialized");
        self.emit(ChatEvent::Ready {
            quick_questions: QUICK_QUESTIONS.iter().map(|q| q.to_string()).collect(),
        });
    }

    /// Submit a question.
    ///
    /// The user message is appended before the request goes out. On any
    /// failure an error-flagged assistant message with a generic text is
    /// appended; the underlying error is only logged.
    pub async fn send_message(&self, raw: &str) -> SendOutcome {
        let text = raw.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        if self
            .awaiting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Send rejected while awaiting a reply");
            self.notify(NoticeLevel::Warning, BUSY_NOTICE).await;
            return SendOutcome::Busy;
        }
        let _in_flight = InFlight(&self.awaiting);

        let question = self.language().await.instruct(text);
        self.push(ChatMessage::user(text)).await;
        self.set_typing(true).await;

        let result = self.api.ask(&question).await;

        self.set_typing(false).await;
        let (message, outcome) = match result {
            Ok(reply) => self.reply_message(reply),
            Err(e) => {
                tracing::error!(error = %e, "Chat error");
                (ChatMessage::error(CONNECTION_FAILURE), SendOutcome::Failed)
            }
        };
        self.push(message).await;

        outcome
    }

    /// Send one of [`QUICK_QUESTIONS`]
    pub async fn send_quick_question(&self, index: usize) -> Option<SendOutcome> {
        let question = QUICK_QUESTIONS.get(index)?;
        Some(self.send_message(question).await)
    }

    fn reply_message(&self, reply: ChatReply) -> (ChatMessage, SendOutcome) {
        if !reply.success {
            tracing::warn!(
                error = reply.error.as_deref().unwrap_or("Unknown error"),
                "Assistant reported a failure"
            );
            return (ChatMessage::error(ANSWER_FAILURE), SendOutcome::Failed);
        }

        let mut message = ChatMessage::assistant(reply.answer.unwrap_or_default());
        if let Some(spec) = reply.chart_data.as_ref() {
            match ChartConfig::chat_inline(spec) {
                Ok(config) => {
                    let seq = self.chart_seq.fetch_add(1, Ordering::SeqCst) + 1;
                    message = message.with_chart(ChartSlot {
                        panel_id: format!("chat-chart-{seq}"),
                        config,
                    });
                }
                Err(e) => tracing::error!(error = %e, "Chart rendering error"),
            }
        }
        (message, SendOutcome::Answered)
    }

    /// Bind a message's chart once its slot is mounted in the view
    pub async fn bind_chart(&self, panel_id: &str) -> Result<(), ChartError> {
        let config = {
            let state = self.state.lock().await;
            state
                .messages
                .iter()
                .filter_map(|m| m.chart.as_ref())
                .find(|slot| slot.panel_id == panel_id)
                .map(|slot| slot.config.clone())
        };
        let Some(config) = config else {
            tracing::error!(panel = %panel_id, "Canvas not found");
            return Err(ChartError::MissingCanvas(panel_id.to_string()));
        };

        self.charts.lock().await.render(panel_id, &config).map_err(|e| {
            tracing::error!(panel = %panel_id, error = %e, "Chart rendering error");
            e
        })?;

        tracing::debug!(panel = %panel_id, "Chat chart rendered");
        self.emit(ChatEvent::ChartBound {
            panel_id: panel_id.to_string(),
        });
        Ok(())
    }

    /// Empty the transcript and re-seed the welcome message. A pending
    /// reply is not cancelled and lands after the welcome message.
    pub async fn clear_history(&self) {
        let stale: Vec<String> = {
            let mut state = self.state.lock().await;
            let stale = state
                .messages
                .drain(..)
                .filter_map(|m| m.chart.map(|slot| slot.panel_id))
                .collect();
            state.messages.push(ChatMessage::welcome());
            stale
        };

        if !stale.is_empty() {
            let mut charts = self.charts.lock().await;
            for panel_id in &stale {
                charts.destroy(panel_id);
            }
        }

        self.emit(ChatEvent::Cleared);
        let welcome = self.state.lock().await.messages.first().cloned();
        if let Some(welcome) = welcome {
            self.emit(ChatEvent::MessageAdded(welcome));
        }
    }

    /// Open the panel; the first open seeds the welcome message
    pub async fn open(&self) {
        let welcome = {
            let mut state = self.state.lock().await;
            if state.open {
                return;
            }
            state.open = true;
            if state.messages.is_empty() {
                let welcome = ChatMessage::welcome();
                state.messages.push(welcome.clone());
                Some(welcome)
            } else {
                None
            }
        };

        self.emit(ChatEvent::Opened);
        if let Some(welcome) = welcome {
            self.emit(ChatEvent::MessageAdded(welcome));
        }
    }

    pub async fn close(&self) {
        let was_open = std::mem::replace(&mut self.state.lock().await.open, false);
        if was_open {
            self.emit(ChatEvent::Closed);
        }
    }

    /// Flip the panel; returns whether it is now open
    pub async fn toggle(&self) -> bool {
        if self.is_open().await {
            self.close().await;
            false
        } else {
            self.open().await;
            true
        }
    }

    pub async fn is_open(&self) -> bool {
        self.state.lock().await.open
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting.load(Ordering::SeqCst)
    }

    pub async fn is_typing(&self) -> bool {
        self.state.lock().await.typing
    }

    pub async fn language(&self) -> Language {
        self.state.lock().await.language
    }

    pub async fn set_language(&self, language: Language) {
        self.state.lock().await.language = language;
        tracing::debug!(language = language.code(), "Reply language changed");
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    /// Show a transient notice
    pub async fn notify(&self, level: NoticeLevel, text: &str) -> Uuid {
        let notice = Notice::new(level, text);
        let id = notice.id;
        {
            let mut state = self.state.lock().await;
            state.notices.retain(|n| !n.is_expired(self.notice_ttl));
            state.notices.push(notice.clone());
        }
        self.emit(ChatEvent::Notice(notice));
        id
    }

    /// Notices that have not yet expired
    pub async fn notices(&self) -> Vec<Notice> {
        let mut state = self.state.lock().await;
        state.notices.retain(|n| !n.is_expired(self.notice_ttl));
        state.notices.clone()
    }

    async fn push(&self, message: ChatMessage) {
        self.state.lock().await.messages.push(message.clone());
        self.emit(ChatEvent::MessageAdded(message));
    }

    async fn set_typing(&self, typing: bool) {
        self.state.lock().await.typing = typing;
        self.emit(ChatEvent::Typing(typing));
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.events.send(event);
    }
}
