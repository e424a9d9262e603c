//! Transcript entries, reply languages and notices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::charts::ChartConfig;

/// Seeded into an empty transcript on first open and after clearing
pub const WELCOME_MESSAGE: &str = "👋 Hi! I'm your AI assistant for UIDAI data analysis.\n\
\n\
I can help you with:\n\
• Finding crisis districts\n\
• Comparing state performance\n\
• Analyzing biometric ratios\n\
• Answering data questions\n\
\n\
Try asking a question or click a quick question below!";

/// Shown when the request never produced a usable response
pub const CONNECTION_FAILURE: &str =
    "Failed to get response. Please check your connection and try again.";

/// Shown when the backend answered with `success: false`
pub const ANSWER_FAILURE: &str =
    "Sorry, I encountered an error while answering your question. Please try rephrasing it.";

/// Notice shown when a send is attempted while a reply is pending
pub const BUSY_NOTICE: &str = "Please wait for the current response...";

/// Preset questions offered under the transcript
pub const QUICK_QUESTIONS: [&str; 4] = [
    "Which districts need urgent attention?",
    "Show me top 10 states by bio ratio",
    "Compare Maharashtra and Punjab performance",
    "What's the national average bio ratio?",
];

/// Language the assistant is asked to answer in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "te")]
    Telugu,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Telugu => "te",
        }
    }

    /// Instruction appended to the question sent to the backend
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Language::English => None,
            Language::Hindi => Some(" (हिंदी में जवाब दें)"),
            Language::Telugu => Some(" (తెలుగులో సమాధానం ఇవ్వండి)"),
        }
    }

    /// The text actually sent for `question`
    pub fn instruct(self, question: &str) -> String {
        match self.suffix() {
            Some(suffix) => format!("{question}{suffix}"),
            None => question.to_string(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::English => "English",
            Language::Hindi => "हिंदी",
            Language::Telugu => "తెలుగు",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown language '{0}' (expected en, hi or te)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "hi" | "hindi" => Ok(Language::Hindi),
            "te" | "telugu" => Ok(Language::Telugu),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A chart embedded in an assistant message. The chart is bound to
/// `panel_id` once the adapter reports the slot as mounted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlot {
    pub panel_id: String,
    pub config: ChartConfig,
}

/// One transcript entry. Entries are never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSlot>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            is_error: false,
            timestamp: Utc::now(),
            chart: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn welcome() -> Self {
        Self::assistant(WELCOME_MESSAGE)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(content)
        }
    }

    pub fn with_chart(mut self, slot: ChartSlot) -> Self {
        self.chart = Some(slot);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient toast; expires after the configured TTL
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub text: String,
    pub created: tokio::time::Instant,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            text: text.into(),
            created: tokio::time::Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: std::time::Duration) -> bool {
        self.created.elapsed() >= ttl
    }
}
