use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub mod guidance;
pub mod practice;
pub mod session;
pub mod settings;
pub mod submission;

pub use guidance::{Guidance, GuidanceStep, InteractiveCheck, RevealKind, RevealStep};
pub use practice::{PracticeProblem, PracticeQuery, PracticeResponse};
pub use session::{CreateSessionRequest, LearningSession, Persona};
pub use settings::{Provider, Settings, SettingsUpdate};
pub use submission::{FileUpload, ParsedProblem, Submission};

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// One turn of the conversation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    Guidance(Box<Guidance>),
}

impl ChatMessage {
    fn new(role: MessageRole, content: MessageContent) -> Self {
        let timestamp = Utc::now();
        // Millisecond clock plus a process-wide sequence keeps ids distinct
        // for messages created within the same millisecond.
        let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{}-{}", timestamp.timestamp_millis(), seq),
            role,
            content,
            timestamp,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, MessageContent::Text(text.into()))
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, MessageContent::Text(text.into()))
    }

    pub fn assistant_guidance(guidance: Guidance) -> Self {
        Self::new(
            MessageRole::Assistant,
            MessageContent::Guidance(Box::new(guidance)),
        )
    }

    pub fn guidance(&self) -> Option<&Guidance> {
        match &self.content {
            MessageContent::Guidance(guidance) => Some(guidance),
            MessageContent::Text(_) => None,
        }
    }
}
