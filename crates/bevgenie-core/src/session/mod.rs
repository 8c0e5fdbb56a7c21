//! Session state: persona, conversation history, and the signal audit trail.

mod store;
mod tracker;

pub use store::SledSessionStore;
pub use tracker::{
    categorize_problem, PresentationData, ProblemCategory, ProblemSolution, RoiSummary,
    SessionTracker, UserQuery,
};

use crate::error::Result;
use crate::llm::ChatRole;
use crate::persona::PersonaScores;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How personalized a turn's output should be, derived from history depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    Fresh,
    Returning,
    DataConnected,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Fresh => "fresh",
            GenerationMode::Returning => "returning",
            GenerationMode::DataConnected => "data_connected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub persona: PersonaScores,
    /// User messages processed so far.
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.to_string(),
            persona: PersonaScores::default(),
            message_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Append-only conversation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: ChatRole,
    pub content: String,
    pub generation_mode: GenerationMode,
    pub created_at: DateTime<Utc>,
}

/// Audit entry for one detected signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSignalRecord {
    pub signal_type: String,
    pub evidence: String,
    pub strength: f32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

/// Session persistence keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session, creating an all-zero one on first use.
    async fn get_session(&self, session_id: &str) -> Result<SessionRecord>;

    async fn update_persona(&self, session_id: &str, persona: &PersonaScores) -> Result<()>;

    /// Append a turn. User turns also bump the session's message count.
    async fn add_conversation_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
        mode: GenerationMode,
    ) -> Result<()>;

    /// The last `limit` turns, oldest first.
    async fn get_conversation_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>>;

    async fn record_persona_signal(&self, session_id: &str, record: PersonaSignalRecord) -> Result<()>;

    async fn get_persona_signals(&self, session_id: &str) -> Result<Vec<PersonaSignalRecord>>;

    /// Remove every record of the session.
    async fn clear_session(&self, session_id: &str) -> Result<()>;
}
