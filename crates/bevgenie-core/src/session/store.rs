use super::{
    ConversationMessage, GenerationMode, PersonaSignalRecord, SessionRecord, SessionStore,
};
use crate::error::Result;
use crate::llm::ChatRole;
use crate::persona::PersonaScores;
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;

const SESSIONS_TREE: &str = "sessions";
const CONVERSATION_TREE: &str = "conversation";
const SIGNALS_TREE: &str = "persona_signals";

/// Sled-backed session store.
///
/// Conversation and signal keys are `{len:08x}:{session_id}/{seq:020}` with
/// `seq` from [`sled::Db::generate_id`], so a prefix scan yields insertion
/// order. The length segment keeps `a` from matching the records of `a/b`.
#[derive(Clone)]
pub struct SledSessionStore {
    db: sled::Db,
    sessions: sled::Tree,
    conversation: sled::Tree,
    signals: sled::Tree,
}

fn prefix(session_id: &str) -> String {
    format!("{:08x}:{}/", session_id.len(), session_id)
}

impl SledSessionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_db(sled::open(path)?)
    }

    pub fn with_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            sessions: db.open_tree(SESSIONS_TREE)?,
            conversation: db.open_tree(CONVERSATION_TREE)?,
            signals: db.open_tree(SIGNALS_TREE)?,
            db,
        })
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        match self.sessions.get(session_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        self.sessions
            .insert(record.session_id.as_bytes(), serde_json::to_vec(record)?)?;
        Ok(())
    }

    fn next_key(&self, session_id: &str) -> Result<String> {
        Ok(format!("{}{:020}", prefix(session_id), self.db.generate_id()?))
    }
}

#[async_trait]
impl SessionStore for SledSessionStore {
    async fn get_session(&self, session_id: &str) -> Result<SessionRecord> {
        if let Some(record) = self.load(session_id)? {
            return Ok(record);
        }
        let record = SessionRecord::new(session_id);
        self.save(&record)?;
        tracing::info!(target: "bevgenie::session", session_id, "session created");
        Ok(record)
    }

    async fn update_persona(&self, session_id: &str, persona: &PersonaScores) -> Result<()> {
        let mut record = self
            .load(session_id)?
            .unwrap_or_else(|| SessionRecord::new(session_id));
        record.persona = persona.clone();
        record.updated_at = Utc::now();
        self.save(&record)
    }

    async fn add_conversation_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
        mode: GenerationMode,
    ) -> Result<()> {
        let message = ConversationMessage {
            role,
            content: content.to_string(),
            generation_mode: mode,
            created_at: Utc::now(),
        };
        let key = self.next_key(session_id)?;
        self.conversation
            .insert(key.as_bytes(), serde_json::to_vec(&message)?)?;

        if role == ChatRole::User {
            let mut record = self
                .load(session_id)?
                .unwrap_or_else(|| SessionRecord::new(session_id));
            record.message_count = record.message_count.saturating_add(1);
            record.updated_at = Utc::now();
            self.save(&record)?;
        }
        Ok(())
    }

    async fn get_conversation_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>> {
        let mut messages = Vec::new();
        for item in self.conversation.scan_prefix(prefix(session_id).as_bytes()).rev() {
            if messages.len() >= limit {
                break;
            }
            let (_, bytes) = item?;
            messages.push(serde_json::from_slice::<ConversationMessage>(&bytes)?);
        }
        messages.reverse();
        Ok(messages)
    }

    async fn record_persona_signal(&self, session_id: &str, record: PersonaSignalRecord) -> Result<()> {
        let key = self.next_key(session_id)?;
        self.signals.insert(key.as_bytes(), serde_json::to_vec(&record)?)?;
        Ok(())
    }

    async fn get_persona_signals(&self, session_id: &str) -> Result<Vec<PersonaSignalRecord>> {
        self.signals
            .scan_prefix(prefix(session_id).as_bytes())
            .map(|item| -> Result<PersonaSignalRecord> {
                let (_, bytes) = item?;
                Ok(serde_json::from_slice(&bytes)?)
            })
            .collect()
    }

    async fn clear_session(&self, session_id: &str) -> Result<()> {
        self.sessions.remove(session_id.as_bytes())?;
        for tree in [&self.conversation, &self.signals] {
            let keys: Vec<sled::IVec> = tree
                .scan_prefix(prefix(session_id).as_bytes())
                .keys()
                .collect::<std::result::Result<_, _>>()?;
            for key in keys {
                tree.remove(key)?;
            }
        }
        tracing::info!(target: "bevgenie::session", session_id, "session cleared");
        Ok(())
    }
}
