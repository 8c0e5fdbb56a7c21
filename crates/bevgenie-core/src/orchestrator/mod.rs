//! Stream orchestrator: one chat message in, an ordered event stream out.
//!
//! `prepare` validates the message and loads the session before any stream
//! exists, so its errors map to plain HTTP errors. `start` spawns the stage
//! machine and hands back the receiving half of the event channel. The
//! channel always carries exactly one terminal event (`complete` or `error`)
//! and is closed when the pipeline task ends.

mod events;

pub use events::{
    CompletePayload, GeneratedPage, SessionSnapshot, StageId, StagePayload, StageStatus,
    StreamEvent,
};

use crate::config::GenieConfig;
use crate::error::{GenieError, Result};
use crate::intent::{classify_message_intent, fallback_page_type};
use crate::knowledge::KnowledgeRetriever;
use crate::llm::{ChatTurn, LanguageModel};
use crate::page::{InteractionContext, PageGenerationRequest, PageGenerator};
use crate::persona::{
    detect_and_update_vectors, detect_signals, update_persona_with_signals, PersonaScores,
    PersonaVectorsSnapshot, Signal, SignalKind,
};
use crate::response::ResponseSynthesizer;
use crate::session::{
    ConversationMessage, GenerationMode, PersonaSignalRecord, SessionRecord, SessionStore,
};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};

const PAGE_CONVERSATION_TURNS: usize = 3;

/// One inbound chat turn.
#[derive(Debug, Clone, Default)]
pub struct ChatTurnRequest {
    pub session_id: String,
    pub message: String,
    pub interaction_context: Option<InteractionContext>,
    pub interaction_source: Option<String>,
}

type SessionLocks = DashMap<String, Arc<Mutex<()>>>;

/// Exclusive hold on one session. Dropping it, held or still waiting,
/// removes the map entry once no one else references it.
struct SessionLease {
    locks: Arc<SessionLocks>,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLease {
    async fn acquire(locks: &Arc<SessionLocks>, session_id: &str) -> Self {
        let mut lease = Self {
            locks: Arc::clone(locks),
            session_id: session_id.to_string(),
            guard: None,
        };
        let lock = lease
            .locks
            .entry(lease.session_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lease.guard = Some(lock.lock_owned().await);
        lease
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// A validated turn holding its session's lock until the pipeline finishes.
pub struct PreparedTurn {
    request: ChatTurnRequest,
    session: SessionRecord,
    history: Vec<ConversationMessage>,
    lease: SessionLease,
}

impl PreparedTurn {
    pub fn session(&self) -> &SessionRecord {
        &self.session
    }
}

/// `data_connected` for deep sessions with several pain points, `returning`
/// once the persona is reasonably confident, `fresh` otherwise.
pub fn determine_generation_mode(persona: &PersonaScores, message_count: u32) -> GenerationMode {
    if message_count > 5 && persona.pain_points_detected.len() >= 2 {
        GenerationMode::DataConnected
    } else if persona.overall_confidence > 0.5 && message_count > 2 {
        GenerationMode::Returning
    } else {
        GenerationMode::Fresh
    }
}

#[derive(Clone)]
struct EventSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
    terminal_sent: Arc<AtomicBool>,
    delay: Option<std::time::Duration>,
}

impl EventSink {
    fn emit(&self, event: StreamEvent) {
        if event.is_terminal() && self.terminal_sent.swap(true, Ordering::SeqCst) {
            tracing::warn!(target: "bevgenie::stream", event = event.name(), "dropping second terminal event");
            return;
        }
        if self.tx.send(event).is_err() {
            tracing::debug!(target: "bevgenie::stream", "client disconnected; continuing pipeline");
        }
    }

    async fn stage(&self, stage_id: StageId, status: StageStatus) {
        self.emit(StreamEvent::stage(stage_id, status));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn terminal_sent(&self) -> bool {
        self.terminal_sent.load(Ordering::SeqCst)
    }
}

pub struct StreamOrchestrator {
    config: Arc<GenieConfig>,
    sessions: Arc<dyn SessionStore>,
    knowledge: Arc<dyn KnowledgeRetriever>,
    responder: ResponseSynthesizer,
    pages: PageGenerator,
    locks: Arc<SessionLocks>,
}

impl StreamOrchestrator {
    pub fn new(
        config: Arc<GenieConfig>,
        model: Arc<dyn LanguageModel>,
        sessions: Arc<dyn SessionStore>,
        knowledge: Arc<dyn KnowledgeRetriever>,
    ) -> Self {
        let responder = ResponseSynthesizer::new(
            Arc::clone(&model),
            config.pipeline.response_max_tokens,
            config.pipeline.response_temperature,
        );
        let pages = PageGenerator::new(model, config.pipeline.page_max_tokens);
        Self {
            config,
            sessions,
            knowledge,
            responder,
            pages,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &GenieConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn page_generator(&self) -> &PageGenerator {
        &self.pages
    }

    pub fn validate_message(&self, message: &str) -> Result<()> {
        if message.trim().is_empty() {
            return Err(GenieError::InvalidInput(
                "Message is required and must be a non-empty string".to_string(),
            ));
        }
        let max = self.config.pipeline.max_message_chars;
        if message.chars().count() > max {
            return Err(GenieError::InvalidInput(format!(
                "Message is too long (max {} characters)",
                max
            )));
        }
        Ok(())
    }

    /// Validate, take the session lock, and load session state.
    pub async fn prepare(&self, mut request: ChatTurnRequest) -> Result<PreparedTurn> {
        self.validate_message(&request.message)?;
        request.message = request.message.trim().to_string();

        let lease = SessionLease::acquire(&self.locks, &request.session_id).await;

        let loaded = async {
            let session = self.sessions.get_session(&request.session_id).await?;
            let history = self
                .sessions
                .get_conversation_history(&request.session_id, self.config.pipeline.history_limit)
                .await?;
            Ok::<_, GenieError>((session, history))
        }
        .await;

        match loaded {
            Ok((session, history)) => Ok(PreparedTurn {
                request,
                session,
                history,
                lease,
            }),
            Err(e) => {
                drop(lease);
                tracing::error!(target: "bevgenie::stream", session_id = %request.session_id, error = %e, "session initialization failed");
                Err(e)
            }
        }
    }

    /// Wipe a session once any turn in flight on it has finished.
    pub async fn reset_session(&self, session_id: &str) -> Result<()> {
        let _lease = SessionLease::acquire(&self.locks, session_id).await;
        self.sessions.clear_session(session_id).await
    }

    /// Sessions with a turn running or waiting.
    pub fn active_sessions(&self) -> usize {
        self.locks.len()
    }

    /// Spawn the pipeline for a prepared turn.
    pub fn start(self: &Arc<Self>, turn: PreparedTurn) -> mpsc::UnboundedReceiver<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink {
            tx,
            terminal_sent: Arc::new(AtomicBool::new(false)),
            delay: self.config.stage_delay(),
        };
        let this = Arc::clone(self);
        let PreparedTurn {
            request,
            session,
            history,
            lease,
        } = turn;
        let session_id = request.session_id.clone();

        // The lease outlives the inner task so the next turn on this session
        // waits for the terminal event, panics included.
        tokio::spawn(async move {
            let _lease = lease;
            let pipeline = {
                let sink = sink.clone();
                tokio::spawn(async move { this.run(request, session, history, &sink).await })
            };

            let failure = match pipeline.await {
                Ok(()) if sink.terminal_sent() => None,
                Ok(()) => Some("Pipeline ended without a result".to_string()),
                Err(e) if e.is_panic() => Some("Internal error while processing your message".to_string()),
                Err(e) => Some(e.to_string()),
            };
            if let Some(error) = failure {
                tracing::error!(target: "bevgenie::stream", session_id = %session_id, error = %error, "pipeline aborted");
                sink.emit(StreamEvent::Error(error));
            }
        });
        rx
    }

    async fn run(
        &self,
        request: ChatTurnRequest,
        session: SessionRecord,
        history: Vec<ConversationMessage>,
        sink: &EventSink,
    ) {
        let session_id = request.session_id.as_str();
        let message = request.message.as_str();
        let persona_cfg = &self.config.persona;

        sink.stage(StageId::Init, StageStatus::Active).await;
        let chat_history: Vec<ChatTurn> = history
            .iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();
        sink.stage(StageId::Init, StageStatus::Complete).await;

        sink.stage(StageId::Intent, StageStatus::Active).await;
        let intent = classify_message_intent(message, history.len(), &session.persona);
        tracing::info!(
            target: "bevgenie::stream",
            session_id,
            intent = intent.intent.as_str(),
            confidence = intent.confidence,
            "intent classified"
        );
        sink.stage(StageId::Intent, StageStatus::Complete).await;

        sink.stage(StageId::Signals, StageStatus::Active).await;
        let signals = detect_signals(message, &session.persona);
        let persona = update_persona_with_signals(
            &session.persona,
            &signals,
            persona_cfg.confidence_growth_rate,
        );
        let context_text = request
            .interaction_context
            .as_ref()
            .map(InteractionContext::text)
            .filter(|t| !t.is_empty());
        let persona = detect_and_update_vectors(
            &persona,
            message,
            context_text.as_deref(),
            persona_cfg.vector_threshold,
        );
        for signal in &signals {
            self.record_signal(session_id, signal).await;
        }
        sink.stage(StageId::Signals, StageStatus::Complete).await;
        sink.emit(StreamEvent::PersonaVectors(PersonaVectorsSnapshot::from_persona(
            &persona,
            persona_cfg.classification_policy,
        )));

        sink.stage(StageId::Knowledge, StageStatus::Active).await;
        let knowledge = match self
            .knowledge
            .get_context_for_llm(message, &persona, self.config.pipeline.knowledge_top_k)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(target: "bevgenie::knowledge", session_id, error = %e, "knowledge retrieval failed; continuing without context");
                None
            }
        };
        sink.stage(StageId::Knowledge, StageStatus::Complete).await;

        sink.stage(StageId::Response, StageStatus::Active).await;
        let reply = self
            .responder
            .synthesize_or_fallback(&persona, knowledge.as_deref(), &chat_history, message)
            .await;
        sink.stage(StageId::Response, StageStatus::Complete).await;

        sink.stage(StageId::Page, StageStatus::Active).await;
        let page_type = intent
            .suggested_page_type
            .unwrap_or_else(|| fallback_page_type(&persona));
        let page_request = PageGenerationRequest {
            user_message: message.to_string(),
            page_type: Some(page_type),
            persona: Some(persona.clone()),
            knowledge_context: knowledge
                .as_deref()
                .map(|k| {
                    k.lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            knowledge_documents: Vec::new(),
            conversation_history: chat_history
                [chat_history.len().saturating_sub(PAGE_CONVERSATION_TURNS)..]
                .to_vec(),
            interaction_context: request.interaction_context.clone(),
            interaction_source: request.interaction_source.clone(),
            variant: None,
        };
        let generated = self.pages.generate_page_spec(&page_request).await;
        let generated_page = match (generated.success, generated.page) {
            (true, Some(page)) => {
                sink.emit(StreamEvent::Page(page.clone()));
                Some(GeneratedPage {
                    page,
                    intent: intent.intent,
                    intent_confidence: intent.confidence,
                })
            }
            _ => {
                tracing::warn!(
                    target: "bevgenie::page",
                    session_id,
                    retry_count = generated.retry_count,
                    error = generated.error.as_deref().unwrap_or("unknown"),
                    "page generation failed; continuing without a page"
                );
                None
            }
        };
        sink.stage(StageId::Page, StageStatus::Complete).await;

        let message_count = session.message_count.saturating_add(1);
        let mode = determine_generation_mode(&persona, message_count);
        self.persist(session_id, message, &reply, mode, &persona).await;

        sink.stage(StageId::Complete, StageStatus::Active).await;
        sink.emit(StreamEvent::Complete(Box::new(CompletePayload {
            success: true,
            message: reply,
            session: SessionSnapshot {
                session_id: session_id.to_string(),
                persona,
                message_count,
            },
            signals: signals.iter().map(Signal::describe).collect(),
            generation_mode: mode,
            generated_page,
        })));
        sink.stage(StageId::Complete, StageStatus::Complete).await;
    }

    async fn record_signal(&self, session_id: &str, signal: &Signal) {
        let (signal_type, tags) = match signal.kind {
            SignalKind::PainPoint(p) => ("pain_point_mention", vec![p.as_str().to_string()]),
            SignalKind::PersonaTrait(_) => ("persona_trait", Vec::new()),
        };
        tracing::info!(
            target: "bevgenie::signals",
            session_id,
            signal = %signal.describe(),
            evidence = %signal.evidence,
            "signal detected"
        );
        let record = PersonaSignalRecord {
            signal_type: signal_type.to_string(),
            evidence: signal.evidence.clone(),
            strength: signal.strength,
            tags,
            meta: Some(serde_json::json!({ "category": signal.kind.category_str() })),
            recorded_at: Utc::now(),
        };
        if let Err(e) = self.sessions.record_persona_signal(session_id, record).await {
            tracing::warn!(target: "bevgenie::signals", session_id, error = %e, "failed to record signal");
        }
    }

    async fn persist(
        &self,
        session_id: &str,
        message: &str,
        reply: &str,
        mode: GenerationMode,
        persona: &PersonaScores,
    ) {
        use crate::llm::ChatRole;
        for (role, content) in [(ChatRole::User, message), (ChatRole::Assistant, reply)] {
            if let Err(e) = self
                .sessions
                .add_conversation_message(session_id, role, content, mode)
                .await
            {
                tracing::warn!(target: "bevgenie::session", session_id, role = role.as_str(), error = %e, "failed to store conversation message");
            }
        }
        if let Err(e) = self.sessions.update_persona(session_id, persona).await {
            tracing::error!(target: "bevgenie::session", session_id, error = %e, "failed to persist persona; profile update lost");
        }
    }
}
