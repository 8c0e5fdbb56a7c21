//! Integration test: the streaming chat pipeline end to end.
//!
//! Runs real sled-backed sessions with scripted models and checks:
//! 1. Stage events arrive in order with monotonic progress.
//! 2. Exactly one terminal event is sent per turn, even when a stage panics.
//! 3. Model and knowledge failures degrade instead of failing the turn.
//! 4. Turns on the same session run one at a time.

mod common;

use bevgenie_core::orchestrator::{StageId, StageStatus};
use bevgenie_core::{
    ChatTurnRequest, GenerationMode, GenieConfig, KnowledgeRetriever, PersonaScores, SessionStore,
    SledSessionStore, StreamEvent, StreamOrchestrator, FALLBACK_REPLY,
};
use common::{BrokenKnowledge, EmptyKnowledge, PanickingKnowledge, ScriptedModel};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<SledSessionStore>,
    model: Arc<ScriptedModel>,
    orchestrator: Arc<StreamOrchestrator>,
}

fn harness(model: ScriptedModel, knowledge: Arc<dyn KnowledgeRetriever>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SledSessionStore::open(dir.path()).unwrap());
    let model = Arc::new(model);
    let orchestrator = Arc::new(StreamOrchestrator::new(
        Arc::new(GenieConfig::default()),
        model.clone(),
        store.clone(),
        knowledge,
    ));
    Harness {
        _dir: dir,
        store,
        model,
        orchestrator,
    }
}

fn request(session_id: &str, message: &str) -> ChatTurnRequest {
    ChatTurnRequest {
        session_id: session_id.to_string(),
        message: message.to_string(),
        ..Default::default()
    }
}

async fn drain(mut rx: UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("stream stalled")
    {
        events.push(event);
    }
    events
}

async fn run_turn(h: &Harness, session_id: &str, message: &str) -> Vec<StreamEvent> {
    let turn = h
        .orchestrator
        .prepare(request(session_id, message))
        .await
        .expect("prepare should succeed");
    drain(h.orchestrator.start(turn)).await
}

fn complete_payload(events: &[StreamEvent]) -> &bevgenie_core::orchestrator::CompletePayload {
    events
        .iter()
        .find_map(|e| match e {
            StreamEvent::Complete(c) => Some(c.as_ref()),
            _ => None,
        })
        .expect("complete event")
}

fn terminal_count(events: &[StreamEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

#[tokio::test]
async fn stages_arrive_in_order_and_end_with_complete() {
    let h = harness(ScriptedModel::healthy(), Arc::new(EmptyKnowledge));
    let events = run_turn(&h, "s-order", "How can you help our sales team?").await;

    let stages: Vec<(StageId, StageStatus, u8)> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Stage(s) => Some((s.stage_id, s.status, s.progress)),
            _ => None,
        })
        .collect();
    let expected: Vec<(StageId, StageStatus)> = StageId::ORDER
        .iter()
        .flat_map(|&id| [(id, StageStatus::Active), (id, StageStatus::Complete)])
        .collect();
    assert_eq!(
        stages.iter().map(|(id, st, _)| (*id, *st)).collect::<Vec<_>>(),
        expected
    );
    assert!(stages.windows(2).all(|w| w[0].2 < w[1].2), "progress must increase");

    assert_eq!(terminal_count(&events), 1);
    let complete_at = events.iter().position(|e| e.is_terminal()).unwrap();
    assert!(matches!(events[complete_at], StreamEvent::Complete(_)));
    // Only the closing stage marker may follow the terminal event.
    assert_eq!(events.len() - complete_at, 2);
    assert!(matches!(
        events.last(),
        Some(StreamEvent::Stage(s)) if s.stage_id == StageId::Complete && s.status == StageStatus::Complete
    ));

    let vectors_at = events
        .iter()
        .position(|e| matches!(e, StreamEvent::PersonaVectors(_)))
        .expect("persona_vectors event");
    let page_at = events
        .iter()
        .position(|e| matches!(e, StreamEvent::Page(_)))
        .expect("page event");
    assert!(vectors_at < page_at && page_at < complete_at);
}

#[tokio::test]
async fn sales_question_updates_persona_and_stays_fresh() {
    let h = harness(ScriptedModel::healthy(), Arc::new(EmptyKnowledge));
    let events = run_turn(&h, "s-sales", "How can you help our sales team?").await;

    let complete = complete_payload(&events);
    assert!(complete.success);
    assert_eq!(complete.message, "Happy to help.");
    assert_eq!(complete.generation_mode, GenerationMode::Fresh);
    assert_eq!(complete.session.message_count, 1);
    assert!(complete.session.persona.sales_focus_score > 0.0);
    assert!(complete
        .signals
        .iter()
        .any(|s| s.starts_with("persona_trait/sales: ")));

    let page = complete.generated_page.as_ref().expect("generated page");
    assert_eq!(page.intent, bevgenie_core::Intent::SalesInquiry);
    assert_eq!(page.page.page_type, bevgenie_core::PageType::SolutionBrief);

    // Persisted state matches what the stream reported.
    let session = h.store.get_session("s-sales").await.unwrap();
    assert_eq!(session.message_count, 1);
    assert_eq!(session.persona, complete.session.persona);
    let history = h.store.get_conversation_history("s-sales", 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "Happy to help.");
    let signals = h.store.get_persona_signals("s-sales").await.unwrap();
    assert!(signals.iter().any(|s| s.signal_type == "persona_trait"));
}

#[tokio::test]
async fn missing_knowledge_still_completes_without_background_block() {
    for knowledge in [
        Arc::new(EmptyKnowledge) as Arc<dyn KnowledgeRetriever>,
        Arc::new(BrokenKnowledge),
    ] {
        let h = harness(ScriptedModel::healthy(), knowledge);
        let events = run_turn(&h, "s-knowledge", "What does onboarding look like?").await;

        assert_eq!(terminal_count(&events), 1);
        assert!(complete_payload(&events).success);
        let calls = h.model.chat_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].system.contains("Background Context"));
    }
}

#[tokio::test]
async fn model_failures_fall_back_without_error_event() {
    let h = harness(ScriptedModel::failing(), Arc::new(EmptyKnowledge));
    let events = run_turn(&h, "s-down", "How can you help our sales team?").await;

    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Error(_))));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Page(_))));
    let complete = complete_payload(&events);
    assert_eq!(complete.message, FALLBACK_REPLY);
    assert!(complete.generated_page.is_none());
    // Initial attempt plus two retries.
    assert_eq!(h.model.page_calls(), 3);
}

#[tokio::test]
async fn panic_inside_a_stage_becomes_single_error_event() {
    let h = harness(ScriptedModel::healthy(), Arc::new(PanickingKnowledge::default()));
    let events = run_turn(&h, "s-panic", "Tell me about depletion forecasting").await;

    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(events.last(), Some(StreamEvent::Error(_))));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Complete(_))));

    // The session lock was released; the next turn runs normally.
    let events = run_turn(&h, "s-panic", "And what about compliance?").await;
    assert!(complete_payload(&events).success);
}

#[tokio::test]
async fn turns_on_one_session_are_serialized() {
    let h = harness(ScriptedModel::healthy(), Arc::new(EmptyKnowledge));
    let first = h
        .orchestrator
        .prepare(request("s-serial", "We are a craft brewery"))
        .await
        .unwrap();

    let orchestrator = h.orchestrator.clone();
    let second = tokio::spawn(async move {
        orchestrator
            .prepare(request("s-serial", "We sell in three states"))
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished(), "second turn must wait for the first");

    drain(h.orchestrator.start(first)).await;
    let second = second.await.unwrap().unwrap();
    // The second turn sees the first turn's persisted state.
    assert_eq!(second.session().message_count, 1);
    assert!(second.session().persona.craft_score > 0.0);
    drain(h.orchestrator.start(second)).await;

    let session = h.store.get_session("s-serial").await.unwrap();
    assert_eq!(session.message_count, 2);
}

#[tokio::test]
async fn invalid_messages_are_rejected_before_streaming() {
    let h = harness(ScriptedModel::healthy(), Arc::new(EmptyKnowledge));
    let err = h.orchestrator.prepare(request("s-bad", "   ")).await.err().unwrap();
    assert!(err.to_string().contains("non-empty"));

    let long = "a".repeat(5001);
    let err = h.orchestrator.prepare(request("s-bad", &long)).await.err().unwrap();
    assert!(err.to_string().contains("max 5000"));

    assert!(h.orchestrator.prepare(request("s-bad", &"a".repeat(5000))).await.is_ok());
}

#[tokio::test]
async fn reset_waits_for_the_turn_in_flight() {
    let h = harness(ScriptedModel::healthy(), Arc::new(EmptyKnowledge));
    run_turn(&h, "s-reset", "We are a craft brewery").await;
    let turn = h
        .orchestrator
        .prepare(request("s-reset", "How do I get my sales reps to close more?"))
        .await
        .unwrap();

    let orchestrator = h.orchestrator.clone();
    let reset = tokio::spawn(async move { orchestrator.reset_session("s-reset").await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!reset.is_finished(), "reset must wait for the running turn");

    drain(h.orchestrator.start(turn)).await;
    reset.await.unwrap().unwrap();

    // Nothing the turn persisted survives the reset.
    let session = h.store.get_session("s-reset").await.unwrap();
    assert_eq!(session.message_count, 0);
    assert_eq!(session.persona, PersonaScores::default());
    assert!(h.store.get_conversation_history("s-reset", 10).await.unwrap().is_empty());
    assert!(h.store.get_persona_signals("s-reset").await.unwrap().is_empty());
    assert_eq!(h.orchestrator.active_sessions(), 0);
}

#[tokio::test]
async fn abandoned_waiter_leaves_no_lock_behind() {
    let h = harness(ScriptedModel::healthy(), Arc::new(EmptyKnowledge));
    let first = h
        .orchestrator
        .prepare(request("s-abandon", "We are a distributor"))
        .await
        .unwrap();

    let orchestrator = h.orchestrator.clone();
    let waiter = tokio::spawn(async move {
        orchestrator
            .prepare(request("s-abandon", "Never mind"))
            .await
            .map(|_| ())
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    waiter.abort();
    assert!(waiter.await.unwrap_err().is_cancelled());

    drain(h.orchestrator.start(first)).await;
    assert_eq!(h.orchestrator.active_sessions(), 0);
}
