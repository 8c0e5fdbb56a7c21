//! Typed stream events and their wire names.

use crate::intent::Intent;
use crate::page::BevGeniePage;
use crate::persona::{PersonaScores, PersonaVectorsSnapshot};
use crate::session::GenerationMode;
use serde::Serialize;
use serde_json::Value;

/// Pipeline stages in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Init,
    Intent,
    Signals,
    Knowledge,
    Response,
    Page,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Active,
    Complete,
}

impl StageId {
    pub const ORDER: [StageId; 7] = [
        StageId::Init,
        StageId::Intent,
        StageId::Signals,
        StageId::Knowledge,
        StageId::Response,
        StageId::Page,
        StageId::Complete,
    ];

    fn label(&self, status: StageStatus) -> &'static str {
        use StageStatus::{Active, Complete};
        match (self, status) {
            (StageId::Init, Active) => "Initializing...",
            (StageId::Init, Complete) => "Session ready",
            (StageId::Intent, Active) => "Analyzing your question...",
            (StageId::Intent, Complete) => "Question analyzed",
            (StageId::Signals, Active) => "Detecting your profile...",
            (StageId::Signals, Complete) => "Profile updated",
            (StageId::Knowledge, Active) => "Searching knowledge base...",
            (StageId::Knowledge, Complete) => "Context gathered",
            (StageId::Response, Active) => "Generating response...",
            (StageId::Response, Complete) => "Response ready",
            (StageId::Page, Active) => "Generating personalized page...",
            (StageId::Page, Complete) => "Page ready",
            (StageId::Complete, Active) => "Finalizing...",
            (StageId::Complete, Complete) => "Complete",
        }
    }

    fn progress(&self, status: StageStatus) -> u8 {
        let (active, complete) = match self {
            StageId::Init => (5, 8),
            StageId::Intent => (10, 20),
            StageId::Signals => (30, 40),
            StageId::Knowledge => (50, 60),
            StageId::Response => (70, 80),
            StageId::Page => (85, 95),
            StageId::Complete => (98, 100),
        };
        match status {
            StageStatus::Active => active,
            StageStatus::Complete => complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePayload {
    pub stage_id: StageId,
    pub status: StageStatus,
    pub stage_name: &'static str,
    pub progress: u8,
}

impl StagePayload {
    pub fn new(stage_id: StageId, status: StageStatus) -> Self {
        Self {
            stage_id,
            status,
            stage_name: stage_id.label(status),
            progress: stage_id.progress(status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub persona: PersonaScores,
    pub message_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPage {
    pub page: BevGeniePage,
    pub intent: Intent,
    pub intent_confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    pub success: bool,
    pub message: String,
    pub session: SessionSnapshot,
    pub signals: Vec<String>,
    pub generation_mode: GenerationMode,
    pub generated_page: Option<GeneratedPage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Stage(StagePayload),
    PersonaVectors(PersonaVectorsSnapshot),
    Page(BevGeniePage),
    Complete(Box<CompletePayload>),
    Error(String),
}

impl StreamEvent {
    pub fn stage(stage_id: StageId, status: StageStatus) -> Self {
        StreamEvent::Stage(StagePayload::new(stage_id, status))
    }

    /// SSE `event:` name.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Stage(_) => "stage",
            StreamEvent::PersonaVectors(_) => "persona_vectors",
            StreamEvent::Page(_) => "page",
            StreamEvent::Complete(_) => "complete",
            StreamEvent::Error(_) => "error",
        }
    }

    /// `complete` and `error` end a stream; exactly one is sent per turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete(_) | StreamEvent::Error(_))
    }

    /// SSE `data:` payload.
    pub fn data(&self) -> serde_json::Result<Value> {
        match self {
            StreamEvent::Stage(p) => serde_json::to_value(p),
            StreamEvent::PersonaVectors(v) => serde_json::to_value(v),
            StreamEvent::Page(page) => Ok(serde_json::json!({ "page": page })),
            StreamEvent::Complete(c) => serde_json::to_value(c),
            StreamEvent::Error(error) => Ok(serde_json::json!({ "error": error })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_payload_wire_shape() {
        let data = StreamEvent::stage(StageId::Knowledge, StageStatus::Active)
            .data()
            .unwrap();
        assert_eq!(
            data,
            serde_json::json!({
                "stageId": "knowledge",
                "status": "active",
                "stageName": "Searching knowledge base...",
                "progress": 50
            })
        );
    }

    #[test]
    fn progress_increases_along_the_order() {
        let mut last = 0;
        for stage in StageId::ORDER {
            for status in [StageStatus::Active, StageStatus::Complete] {
                let p = StagePayload::new(stage, status).progress;
                assert!(p > last);
                last = p;
            }
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn error_payload() {
        let event = StreamEvent::Error("boom".into());
        assert!(event.is_terminal());
        assert_eq!(event.name(), "error");
        assert_eq!(event.data().unwrap(), serde_json::json!({"error": "boom"}));
    }
}
