#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use bevgenie_core::{
    CompletionRequest, Embedder, GenieConfig, LanguageModel, LlmError, SledKnowledgeBase,
    SledSessionStore, EMBEDDING_DIMENSIONS,
};
use bevgenie_gateway::{build_app, AppState};
use serde_json::json;
use std::sync::Arc;

/// Chat replies with a fixed sentence; JSON calls return a valid solution
/// brief, or a four-slide deck when asked for slides.
pub struct FixedModel;

#[async_trait]
impl LanguageModel for FixedModel {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
        Ok("We can help your team prioritize accounts.".to_string())
    }

    async fn complete_json(
        &self,
        system: &str,
        _user: &str,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        if system.contains("slide") {
            let slides: Vec<_> = (1..=4)
                .map(|n| {
                    json!({
                        "slideNumber": n,
                        "title": format!("Slide {n}"),
                        "content": {"type": "bullets", "data": ["one", "two"]},
                        "visualDescription": "clean layout",
                        "speakerNotes": "notes"
                    })
                })
                .collect();
            return Ok(format!("Here is the deck:\n{}", json!(slides)));
        }
        Ok(json!({
            "type": "solution_brief",
            "title": "Prioritize the accounts that matter",
            "description": "How beverage sales teams focus rep time on the accounts most likely to grow.",
            "sections": [
                {"type": "hero", "headline": "Focus every rep on the right account",
                 "subheadline": "Account prioritization built for beverage sales teams."},
                {"type": "feature_grid", "features": [
                    {"title": "Account scoring", "description": "Rank accounts by growth potential."},
                    {"title": "Route planning", "description": "Visit the right stores each week."}
                ]},
                {"type": "metrics", "metrics": [{"value": "25%", "label": "More visits to growth accounts"}]},
                {"type": "cta", "title": "See your accounts ranked", "buttons": [
                    {"text": "Book a demo", "action": "schedule_demo"}
                ]}
            ]
        })
        .to_string())
    }
}

pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut v = vec![0.0f32; EMBEDDING_DIMENSIONS];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let h = word
                .to_lowercase()
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            v[h as usize % EMBEDDING_DIMENSIONS] += 1.0;
        }
        Ok(v)
    }
}

pub struct TestApp {
    pub _dir: tempfile::TempDir,
    pub router: Router,
}

pub fn app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = sled::open(dir.path()).unwrap();
    let sessions = Arc::new(SledSessionStore::with_db(db.clone()).unwrap());
    let knowledge = Arc::new(SledKnowledgeBase::new(&db, Arc::new(HashEmbedder), 0.3).unwrap());
    let state = AppState::new(
        Arc::new(GenieConfig::default()),
        Arc::new(FixedModel),
        sessions,
        knowledge,
    );
    TestApp {
        _dir: dir,
        router: build_app(state),
    }
}
