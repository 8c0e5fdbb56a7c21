//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bevgenie_core::knowledge::{KnowledgeDocument, KnowledgeFilters};
use bevgenie_core::{
    CompletionRequest, Embedder, KnowledgeRetriever, LanguageModel, LlmError, Result,
    EMBEDDING_DIMENSIONS,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One scripted model outcome.
#[derive(Debug, Clone)]
pub enum Scripted {
    Text(String),
    Fail,
}

impl Scripted {
    fn into_result(self) -> std::result::Result<String, LlmError> {
        match self {
            Scripted::Text(text) => Ok(text),
            Scripted::Fail => Err(LlmError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            }),
        }
    }
}

/// Model double. Chat replies and page JSON come from separate scripts; once a
/// script runs dry the matching default is returned.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Scripted>>,
    pages: Mutex<VecDeque<Scripted>>,
    default_reply: Scripted,
    default_page: Scripted,
    pub chat_calls: Mutex<Vec<CompletionRequest>>,
    pub page_prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new(default_reply: Scripted, default_page: Scripted) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            pages: Mutex::new(VecDeque::new()),
            default_reply,
            default_page,
            chat_calls: Mutex::new(Vec::new()),
            page_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies "Happy to help." and produces a valid solution brief.
    pub fn healthy() -> Self {
        Self::new(
            Scripted::Text("Happy to help.".to_string()),
            Scripted::Text(valid_page("solution_brief").to_string()),
        )
    }

    pub fn failing() -> Self {
        Self::new(Scripted::Fail, Scripted::Fail)
    }

    pub fn with_pages(self, pages: Vec<Scripted>) -> Self {
        *self.pages.lock().unwrap() = pages.into();
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_prompts.lock().unwrap().len()
    }

    pub fn page_user_prompts(&self) -> Vec<String> {
        self.page_prompts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, user)| user.clone())
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<String, LlmError> {
        self.chat_calls.lock().unwrap().push(request);
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.default_reply.clone()).into_result()
    }

    async fn complete_json(
        &self,
        system: &str,
        user: &str,
        _max_tokens: u32,
    ) -> std::result::Result<String, LlmError> {
        self.page_prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        let next = self.pages.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.default_page.clone()).into_result()
    }
}

/// A page of `page_type` that passes validation (five sections, enough for every type).
pub fn valid_page(page_type: &str) -> Value {
    json!({
        "type": page_type,
        "title": "Close the retail execution gap",
        "description": "How beverage suppliers see what happens on shelf without extra field visits.",
        "sections": [
            {"type": "hero", "headline": "See every shelf, every week",
             "subheadline": "Retail execution visibility built for beverage suppliers.",
             "ctaButton": {"text": "Book a demo", "action": "schedule_demo"}},
            {"type": "feature_grid", "features": [
                {"title": "Shelf alerts", "description": "Know when placements slip."},
                {"title": "Rep routing", "description": "Send reps where it matters most."}
            ]},
            {"type": "testimonial", "quote": "We found forty lost placements in our first month.",
             "author": "Dana Ruiz", "company": "Hop Valley"},
            {"type": "metrics", "metrics": [
                {"value": "40", "label": "Placements recovered"}
            ]},
            {"type": "cta", "title": "Start closing the gap", "buttons": [
                {"text": "Talk to us", "action": "contact", "primary": true}
            ]}
        ]
    })
}

/// Bag-of-words embedding: each lowercase word bumps one hashed dimension.
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, LlmError> {
        let mut v = vec![0.0f32; EMBEDDING_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut h: u32 = 2166136261;
            for b in word.to_lowercase().bytes() {
                h = (h ^ b as u32).wrapping_mul(16777619);
            }
            v[h as usize % EMBEDDING_DIMENSIONS] += 1.0;
        }
        Ok(v)
    }
}

/// Retriever with nothing to say.
pub struct EmptyKnowledge;

#[async_trait]
impl KnowledgeRetriever for EmptyKnowledge {
    async fn get_knowledge_documents(
        &self,
        _message: &str,
        _filters: Option<&KnowledgeFilters>,
        _top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>> {
        Ok(Vec::new())
    }
}

/// Retriever whose backend is down.
pub struct BrokenKnowledge;

#[async_trait]
impl KnowledgeRetriever for BrokenKnowledge {
    async fn get_knowledge_documents(
        &self,
        _message: &str,
        _filters: Option<&KnowledgeFilters>,
        _top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>> {
        Err(bevgenie_core::GenieError::Knowledge("vector index offline".to_string()))
    }
}

/// Retriever that panics on its first call and is empty afterwards.
#[derive(Default)]
pub struct PanickingKnowledge {
    tripped: AtomicBool,
}

#[async_trait]
impl KnowledgeRetriever for PanickingKnowledge {
    async fn get_knowledge_documents(
        &self,
        _message: &str,
        _filters: Option<&KnowledgeFilters>,
        _top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("retriever bug");
        }
        Ok(Vec::new())
    }
}
