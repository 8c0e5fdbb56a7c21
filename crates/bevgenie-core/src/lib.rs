//! bevgenie-core: persona detection, page specifications, knowledge retrieval, and the
//! streaming chat pipeline behind the BevGenie gateway.
//!
//! The gateway only talks to this crate through the re-exports below.

mod config;
mod error;
mod intent;
mod llm;
mod response;

pub mod knowledge;
pub mod orchestrator;
pub mod page;
pub mod persona;
pub mod presentation;
pub mod session;

// Configuration and errors
pub use config::{
    ClassificationPolicy, GenieConfig, KnowledgeConfig, LlmConfig, PersonaConfig,
    PipelineConfig, ServerConfig,
};
pub use error::{GenieError, LlmError, Result};

// Model access
pub use llm::{
    ChatRole, ChatTurn, CompletionRequest, Embedder, LanguageModel, OpenRouterClient,
    EMBEDDING_DIMENSIONS,
};

// Classification and replies
pub use intent::{classify_message_intent, fallback_page_type, Intent, IntentClassification};
pub use response::{build_system_prompt, ResponseSynthesizer, FALLBACK_REPLY};

// Pipeline
pub use orchestrator::{
    determine_generation_mode, ChatTurnRequest, PreparedTurn, StreamEvent, StreamOrchestrator,
};

pub use knowledge::{KnowledgeRetriever, SledKnowledgeBase};
pub use page::{BevGeniePage, PageGenerator, PageType};
pub use persona::PersonaScores;
pub use presentation::{PresentationGenerator, Slide};
pub use session::{GenerationMode, SessionStore, SledSessionStore};
