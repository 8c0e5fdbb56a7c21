//! Layered runtime configuration.
//!
//! Precedence (lowest first): built-in defaults, an optional TOML file
//! (`BEVGENIE_CONFIG`, default `config/bevgenie.toml`), then `BEVGENIE__*`
//! environment variables, e.g. `BEVGENIE__PIPELINE__STAGE_DELAY_MS=50`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/bevgenie.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenieConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_page_model")]
    pub page_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Upper bound for a single model call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Stored turns replayed to the model when synthesizing a reply.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_response_max_tokens")]
    pub response_max_tokens: u32,
    #[serde(default = "default_response_temperature")]
    pub response_temperature: f32,
    #[serde(default = "default_page_max_tokens")]
    pub page_max_tokens: u32,
    #[serde(default = "default_knowledge_top_k")]
    pub knowledge_top_k: usize,
    /// Cosmetic pause between stage events. Zero disables pacing.
    #[serde(default)]
    pub stage_delay_ms: u64,
}

/// Which history entry wins when classifying a detection axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    #[default]
    Latest,
    HighestConfidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Rate `k` in `overall_confidence = 1 - exp(-k * signal_mass)`.
    #[serde(default = "default_confidence_growth_rate")]
    pub confidence_growth_rate: f32,
    /// Minimum evidence before a detection-vector entry is appended.
    #[serde(default = "default_vector_threshold")]
    pub vector_threshold: f32,
    #[serde(default)]
    pub classification_policy: ClassificationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_storage_path() -> String {
    "./data/bevgenie".to_string()
}
fn default_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_chat_model() -> String {
    "openai/gpt-4o".to_string()
}
fn default_page_model() -> String {
    "anthropic/claude-opus-4.1".to_string()
}
fn default_embedding_model() -> String {
    "openai/text-embedding-3-small".to_string()
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_max_message_chars() -> usize {
    5000
}
fn default_history_limit() -> usize {
    10
}
fn default_response_max_tokens() -> u32 {
    300
}
fn default_response_temperature() -> f32 {
    0.7
}
fn default_page_max_tokens() -> u32 {
    4000
}
fn default_knowledge_top_k() -> usize {
    5
}
fn default_confidence_growth_rate() -> f32 {
    0.35
}
fn default_vector_threshold() -> f32 {
    0.3
}
fn default_min_similarity() -> f32 {
    0.3
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            storage_path: default_storage_path(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            chat_model: default_chat_model(),
            page_model: default_page_model(),
            embedding_model: default_embedding_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            history_limit: default_history_limit(),
            response_max_tokens: default_response_max_tokens(),
            response_temperature: default_response_temperature(),
            page_max_tokens: default_page_max_tokens(),
            knowledge_top_k: default_knowledge_top_k(),
            stage_delay_ms: 0,
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            confidence_growth_rate: default_confidence_growth_rate(),
            vector_threshold: default_vector_threshold(),
            classification_policy: ClassificationPolicy::Latest,
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
        }
    }
}

impl Default for GenieConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            persona: PersonaConfig::default(),
            knowledge: KnowledgeConfig::default(),
        }
    }
}

impl GenieConfig {
    /// Load configuration from defaults, the optional TOML file, and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("BEVGENIE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let builder = config::Config::builder()
            .set_default("server.bind_addr", default_bind_addr())?
            .set_default("server.storage_path", default_storage_path())?
            .set_default("llm.api_base", default_api_base())?
            .set_default("llm.request_timeout_secs", default_request_timeout_secs())?
            .set_default("pipeline.max_message_chars", default_max_message_chars() as u64)?
            .set_default("pipeline.stage_delay_ms", 0_u64)?
            .set_default("persona.classification_policy", "latest")?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("BEVGENIE").separator("__"))
            .build()?;

        let mut cfg: GenieConfig = built.try_deserialize()?;
        if cfg.llm.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
                cfg.llm.api_key = key.trim().to_string();
            }
        }
        Ok(cfg)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs.max(1))
    }

    pub fn stage_delay(&self) -> Option<Duration> {
        (self.pipeline.stage_delay_ms > 0).then(|| Duration::from_millis(self.pipeline.stage_delay_ms))
    }
}
