//! Knowledge retrieval contract and the sled-backed document store.

mod embeddings;
mod store;

pub use embeddings::{cosine_similarity, is_valid_embedding};
pub use store::{NewDocument, SledKnowledgeBase};

use crate::error::Result;
use crate::persona::PersonaScores;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A ranked knowledge snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// In [0, 1].
    #[serde(default)]
    pub similarity_score: f32,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeFilters {
    /// Only documents of this source type.
    #[serde(default)]
    pub source_type: Option<String>,
    /// Documents must carry at least one of these tags (when non-empty).
    #[serde(default)]
    pub tags: Vec<String>,
}

#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn get_knowledge_documents(
        &self,
        message: &str,
        filters: Option<&KnowledgeFilters>,
        top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>>;

    /// Prompt-ready context, one snippet per line; `None` when nothing is relevant.
    async fn get_context_for_llm(
        &self,
        message: &str,
        persona: &PersonaScores,
        top_k: usize,
    ) -> Result<Option<String>> {
        let _ = persona;
        let documents = self.get_knowledge_documents(message, None, top_k).await?;
        Ok(format_context(&documents))
    }
}

pub(crate) fn format_context(documents: &[KnowledgeDocument]) -> Option<String> {
    let lines: Vec<String> = documents
        .iter()
        .map(|d| d.content.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
