use super::{cosine_similarity, format_context, is_valid_embedding, KnowledgeDocument, KnowledgeFilters, KnowledgeRetriever};
use crate::error::{GenieError, Result};
use crate::llm::Embedder;
use crate::persona::PersonaScores;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const KNOWLEDGE_TREE: &str = "knowledge";
/// Similarity bonus per persona tag shared with a document.
const TAG_BOOST: f32 = 0.05;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    id: String,
    content: String,
    source_type: Option<String>,
    tags: Vec<String>,
    embedding: Vec<f32>,
    created_at: DateTime<Utc>,
}

/// Ingestion payload for [`SledKnowledgeBase::add_document`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub content: String,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Embedded knowledge documents in a sled tree, ranked by cosine similarity.
pub struct SledKnowledgeBase {
    tree: sled::Tree,
    embedder: Arc<dyn Embedder>,
    min_similarity: f32,
}

impl SledKnowledgeBase {
    pub fn new(db: &sled::Db, embedder: Arc<dyn Embedder>, min_similarity: f32) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(KNOWLEDGE_TREE)?,
            embedder,
            min_similarity,
        })
    }

    /// Embed and store a document; returns its id.
    pub async fn add_document(&self, doc: NewDocument) -> Result<String> {
        if doc.content.trim().is_empty() {
            return Err(GenieError::InvalidInput("document content is empty".to_string()));
        }
        let embedding = self.embedder.embed(&doc.content).await?;
        if !is_valid_embedding(&embedding) {
            return Err(GenieError::Knowledge("embedder returned an invalid vector".to_string()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let stored = StoredDocument {
            id: id.clone(),
            content: doc.content,
            source_type: doc.source_type,
            tags: doc.tags,
            embedding,
            created_at: Utc::now(),
        };
        self.tree.insert(id.as_bytes(), serde_json::to_vec(&stored)?)?;
        tracing::info!(target: "bevgenie::knowledge", id = %id, "document stored");
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    async fn search(
        &self,
        message: &str,
        filters: Option<&KnowledgeFilters>,
        boost_tags: &[String],
        top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>> {
        if top_k == 0 || self.tree.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed(message).await?;

        let mut ranked = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            let doc: StoredDocument = match serde_json::from_slice(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(target: "bevgenie::knowledge", error = %e, "skipping unreadable document");
                    continue;
                }
            };
            if let Some(f) = filters {
                if f.source_type.is_some() && f.source_type != doc.source_type {
                    continue;
                }
                if !f.tags.is_empty() && !doc.tags.iter().any(|t| f.tags.contains(t)) {
                    continue;
                }
            }
            let shared = doc.tags.iter().filter(|t| boost_tags.contains(t)).count() as f32;
            let score = (cosine_similarity(&query, &doc.embedding).max(0.0) + shared * TAG_BOOST)
                .clamp(0.0, 1.0);
            if score < self.min_similarity {
                continue;
            }
            ranked.push(KnowledgeDocument {
                id: doc.id,
                content: doc.content,
                source_type: doc.source_type,
                similarity_score: score,
                tags: doc.tags,
            });
        }

        ranked.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        ranked.truncate(top_k);
        tracing::debug!(target: "bevgenie::knowledge", hits = ranked.len(), "knowledge search");
        Ok(ranked)
    }
}

#[async_trait]
impl KnowledgeRetriever for SledKnowledgeBase {
    async fn get_knowledge_documents(
        &self,
        message: &str,
        filters: Option<&KnowledgeFilters>,
        top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>> {
        self.search(message, filters, &[], top_k).await
    }

    async fn get_context_for_llm(
        &self,
        message: &str,
        persona: &PersonaScores,
        top_k: usize,
    ) -> Result<Option<String>> {
        let documents = self
            .search(message, None, &persona.retrieval_tags(), top_k)
            .await?;
        Ok(format_context(&documents))
    }
}
