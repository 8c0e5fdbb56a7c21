//! Conversational reply synthesis.

use crate::error::LlmError;
use crate::llm::{ChatTurn, CompletionRequest, LanguageModel};
use crate::persona::{describe_persona, PainPoint, PersonaScores};
use std::sync::Arc;

/// Shown to the visitor when the model call fails.
pub const FALLBACK_REPLY: &str =
    "I apologize, but I'm having trouble processing your message. Could you try again?";

const BASE_SYSTEM_PROMPT: &str = "You are BevGenie, an AI assistant for beverage industry professionals: \
suppliers, distributors and their sales, marketing and operations teams. \
Answer in two to four short paragraphs, speak to the visitor's situation, and suggest a concrete next step. \
Do not invent customer names or statistics.";

fn pain_point_prompt(pain: PainPoint) -> &'static str {
    match pain {
        PainPoint::ExecutionBlindSpot => "The visitor struggles to see what happens at retail after the sale. Emphasize store-level visibility and early alerts on lost placements.",
        PainPoint::MarketAssessment => "The visitor is weighing which markets to enter or grow. Emphasize market-level data and opportunity sizing.",
        PainPoint::SalesEffectiveness => "The visitor wants their sales team to win more. Emphasize rep prioritization and account-level insight.",
        PainPoint::RegulatoryCompliance => "The visitor is concerned about compliance. Emphasize accuracy, audit trails and state-by-state rules.",
        PainPoint::OperationalEfficiency => "The visitor loses time to manual work. Emphasize automation and time saved.",
        PainPoint::InventoryVisibility => "The visitor lacks visibility into depletions and stock. Emphasize forecasting and inventory signals.",
    }
}

/// System prompt for a persona, with optional background knowledge.
pub fn build_system_prompt(persona: &PersonaScores, knowledge: Option<&str>) -> String {
    let mut prompt = format!("{}\n\n## Visitor:\n{}", BASE_SYSTEM_PROMPT, describe_persona(persona));
    if let Some(knowledge) = knowledge.filter(|k| !k.trim().is_empty()) {
        prompt.push_str(&format!("\n\n## Background Context:\n{}", knowledge));
    }
    if let Some(pain) = persona.top_pain_point() {
        prompt.push_str(&format!("\n\n## Focus:\n{}", pain_point_prompt(pain)));
    }
    prompt
}

pub struct ResponseSynthesizer {
    model: Arc<dyn LanguageModel>,
    max_tokens: u32,
    temperature: f32,
}

impl ResponseSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            model,
            max_tokens,
            temperature,
        }
    }

    pub async fn synthesize(
        &self,
        persona: &PersonaScores,
        knowledge: Option<&str>,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, LlmError> {
        let mut messages = history.to_vec();
        messages.push(ChatTurn::user(message));
        let reply = self
            .model
            .complete(CompletionRequest {
                system: build_system_prompt(persona, knowledge),
                messages,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            })
            .await?;
        Ok(reply.trim().to_string())
    }

    /// Never fails: model errors become [`FALLBACK_REPLY`].
    pub async fn synthesize_or_fallback(
        &self,
        persona: &PersonaScores,
        knowledge: Option<&str>,
        history: &[ChatTurn],
        message: &str,
    ) -> String {
        match self.synthesize(persona, knowledge, history, message).await {
            Ok(reply) if !reply.is_empty() => reply,
            Ok(_) => {
                tracing::warn!(target: "bevgenie::response", "empty reply, using fallback");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!(target: "bevgenie::response", error = %e, "response synthesis failed, using fallback");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_block_only_when_present() {
        let persona = PersonaScores::default();
        assert!(!build_system_prompt(&persona, None).contains("Background Context"));
        assert!(!build_system_prompt(&persona, Some("  ")).contains("Background Context"));
        let prompt = build_system_prompt(&persona, Some("Depletion data updates weekly."));
        assert!(prompt.contains("## Background Context:\nDepletion data updates weekly."));
    }

    #[test]
    fn top_pain_point_adds_focus() {
        let persona = PersonaScores {
            pain_points_detected: vec![PainPoint::InventoryVisibility, PainPoint::MarketAssessment],
            ..Default::default()
        };
        let prompt = build_system_prompt(&persona, None);
        assert!(prompt.contains("depletions and stock"));
        assert!(!prompt.contains("which markets"));
    }
}
