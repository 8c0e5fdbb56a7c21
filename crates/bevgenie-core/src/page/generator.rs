//! Page spec generation: prompt, call the model, parse, validate, retry with feedback.

use super::templates::{fallback_page_content, FallbackContent, PageTemplate};
use super::validation::parse_page_value;
use super::{BevGeniePage, PageType};
use crate::intent::fallback_page_type;
use crate::knowledge::KnowledgeDocument;
use crate::llm::{ChatTurn, LanguageModel};
use crate::persona::{describe_persona, primary_persona_label, PersonaScores};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Retries after the first attempt; at most `MAX_PAGE_RETRIES + 1` model calls.
pub const MAX_PAGE_RETRIES: u32 = 2;

const MAX_KNOWLEDGE_SNIPPETS: usize = 5;
const CONVERSATION_TURNS: usize = 3;

const SCHEMA_DESCRIPTION: &str = r#"Return a single JSON object:
{
  "type": "<page type>",
  "title": "10-120 characters",
  "description": "20-500 characters",
  "sections": [ <section>, ... ]
}
Each section has a "type" tag and these fields:
- hero: headline (10-100), subheadline? (20-150), ctaButton? {text, action}
- feature_grid: title?, subtitle?, columns? (2|3|4), features: 2-6 of {icon?, title (5-50), description (10-150)}
- testimonial: quote (20-300), author (2-50), company?, role?, metric?
- comparison_table: title?, headers (2+), rows: 3-12 of {feature (5-50), values: [string|boolean]}
- cta: title (10-100), description?, buttons: 1-3 of {text, action, primary?}
- faq: title?, items: 2-8 of {question (10-100), answer (20-500)}
- metrics: title?, metrics: 1-5 of {value (1-20), label, description?}
- steps: title?, steps: 2-10 of {number, title (5-50), description (10-200)}, timeline?
Button actions: schedule_demo, download, contact, learn_more, replicate."#;

const CONTENT_RULES: &str = "Write for the visitor described below. Ground claims in the internal knowledge when it is relevant, \
but never quote it verbatim or mention that it exists. Prefer concrete beverage-industry examples over generic claims. \
Respond with JSON only: no markdown fences, no commentary.";

/// What the visitor interacted with to trigger this page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractionContext {
    pub original_query: Option<String>,
    #[serde(alias = "context")]
    pub clicked_on: Option<String>,
}

impl InteractionContext {
    pub fn is_empty(&self) -> bool {
        self.original_query.is_none() && self.clicked_on.is_none()
    }

    /// Flattened text for lexical detectors.
    pub fn text(&self) -> String {
        [self.original_query.as_deref(), self.clicked_on.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageGenerationRequest {
    pub user_message: String,
    /// Falls back to the persona heuristic when absent.
    pub page_type: Option<PageType>,
    pub persona: Option<PersonaScores>,
    pub knowledge_context: Vec<String>,
    pub knowledge_documents: Vec<KnowledgeDocument>,
    pub conversation_history: Vec<ChatTurn>,
    pub interaction_context: Option<InteractionContext>,
    pub interaction_source: Option<String>,
    #[serde(skip)]
    pub variant: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGenerationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<BevGeniePage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Placeholder copy for the requested page type when generation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackContent>,
    pub retry_count: u32,
    /// Milliseconds from first attempt to final outcome.
    pub generation_time: u64,
}

enum AttemptFailure {
    /// Model call, extraction, or JSON syntax failed. No feedback to give.
    Failed(String),
    /// Parsed but rejected; errors are fed back on the next attempt.
    Invalid(Vec<String>),
}

struct Prompts {
    page_type: PageType,
    system: String,
    user: String,
}

pub struct PageGenerator {
    model: Arc<dyn LanguageModel>,
    max_tokens: u32,
}

impl PageGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, max_tokens: u32) -> Self {
        Self { model, max_tokens }
    }

    pub async fn generate_page_spec(&self, request: &PageGenerationRequest) -> PageGenerationResponse {
        let started = Instant::now();
        let prompts = build_prompts(request);
        tracing::debug!(
            target: "bevgenie::page",
            page_type = prompts.page_type.as_str(),
            estimated_ms = estimate_generation_time(prompts.page_type),
            "generating page"
        );

        let mut prior_errors: Vec<String> = Vec::new();
        let mut last_failure = AttemptFailure::Failed("page generation did not run".to_string());

        for attempt in 0..=MAX_PAGE_RETRIES {
            match self.attempt(&prompts, attempt, &prior_errors).await {
                Ok(page) => {
                    let page = enhance_page_with_context(page, request);
                    tracing::info!(
                        target: "bevgenie::page",
                        page_type = prompts.page_type.as_str(),
                        retry_count = attempt,
                        sections = page.sections.len(),
                        "page generated"
                    );
                    return PageGenerationResponse {
                        success: true,
                        page: Some(page),
                        error: None,
                        fallback: None,
                        retry_count: attempt,
                        generation_time: started.elapsed().as_millis() as u64,
                    };
                }
                Err(AttemptFailure::Invalid(errors)) => {
                    tracing::warn!(target: "bevgenie::page", attempt, errors = errors.len(), "page failed validation");
                    prior_errors = errors.clone();
                    last_failure = AttemptFailure::Invalid(errors);
                }
                Err(AttemptFailure::Failed(message)) => {
                    tracing::warn!(target: "bevgenie::page", attempt, error = %message, "page attempt failed");
                    last_failure = AttemptFailure::Failed(message);
                }
            }
        }

        let error = match last_failure {
            AttemptFailure::Invalid(errors) => format!(
                "Validation failed after {} retries: {}",
                MAX_PAGE_RETRIES,
                errors.join(", ")
            ),
            AttemptFailure::Failed(message) => message,
        };
        PageGenerationResponse {
            success: false,
            page: None,
            error: Some(error),
            fallback: Some(fallback_page_content(prompts.page_type)),
            retry_count: MAX_PAGE_RETRIES,
            generation_time: started.elapsed().as_millis() as u64,
        }
    }

    /// One model call. `prior_errors` are the validation errors of the
    /// previous attempt, if it produced any.
    async fn attempt(
        &self,
        prompts: &Prompts,
        attempt: u32,
        prior_errors: &[String],
    ) -> Result<BevGeniePage, AttemptFailure> {
        let mut system = prompts.system.clone();
        if attempt > 0 {
            system.push_str(&format!(
                "\n\nNote: This is retry attempt {}. Follow the schema and length limits exactly.",
                attempt
            ));
        }
        let mut user = prompts.user.clone();
        if !prior_errors.is_empty() {
            user.push_str(&format!(
                "\n\n[Previous attempt had validation issues: {}. Please regenerate with these corrections.]",
                prior_errors.join(", ")
            ));
        }

        let raw = self
            .model
            .complete_json(&system, &user, self.max_tokens)
            .await
            .map_err(|e| AttemptFailure::Failed(e.to_string()))?;
        let json = extract_json_object(&raw)
            .ok_or_else(|| AttemptFailure::Failed("No JSON object found in model response".to_string()))?;
        let value: Value = serde_json::from_str(json)
            .map_err(|e| AttemptFailure::Failed(format!("Invalid JSON in model response: {}", e)))?;

        let page = parse_page_value(&value).map_err(AttemptFailure::Invalid)?;
        if page.page_type != prompts.page_type {
            return Err(AttemptFailure::Invalid(vec![format!(
                "Expected page type {}, got {}",
                prompts.page_type.as_str(),
                page.page_type.as_str()
            )]));
        }
        Ok(page)
    }

    /// Independent requests, generated concurrently.
    pub async fn generate_pages_batch(
        &self,
        requests: &[PageGenerationRequest],
    ) -> Vec<PageGenerationResponse> {
        join_all(requests.iter().map(|r| self.generate_page_spec(r))).await
    }

    /// `count` alternative pages for the same request.
    pub async fn generate_page_variants(
        &self,
        request: &PageGenerationRequest,
        count: usize,
    ) -> Vec<PageGenerationResponse> {
        let variants: Vec<PageGenerationRequest> = (0..count)
            .map(|i| PageGenerationRequest {
                variant: Some(i),
                ..request.clone()
            })
            .collect();
        self.generate_pages_batch(&variants).await
    }
}

fn build_prompts(request: &PageGenerationRequest) -> Prompts {
    let default_persona = PersonaScores::default();
    let persona = request.persona.as_ref().unwrap_or(&default_persona);
    let page_type = request
        .page_type
        .unwrap_or_else(|| fallback_page_type(persona));
    let template = PageTemplate::for_type(page_type);

    let system = format!(
        "You are BevGenie, generating personalized landing pages for beverage industry professionals.\n\n{}\n\n{}\n\n{}",
        SCHEMA_DESCRIPTION,
        template.render(),
        CONTENT_RULES
    );

    let mut user = String::from("CONTEXT:\n");
    user.push_str(&format!("User Message: \"{}\"\n", request.user_message.trim()));
    if let Some(source) = &request.interaction_source {
        user.push_str(&format!("Interaction Type: {}\n", source));
    }
    if let Some(ctx) = &request.interaction_context {
        if let Some(q) = &ctx.original_query {
            user.push_str(&format!("Original Query: \"{}\"\n", q));
        }
        if let Some(clicked) = &ctx.clicked_on {
            user.push_str(&format!("User Clicked On: \"{}\"\n", clicked));
        }
    }

    user.push_str(&format!("\nPERSONA:\n{}\n", describe_persona(persona)));

    if !request.knowledge_documents.is_empty() || !request.knowledge_context.is_empty() {
        user.push_str("\nINTERNAL KNOWLEDGE (never expose to the visitor):\n");
        for doc in request.knowledge_documents.iter().take(MAX_KNOWLEDGE_SNIPPETS) {
            user.push_str(&format!(
                "- [{}] ({:.0}% relevant) {}\n",
                doc.source_type.as_deref().unwrap_or("document"),
                doc.similarity_score * 100.0,
                doc.content.trim()
            ));
        }
        for snippet in request.knowledge_context.iter().take(MAX_KNOWLEDGE_SNIPPETS) {
            user.push_str(&format!("- {}\n", snippet.trim()));
        }
    }

    let history = &request.conversation_history;
    if history.len() > 2 {
        user.push_str("\nRECENT CONVERSATION:\n");
        for turn in &history[history.len() - CONVERSATION_TURNS..] {
            user.push_str(&format!("{}: {}\n", turn.role.as_str(), turn.content.trim()));
        }
    }

    user.push_str(&format!(
        "\nTASK:\nGenerate a {} page that answers the user message for this persona. Use exactly the section order of the template.\n",
        page_type.as_str()
    ));
    user.push_str(
        "\nCONTENT REQUIREMENTS:\n\
         - Headlines are specific to the visitor's situation, not generic slogans.\n\
         - Every feature ties to a measurable outcome.\n\
         - Testimonials and metrics are plausible for a company like the visitor's.\n\
         - Calls to action match the visitor's stage in the conversation.\n",
    );
    if let Some(i) = request.variant {
        user.push_str(&format!(
            "\nVariant {}: take a distinct angle from other variants of this page.\n",
            i + 1
        ));
    }

    Prompts {
        page_type,
        system,
        user,
    }
}

/// The first `{` through the last `}` of `text`, tolerating prose and fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Stamp request context onto a validated page. Only metadata changes.
pub fn enhance_page_with_context(
    mut page: BevGeniePage,
    request: &PageGenerationRequest,
) -> BevGeniePage {
    let label = request
        .persona
        .as_ref()
        .map(primary_persona_label)
        .unwrap_or_else(|| "general".to_string());
    page.metadata.insert("persona".to_string(), Value::String(label));
    if let Some(source) = &request.interaction_source {
        page.metadata
            .insert("interactionSource".to_string(), Value::String(source.clone()));
    }
    page
}

/// Cache key `page_{type}_{hash}_{persona}` over the first 100 message chars.
pub fn page_cache_key(message: &str, page_type: PageType, persona_key: Option<&str>) -> String {
    let mut hash: i32 = 0;
    for c in message.chars().take(100) {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(c as i32);
    }
    format!(
        "page_{}_{}_{}",
        page_type.as_str(),
        to_base36(hash.unsigned_abs()),
        persona_key.unwrap_or("default")
    )
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Typical generation latency per page type, in milliseconds.
pub fn estimate_generation_time(page_type: PageType) -> u64 {
    match page_type {
        PageType::SolutionBrief => 3000,
        PageType::FeatureShowcase => 4000,
        PageType::CaseStudy => 5000,
        PageType::Comparison => 4500,
        PageType::ImplementationRoadmap => 4000,
        PageType::RoiCalculator => 3500,
    }
}
