//! Four-slide session summary built from a [`PresentationData`].

use crate::config::ClassificationPolicy;
use crate::error::{GenieError, Result};
use crate::llm::LanguageModel;
use crate::persona::{PersonaScores, VectorAxis};
use crate::session::PresentationData;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;

const PRESENTATION_MAX_TOKENS: u32 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideContentKind {
    Bullets,
    Comparison,
    Quote,
    Stats,
    Timeline,
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideContent {
    #[serde(rename = "type")]
    pub kind: SlideContentKind,
    #[serde(default)]
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub slide_number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub content: SlideContent,
    #[serde(default)]
    pub visual_description: String,
    #[serde(default)]
    pub speaker_notes: String,
}

fn latest(persona: &PersonaScores, axis: VectorAxis) -> Option<&str> {
    axis.classify(persona, ClassificationPolicy::Latest)
        .map(|e| e.value.as_str())
}

pub fn role_label(persona: &PersonaScores) -> &'static str {
    match latest(persona, VectorAxis::FunctionalRole) {
        Some("sales") => "Sales Director",
        Some("marketing") => "Marketing Leader",
        Some("executive") => "Executive",
        Some("operations") => "Operations Manager",
        Some("finance") => "Finance Director",
        _ => "Business Leader",
    }
}

pub fn org_type_label(persona: &PersonaScores) -> &'static str {
    match latest(persona, VectorAxis::OrgType) {
        Some("supplier") => "Supplier",
        Some("distributor") => "Distributor",
        Some("retailer") => "Retailer",
        Some("manufacturer") => "Manufacturer",
        _ => "Organization",
    }
}

pub fn org_size_label(persona: &PersonaScores) -> &'static str {
    match latest(persona, VectorAxis::OrgSize) {
        Some("craft") => "Craft/Small",
        Some("large") => "Large Enterprise",
        _ => "Mid-sized",
    }
}

/// First `[` through last `]`.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

pub struct PresentationGenerator {
    model: Arc<dyn LanguageModel>,
}

impl PresentationGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn generate(&self, data: &PresentationData) -> Result<Vec<Slide>> {
        if data.actual_questions.is_empty() {
            return Err(GenieError::InvalidInput(
                "No session data available. Please interact with BevGenie first.".to_string(),
            ));
        }
        tracing::info!(
            target: "bevgenie::presentation",
            session_id = %data.session_id,
            queries = data.actual_questions.len(),
            duration = %data.duration,
            "generating presentation"
        );

        let raw = self
            .model
            .complete_json(
                "You write concise, personal slide decks. Respond with JSON only.",
                &build_prompt(data),
                PRESENTATION_MAX_TOKENS,
            )
            .await?;
        let json = extract_json_array(&raw)
            .ok_or_else(|| GenieError::Presentation("No JSON found in response".to_string()))?;
        let slides: Vec<Slide> = serde_json::from_str(json)
            .map_err(|e| GenieError::Presentation(format!("Malformed slides: {}", e)))?;
        if slides.is_empty() {
            return Err(GenieError::Presentation("Model returned no slides".to_string()));
        }
        Ok(slides)
    }
}

fn build_prompt(data: &PresentationData) -> String {
    let role = role_label(&data.persona);
    let org_type = org_type_label(&data.persona);
    let org_size = org_size_label(&data.persona);
    let product_focus =
        latest(&data.persona, VectorAxis::ProductFocus).unwrap_or("Beverage Industry");
    let top_category = data.top_category.as_str();

    let mut p = String::new();
    let _ = writeln!(p, "Generate a concise 4-slide presentation based on this user's actual session with BevGenie.\n");
    let _ = writeln!(p, "PERSONA:\n- Role: {}\n- Organization: {} ({})\n- Product Focus: {}\n", role, org_type, org_size, product_focus);
    let _ = writeln!(
        p,
        "SESSION SUMMARY:\n- Duration: {}\n- Questions Asked: {}\n- Problems Solved: {}\n",
        data.duration,
        data.queries_asked,
        data.problem_solutions.len()
    );
    let _ = writeln!(p, "ACTUAL QUESTIONS ASKED (use these verbatim):");
    for (i, q) in data.actual_questions.iter().enumerate() {
        let _ = writeln!(p, "{}. \"{}\"", i + 1, q);
    }
    let _ = writeln!(p, "\nPROBLEMS & SOLUTIONS:");
    for (i, ps) in data.problem_solutions.iter().enumerate() {
        let _ = writeln!(
            p,
            "Problem {}: {}\nUser Asked: \"{}\"\nSolution: {}\nFeature: {}\nBefore: {}\nAfter: {}\nTime Saved: {} minutes\n",
            i + 1,
            ps.problem_statement,
            ps.user_question,
            ps.bev_genie_solution,
            ps.feature_used,
            ps.before_state,
            ps.after_state,
            ps.time_saved
        );
    }
    let _ = writeln!(p, "CATEGORY BREAKDOWN:");
    for (cat, count) in &data.category_breakdown {
        let _ = writeln!(p, "- {}: {} queries", cat, count);
    }
    let _ = writeln!(
        p,
        "\nROI:\n- Total Time Saved: {} minutes ({} hours)\n- Cost Savings: ${}\n- Efficiency Gain: {}%\n",
        data.roi.total_minutes_saved, data.roi.hours_saved, data.roi.cost_saved, data.roi.efficiency_gain
    );
    let _ = writeln!(
        p,
        "CREATE EXACTLY 4 SLIDES:\n\
1. \"About You\" (bullets): role, organization, product focus, primary interest ({}), session duration.\n\
2. \"What is BevGenie?\" (bullets): what the platform does and the features most relevant to a {}.\n\
3. \"How BevGenie Solves Your Challenges\" (bullets): one \"✓\" bullet per actual question, quoted, with before/after and minutes saved.\n\
4. \"Your Results & ROI\" (stats): questions answered, hours saved, cost savings, efficiency gain, projected monthly savings.\n",
        top_category, role
    );
    let _ = writeln!(
        p,
        "Keep every slide to at most 7 short bullets and address the reader as \"you\".\n\
Return ONLY a JSON array of objects with keys slideNumber, title, subtitle (optional), \
content {{type: bullets|comparison|quote|stats|timeline|grid, data: [...]}}, visualDescription, speakerNotes."
    );
    p
}
