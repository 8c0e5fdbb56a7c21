//! Rule-based intent classification. Never calls the model and never fails.

use crate::page::PageType;
use crate::persona::PersonaScores;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const GENERAL_CONFIDENCE: f32 = 0.3;
const SUGGESTION_MIN_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ProblemInquiry,
    SalesInquiry,
    MarketingInquiry,
    FeatureInquiry,
    ProofInquiry,
    ComparisonInquiry,
    RoiInquiry,
    OnboardingInquiry,
    GeneralInquiry,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ProblemInquiry => "problem_inquiry",
            Intent::SalesInquiry => "sales_inquiry",
            Intent::MarketingInquiry => "marketing_inquiry",
            Intent::FeatureInquiry => "feature_inquiry",
            Intent::ProofInquiry => "proof_inquiry",
            Intent::ComparisonInquiry => "comparison_inquiry",
            Intent::RoiInquiry => "roi_inquiry",
            Intent::OnboardingInquiry => "onboarding_inquiry",
            Intent::GeneralInquiry => "general_inquiry",
        }
    }

    pub fn suggested_page_type(&self) -> Option<PageType> {
        match self {
            Intent::ProblemInquiry | Intent::SalesInquiry => Some(PageType::SolutionBrief),
            Intent::MarketingInquiry | Intent::FeatureInquiry => Some(PageType::FeatureShowcase),
            Intent::ProofInquiry => Some(PageType::CaseStudy),
            Intent::ComparisonInquiry => Some(PageType::Comparison),
            Intent::RoiInquiry => Some(PageType::RoiCalculator),
            Intent::OnboardingInquiry => Some(PageType::ImplementationRoadmap),
            Intent::GeneralInquiry => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentClassification {
    pub intent: Intent,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_page_type: Option<PageType>,
}

// Declaration order breaks ties.
static INTENT_KEYWORDS: Lazy<Vec<(Intent, Regex)>> = Lazy::new(|| {
    [
        (Intent::ProblemInquiry, r"(?i)\b(problems?|challenges?|struggl\w*|issues?|pain|difficult\w*|frustrat\w*|blind spots?)\b"),
        (Intent::SalesInquiry, r"(?i)\b(sales|sell\w*|reps?|accounts?|territor(?:y|ies)|pipeline|quotas?)\b"),
        (Intent::MarketingInquiry, r"(?i)\b(marketing|brand(?:ing)?|campaigns?|promotions?|awareness|audience)\b"),
        (Intent::FeatureInquiry, r"(?i)\b(features?|capabilit(?:y|ies)|functionality|what can|how does|dashboards?|integrat\w*)\b"),
        (Intent::ProofInquiry, r"(?i)\b(case stud(?:y|ies)|examples?|proof|results|customers?|success stor(?:y|ies)|testimonials?)\b"),
        (Intent::ComparisonInquiry, r"(?i)\b(compare|comparison|versus|vs\.?|alternatives?|competitors?|different from|better than)\b"),
        (Intent::RoiInquiry, r"(?i)\b(roi|return on investment|pric(?:e|es|ing)|costs?|worth it|payback|savings?)\b"),
        (Intent::OnboardingInquiry, r"(?i)\b(get(?:ting)? started|onboard\w*|implement\w*|set ?up|rollout|timeline|how long)\b"),
    ]
    .into_iter()
    .filter_map(|(intent, pattern)| match Regex::new(pattern) {
        Ok(re) => Some((intent, re)),
        Err(e) => {
            tracing::error!(target: "bevgenie::intent", intent = intent.as_str(), error = %e, "invalid intent pattern");
            None
        }
    })
    .collect()
});

/// Classify a message given the conversation length and the current persona.
pub fn classify_message_intent(
    message: &str,
    conversation_length: usize,
    persona: &PersonaScores,
) -> IntentClassification {
    let mut best: Option<(Intent, usize)> = None;
    for (intent, pattern) in INTENT_KEYWORDS.iter() {
        let hits = pattern.find_iter(message).count();
        if hits == 0 {
            continue;
        }
        best = match best {
            None => Some((*intent, hits)),
            Some((current, current_hits)) => {
                let sales_tiebreak = hits == current_hits
                    && *intent == Intent::SalesInquiry
                    && persona.sales_focus_score > 0.5;
                if hits > current_hits || sales_tiebreak {
                    Some((*intent, hits))
                } else {
                    Some((current, current_hits))
                }
            }
        };
    }

    let Some((intent, hits)) = best else {
        return IntentClassification {
            intent: Intent::GeneralInquiry,
            confidence: GENERAL_CONFIDENCE,
            suggested_page_type: None,
        };
    };

    let mut confidence = (0.5 + 0.15 * (hits as f32 - 1.0)).min(0.95);
    if conversation_length >= 4 && matches!(intent, Intent::ProofInquiry | Intent::RoiInquiry) {
        confidence = (confidence + 0.05).min(0.95);
    }

    IntentClassification {
        intent,
        confidence,
        suggested_page_type: if confidence >= SUGGESTION_MIN_CONFIDENCE {
            intent.suggested_page_type()
        } else {
            None
        },
    }
}

/// Page type used when the classifier offers no suggestion.
pub fn fallback_page_type(persona: &PersonaScores) -> PageType {
    if persona.sales_focus_score > 0.5 {
        PageType::SolutionBrief
    } else if persona.marketing_focus_score > 0.5 {
        PageType::FeatureShowcase
    } else {
        PageType::SolutionBrief
    }
}
