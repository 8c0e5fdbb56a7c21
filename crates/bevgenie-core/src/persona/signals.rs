//! Lexical signal extraction: message text in, typed persona evidence out.

use super::{PainPoint, PersonaScores, PersonaTrait};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Floor for damped trait strengths; signals are always in (0, 1].
const MIN_TRAIT_STRENGTH: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "category", rename_all = "snake_case")]
pub enum SignalKind {
    PersonaTrait(PersonaTrait),
    PainPoint(PainPoint),
}

impl SignalKind {
    pub fn type_str(&self) -> &'static str {
        match self {
            SignalKind::PersonaTrait(_) => "persona_trait",
            SignalKind::PainPoint(_) => "pain_point",
        }
    }

    pub fn category_str(&self) -> &'static str {
        match self {
            SignalKind::PersonaTrait(t) => t.as_str(),
            SignalKind::PainPoint(p) => p.as_str(),
        }
    }
}

/// One piece of lexical evidence from a single message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(flatten)]
    pub kind: SignalKind,
    pub strength: f32,
    pub evidence: String,
}

impl Signal {
    /// `type/category: strength`, as reported to the client.
    pub fn describe(&self) -> String {
        format!(
            "{}/{}: {:.2}",
            self.kind.type_str(),
            self.kind.category_str(),
            self.strength
        )
    }
}

struct SignalRule {
    kind: SignalKind,
    pattern: Regex,
    base_strength: f32,
}

fn rule(kind: SignalKind, pattern: &str, base_strength: f32) -> Option<SignalRule> {
    match Regex::new(pattern) {
        Ok(pattern) => Some(SignalRule {
            kind,
            pattern,
            base_strength,
        }),
        Err(e) => {
            tracing::error!(target: "bevgenie::signals", category = kind.category_str(), error = %e, "invalid signal pattern");
            None
        }
    }
}

static SIGNAL_RULES: Lazy<Vec<SignalRule>> = Lazy::new(|| {
    use PainPoint as P;
    use PersonaTrait as T;
    use SignalKind::{PainPoint as Pain, PersonaTrait as Trait};
    [
        rule(Trait(T::Supplier), r"(?i)\b(suppliers?|brewery|breweries|winery|wineries|distillery|producers?|brand owners?|we (?:brew|make|produce))\b", 0.3),
        rule(Trait(T::Distributor), r"(?i)\b(distributors?|distribution|wholesalers?|wholesale|warehouses?)\b", 0.3),
        rule(Trait(T::Craft), r"(?i)\b(craft|small[- ]batch|independent|microbrewery)\b", 0.25),
        rule(Trait(T::MidSized), r"(?i)\b(mid[- ]?sized?|regional|growing (?:brand|company)|[1-9]\d (?:reps|employees))\b", 0.25),
        rule(Trait(T::Large), r"(?i)\b(enterprise|national|global|multinational|large (?:company|brand|portfolio))\b", 0.25),
        rule(Trait(T::Sales), r"(?i)\b(sales|selling|sell|reps?|accounts?|territor(?:y|ies)|pipeline|quota)\b", 0.3),
        rule(Trait(T::Marketing), r"(?i)\b(marketing|brand awareness|campaigns?|promotions?|advertising|social media)\b", 0.3),
        rule(Trait(T::Operations), r"(?i)\b(operations|logistics|supply chain|inventory|production|efficiency)\b", 0.3),
        rule(Trait(T::Compliance), r"(?i)\b(compliance|regulations?|regulatory|ttb|licens(?:e|es|ing)|three[- ]tier)\b", 0.3),
        rule(Pain(P::ExecutionBlindSpot), r"(?i)\b(blind spots?|visibility (?:at|into) (?:retail|stores?)|(?:don'?t|do not) know what(?:'s| is) happening|shelf (?:placement|presence)|out[- ]of[- ]stocks?)\b", 0.4),
        rule(Pain(P::MarketAssessment), r"(?i)\b(which markets?|new markets?|expand(?:ing|sion)?|market (?:share|opportunit(?:y|ies)|research))\b", 0.35),
        rule(Pain(P::SalesEffectiveness), r"(?i)\b(close more|win(?:ning)? more accounts|rep productivity|sales (?:performance|effectiveness)|(?:miss|missing|hit|hitting) (?:our )?(?:targets|quotas?))\b", 0.4),
        rule(Pain(P::RegulatoryCompliance), r"(?i)\b(compliance (?:issues?|headaches?|risk)|label approvals?|state regulations?|excise tax(?:es)?)\b", 0.4),
        rule(Pain(P::OperationalEfficiency), r"(?i)\b(manual (?:work|process(?:es)?|reporting)|spreadsheets?|wasting time|too much time|inefficien(?:t|cy|cies))\b", 0.35),
        rule(Pain(P::InventoryVisibility), r"(?i)\b(depletions?|inventory levels?|stock levels?|overstock(?:ed)?|forecast(?:s|ing)?)\b", 0.35),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Scan `message` for persona evidence. Pure; at most one signal per rule.
///
/// Trait strengths shrink as the current score grows
/// (`base * (1 - 0.5 * score)`), so repeated mentions add diminishing weight.
pub fn detect_signals(message: &str, current: &PersonaScores) -> Vec<Signal> {
    if message.trim().is_empty() {
        return Vec::new();
    }
    SIGNAL_RULES
        .iter()
        .filter_map(|rule| {
            let found = rule.pattern.find(message)?;
            let strength = match rule.kind {
                SignalKind::PersonaTrait(t) => {
                    (rule.base_strength * (1.0 - 0.5 * current.score(t))).max(MIN_TRAIT_STRENGTH)
                }
                SignalKind::PainPoint(_) => rule.base_strength,
            };
            Some(Signal {
                kind: rule.kind,
                strength: strength.clamp(MIN_TRAIT_STRENGTH, 1.0),
                evidence: found.as_str().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_question_yields_sales_trait() {
        let signals = detect_signals("How can you help our sales team?", &PersonaScores::default());
        let sales = signals
            .iter()
            .find(|s| s.kind == SignalKind::PersonaTrait(PersonaTrait::Sales))
            .expect("sales signal");
        assert_eq!(sales.evidence, "sales");
        assert!((sales.strength - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn one_message_can_hit_trait_and_pain_point() {
        let signals = detect_signals(
            "We are a craft brewery with blind spots at retail",
            &PersonaScores::default(),
        );
        let kinds: Vec<SignalKind> = signals.iter().map(|s| s.kind).collect();
        assert!(kinds.contains(&SignalKind::PersonaTrait(PersonaTrait::Craft)));
        assert!(kinds.contains(&SignalKind::PersonaTrait(PersonaTrait::Supplier)));
        assert!(kinds.contains(&SignalKind::PainPoint(PainPoint::ExecutionBlindSpot)));
    }

    #[test]
    fn unmatched_and_empty_text_yield_nothing() {
        assert!(detect_signals("", &PersonaScores::default()).is_empty());
        assert!(detect_signals("hello there!!! ???", &PersonaScores::default()).is_empty());
        assert!(detect_signals("\u{0}\u{fffd} 🍺", &PersonaScores::default()).is_empty());
    }

    #[test]
    fn saturated_trait_is_damped_but_positive() {
        let persona = PersonaScores {
            sales_focus_score: 1.0,
            ..Default::default()
        };
        let signals = detect_signals("sales", &persona);
        assert_eq!(signals.len(), 1);
        assert!((signals[0].strength - 0.15).abs() < 1e-6);
    }

    #[test]
    fn description_format() {
        let signal = Signal {
            kind: SignalKind::PainPoint(PainPoint::InventoryVisibility),
            strength: 0.35,
            evidence: "depletions".into(),
        };
        assert_eq!(signal.describe(), "pain_point/inventory_visibility: 0.35");
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["type"], "pain_point");
        assert_eq!(json["category"], "inventory_visibility");
    }
}
