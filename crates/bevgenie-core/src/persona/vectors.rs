//! Detection vectors: four independent classification histories per session.

use super::{PersonaScores, VectorEntry};
use crate::config::ClassificationPolicy;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const MESSAGE_HIT_WEIGHT: f32 = 0.35;
const CONTEXT_HIT_WEIGHT: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorAxis {
    FunctionalRole,
    OrgType,
    OrgSize,
    ProductFocus,
}

impl VectorAxis {
    fn history<'a>(&self, persona: &'a PersonaScores) -> &'a [VectorEntry] {
        let v = &persona.detection_vectors;
        match self {
            VectorAxis::FunctionalRole => &v.functional_role,
            VectorAxis::OrgType => &v.org_type,
            VectorAxis::OrgSize => &v.org_size,
            VectorAxis::ProductFocus => &v.product_focus,
        }
    }

    fn history_mut<'a>(&self, persona: &'a mut PersonaScores) -> &'a mut Vec<VectorEntry> {
        let v = &mut persona.detection_vectors;
        match self {
            VectorAxis::FunctionalRole => &mut v.functional_role,
            VectorAxis::OrgType => &mut v.org_type,
            VectorAxis::OrgSize => &mut v.org_size,
            VectorAxis::ProductFocus => &mut v.product_focus,
        }
    }

    /// Current classification of this axis under `policy`.
    pub fn classify<'a>(
        &self,
        persona: &'a PersonaScores,
        policy: ClassificationPolicy,
    ) -> Option<&'a VectorEntry> {
        let history = self.history(persona);
        match policy {
            ClassificationPolicy::Latest => history.last(),
            ClassificationPolicy::HighestConfidence => {
                history.iter().fold(None, |best: Option<&VectorEntry>, entry| match best {
                    Some(b) if b.confidence >= entry.confidence => Some(b),
                    _ => Some(entry),
                })
            }
        }
    }
}

struct AxisValue {
    value: &'static str,
    pattern: Regex,
}

static AXIS_VALUES: Lazy<Vec<(VectorAxis, Vec<AxisValue>)>> = Lazy::new(|| {
    let table: [(VectorAxis, &[(&str, &str)]); 4] = [
        (
            VectorAxis::FunctionalRole,
            &[
                ("sales", r"(?i)\b(sales|reps?|account managers?|territor(?:y|ies))\b"),
                ("marketing", r"(?i)\b(marketing|brand managers?|campaigns?)\b"),
                ("executive", r"(?i)\b(ceo|founder|owner|executive|vp|president|leadership)\b"),
                ("operations", r"(?i)\b(operations|logistics|supply chain|warehouse)\b"),
                ("finance", r"(?i)\b(finance|cfo|budgets?|margins?|roi)\b"),
            ],
        ),
        (
            VectorAxis::OrgType,
            &[
                ("supplier", r"(?i)\b(suppliers?|brewery|winery|distillery|producers?|brand owners?)\b"),
                ("distributor", r"(?i)\b(distributors?|wholesalers?|distribution)\b"),
                ("retailer", r"(?i)\b(retailers?|liquor stores?|bottle shops?|bars?|restaurants?|on-premise|grocery)\b"),
                ("manufacturer", r"(?i)\b(manufacturers?|bottlers?|co-packers?|canning)\b"),
            ],
        ),
        (
            VectorAxis::OrgSize,
            &[
                ("craft", r"(?i)\b(craft|small|independent|microbrewery|startup)\b"),
                ("mid_sized", r"(?i)\b(mid[- ]?sized?|regional|growing)\b"),
                ("large", r"(?i)\b(enterprise|national|global|multinational|large)\b"),
            ],
        ),
        (
            VectorAxis::ProductFocus,
            &[
                ("beer", r"(?i)\b(beers?|brewery|brewing|ipas?|lagers?|ales?|seltzers?)\b"),
                ("wine", r"(?i)\b(wines?|winery|vineyards?)\b"),
                ("spirits", r"(?i)\b(spirits|whiske?y|vodka|gin|rum|tequila|bourbon|distillery)\b"),
                ("non_alcoholic", r"(?i)\b(non[- ]alcoholic|kombucha|sodas?|energy drinks?|functional beverages?)\b"),
            ],
        ),
    ];

    table
        .iter()
        .map(|(axis, values)| {
            let compiled = values
                .iter()
                .filter_map(|&(value, pattern)| match Regex::new(pattern) {
                    Ok(pattern) => Some(AxisValue { value, pattern }),
                    Err(e) => {
                        tracing::error!(target: "bevgenie::persona", value, error = %e, "invalid vector pattern");
                        None
                    }
                })
                .collect();
            (*axis, compiled)
        })
        .collect()
});

/// Evaluate `message` (and optional interaction-context text) against every axis and
/// append a history entry wherever the strongest value reaches `threshold`.
pub fn detect_and_update_vectors(
    persona: &PersonaScores,
    message: &str,
    interaction_context: Option<&str>,
    threshold: f32,
) -> PersonaScores {
    let mut next = persona.clone();
    let now = Utc::now();

    for (axis, values) in AXIS_VALUES.iter() {
        let mut best: Option<(&'static str, f32)> = None;
        for candidate in values {
            let message_hits = candidate.pattern.find_iter(message).count() as f32;
            let context_hits = interaction_context
                .map(|c| candidate.pattern.find_iter(c).count() as f32)
                .unwrap_or(0.0);
            let confidence =
                (message_hits * MESSAGE_HIT_WEIGHT + context_hits * CONTEXT_HIT_WEIGHT).min(1.0);
            if confidence > best.map(|(_, c)| c).unwrap_or(0.0) {
                best = Some((candidate.value, confidence));
            }
        }
        if let Some((value, confidence)) = best {
            if confidence >= threshold {
                axis.history_mut(&mut next).push(VectorEntry {
                    value: value.to_string(),
                    confidence,
                    timestamp: now,
                });
            }
        }
    }
    next
}

/// Payload of the `persona_vectors` stream event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaVectorsSnapshot {
    pub functional_role: Option<String>,
    pub org_type: Option<String>,
    pub org_size: Option<String>,
    pub product_focus: Option<String>,
    pub all_identified: bool,
}

impl PersonaVectorsSnapshot {
    pub fn from_persona(persona: &PersonaScores, policy: ClassificationPolicy) -> Self {
        let value = |axis: VectorAxis| axis.classify(persona, policy).map(|e| e.value.clone());
        let functional_role = value(VectorAxis::FunctionalRole);
        let org_type = value(VectorAxis::OrgType);
        let org_size = value(VectorAxis::OrgSize);
        let product_focus = value(VectorAxis::ProductFocus);
        let all_identified = functional_role.is_some()
            && org_type.is_some()
            && org_size.is_some()
            && product_focus.is_some();
        Self {
            functional_role,
            org_type,
            org_size,
            product_focus,
            all_identified,
        }
    }
}
