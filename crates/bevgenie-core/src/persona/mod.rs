//! Session persona: continuous trait scores, pain points, and detection-vector histories.

mod accumulator;
mod signals;
mod vectors;

pub use accumulator::update_persona_with_signals;
pub use signals::{detect_signals, Signal, SignalKind};
pub use vectors::{detect_and_update_vectors, PersonaVectorsSnapshot, VectorAxis};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A score axis of [`PersonaScores`]. Org-type axes first, then focus axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaTrait {
    Supplier,
    Distributor,
    Craft,
    MidSized,
    Large,
    Sales,
    Marketing,
    Operations,
    Compliance,
}

impl PersonaTrait {
    pub const ALL: [PersonaTrait; 9] = [
        PersonaTrait::Supplier,
        PersonaTrait::Distributor,
        PersonaTrait::Craft,
        PersonaTrait::MidSized,
        PersonaTrait::Large,
        PersonaTrait::Sales,
        PersonaTrait::Marketing,
        PersonaTrait::Operations,
        PersonaTrait::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaTrait::Supplier => "supplier",
            PersonaTrait::Distributor => "distributor",
            PersonaTrait::Craft => "craft",
            PersonaTrait::MidSized => "mid_sized",
            PersonaTrait::Large => "large",
            PersonaTrait::Sales => "sales",
            PersonaTrait::Marketing => "marketing",
            PersonaTrait::Operations => "operations",
            PersonaTrait::Compliance => "compliance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PainPoint {
    ExecutionBlindSpot,
    MarketAssessment,
    SalesEffectiveness,
    RegulatoryCompliance,
    OperationalEfficiency,
    InventoryVisibility,
}

impl PainPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            PainPoint::ExecutionBlindSpot => "execution_blind_spot",
            PainPoint::MarketAssessment => "market_assessment",
            PainPoint::SalesEffectiveness => "sales_effectiveness",
            PainPoint::RegulatoryCompliance => "regulatory_compliance",
            PainPoint::OperationalEfficiency => "operational_efficiency",
            PainPoint::InventoryVisibility => "inventory_visibility",
        }
    }

    /// Human phrasing used in persona descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            PainPoint::ExecutionBlindSpot => "execution blind spots at retail",
            PainPoint::MarketAssessment => "assessing market opportunities",
            PainPoint::SalesEffectiveness => "sales team effectiveness",
            PainPoint::RegulatoryCompliance => "regulatory compliance",
            PainPoint::OperationalEfficiency => "operational efficiency",
            PainPoint::InventoryVisibility => "inventory visibility",
        }
    }
}

/// One observation appended to a detection-vector history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub value: String,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionVectors {
    #[serde(default)]
    pub functional_role: Vec<VectorEntry>,
    #[serde(default)]
    pub org_type: Vec<VectorEntry>,
    #[serde(default)]
    pub org_size: Vec<VectorEntry>,
    #[serde(default)]
    pub product_focus: Vec<VectorEntry>,
}

/// Durable, session-scoped persona profile. Every score stays within [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaScores {
    pub supplier_score: f32,
    pub distributor_score: f32,
    pub craft_score: f32,
    pub mid_sized_score: f32,
    pub large_score: f32,
    pub sales_focus_score: f32,
    pub marketing_focus_score: f32,
    pub operations_focus_score: f32,
    pub compliance_focus_score: f32,
    /// Detection order, unique.
    pub pain_points_detected: Vec<PainPoint>,
    pub pain_points_confidence: BTreeMap<PainPoint, f32>,
    pub overall_confidence: f32,
    /// Accumulated strength of every applied signal.
    pub signal_mass: f32,
    pub total_interactions: u32,
    pub detection_vectors: DetectionVectors,
}

impl PersonaScores {
    pub fn score(&self, trait_: PersonaTrait) -> f32 {
        match trait_ {
            PersonaTrait::Supplier => self.supplier_score,
            PersonaTrait::Distributor => self.distributor_score,
            PersonaTrait::Craft => self.craft_score,
            PersonaTrait::MidSized => self.mid_sized_score,
            PersonaTrait::Large => self.large_score,
            PersonaTrait::Sales => self.sales_focus_score,
            PersonaTrait::Marketing => self.marketing_focus_score,
            PersonaTrait::Operations => self.operations_focus_score,
            PersonaTrait::Compliance => self.compliance_focus_score,
        }
    }

    pub(crate) fn score_mut(&mut self, trait_: PersonaTrait) -> &mut f32 {
        match trait_ {
            PersonaTrait::Supplier => &mut self.supplier_score,
            PersonaTrait::Distributor => &mut self.distributor_score,
            PersonaTrait::Craft => &mut self.craft_score,
            PersonaTrait::MidSized => &mut self.mid_sized_score,
            PersonaTrait::Large => &mut self.large_score,
            PersonaTrait::Sales => &mut self.sales_focus_score,
            PersonaTrait::Marketing => &mut self.marketing_focus_score,
            PersonaTrait::Operations => &mut self.operations_focus_score,
            PersonaTrait::Compliance => &mut self.compliance_focus_score,
        }
    }

    pub fn top_pain_point(&self) -> Option<PainPoint> {
        self.pain_points_detected.first().copied()
    }

    /// Tags used to bias knowledge retrieval toward this persona.
    pub fn retrieval_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = PersonaTrait::ALL
            .iter()
            .filter(|t| self.score(**t) > 0.5)
            .map(|t| t.as_str().to_string())
            .collect();
        tags.extend(self.pain_points_detected.iter().map(|p| p.as_str().to_string()));
        tags
    }
}

/// One-paragraph description of the visitor for model prompts.
pub fn describe_persona(persona: &PersonaScores) -> String {
    const THRESHOLD: f32 = 0.6;
    let mut parts: Vec<&str> = Vec::new();

    if persona.supplier_score > THRESHOLD {
        parts.push("as a beverage producer/supplier");
    } else if persona.distributor_score > THRESHOLD {
        parts.push("as a distributor");
    }

    if persona.craft_score > THRESHOLD {
        parts.push("in the craft beverage segment");
    } else if persona.mid_sized_score > THRESHOLD {
        parts.push("as a mid-sized company");
    } else if persona.large_score > THRESHOLD {
        parts.push("as an enterprise");
    }

    if persona.sales_focus_score > THRESHOLD {
        parts.push("with a focus on sales effectiveness");
    }
    if persona.marketing_focus_score > THRESHOLD {
        parts.push("prioritizing marketing and brand positioning");
    }
    if persona.operations_focus_score > THRESHOLD {
        parts.push("focused on operational efficiency");
    }
    if persona.compliance_focus_score > THRESHOLD {
        parts.push("concerned with compliance and regulations");
    }

    let mut description = if parts.is_empty() {
        "The user is a beverage industry professional.".to_string()
    } else {
        format!("The user is operating {}.", parts.join(", "))
    };

    let pains: Vec<&str> = persona
        .pain_points_detected
        .iter()
        .take(2)
        .map(|p| p.label())
        .collect();
    if !pains.is_empty() {
        description.push_str(&format!(" Their key challenges include {}.", pains.join(" and ")));
    }
    description
}

/// Compact label of the dominant persona traits, e.g. `supplier_craft_sales`.
pub fn primary_persona_label(persona: &PersonaScores) -> String {
    const THRESHOLD: f32 = 0.7;
    let mut parts = Vec::new();
    if persona.supplier_score > THRESHOLD {
        parts.push("supplier");
    } else if persona.distributor_score > THRESHOLD {
        parts.push("distributor");
    }
    if persona.craft_score > THRESHOLD {
        parts.push("craft");
    } else if persona.mid_sized_score > THRESHOLD {
        parts.push("mid_sized");
    } else if persona.large_score > THRESHOLD {
        parts.push("large");
    }
    if persona.sales_focus_score > THRESHOLD {
        parts.push("sales");
    } else if persona.marketing_focus_score > THRESHOLD {
        parts.push("marketing");
    }
    if parts.is_empty() {
        "general".to_string()
    } else {
        parts.join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_persona_has_generic_description() {
        let persona = PersonaScores::default();
        assert_eq!(
            describe_persona(&persona),
            "The user is a beverage industry professional."
        );
        assert_eq!(primary_persona_label(&persona), "general");
    }

    #[test]
    fn description_lists_traits_and_two_pain_points() {
        let persona = PersonaScores {
            supplier_score: 0.8,
            craft_score: 0.9,
            sales_focus_score: 0.75,
            pain_points_detected: vec![
                PainPoint::ExecutionBlindSpot,
                PainPoint::SalesEffectiveness,
                PainPoint::InventoryVisibility,
            ],
            ..Default::default()
        };
        let text = describe_persona(&persona);
        assert!(text.starts_with("The user is operating as a beverage producer/supplier, in the craft"));
        assert!(text.contains("execution blind spots at retail and sales team effectiveness."));
        assert!(!text.contains("inventory"));
        assert_eq!(primary_persona_label(&persona), "supplier_craft_sales");
    }

    #[test]
    fn persona_round_trips_with_enum_keyed_confidence() {
        let mut persona = PersonaScores::default();
        persona.pain_points_detected.push(PainPoint::MarketAssessment);
        persona.pain_points_confidence.insert(PainPoint::MarketAssessment, 0.4);
        let json = serde_json::to_string(&persona).unwrap();
        assert!(json.contains("\"market_assessment\":0.4"));
        let back: PersonaScores = serde_json::from_str(&json).unwrap();
        assert_eq!(back, persona);
    }
}
