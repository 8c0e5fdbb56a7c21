use super::{PersonaScores, Signal, SignalKind};

/// Confidence bump when an already-known pain point is mentioned again.
const PAIN_POINT_REPEAT_BOOST: f32 = 0.1;

/// Fold one message's signals into a new persona value.
///
/// Applied exactly once per processed message, so `total_interactions`
/// increments even when `signals` is empty. `growth_rate` controls how fast
/// `overall_confidence` approaches 1 as signal mass accumulates; confidence
/// never decreases here.
pub fn update_persona_with_signals(
    persona: &PersonaScores,
    signals: &[Signal],
    growth_rate: f32,
) -> PersonaScores {
    let mut next = persona.clone();

    for signal in signals {
        let strength = signal.strength.clamp(0.0, 1.0);
        match signal.kind {
            SignalKind::PersonaTrait(t) => {
                let score = next.score_mut(t);
                *score = (*score + strength).clamp(0.0, 1.0);
            }
            SignalKind::PainPoint(p) => {
                let confidence = next.pain_points_confidence.entry(p).or_insert(0.0);
                if next.pain_points_detected.contains(&p) {
                    *confidence = (confidence.max(strength) + PAIN_POINT_REPEAT_BOOST).clamp(0.0, 1.0);
                } else {
                    *confidence = confidence.max(strength).clamp(0.0, 1.0);
                    next.pain_points_detected.push(p);
                }
            }
        }
        next.signal_mass += strength;
    }

    let rate = growth_rate.max(0.0);
    let derived = (1.0 - (-rate * next.signal_mass).exp()).clamp(0.0, 1.0);
    next.overall_confidence = next.overall_confidence.max(derived).clamp(0.0, 1.0);
    next.total_interactions = next.total_interactions.saturating_add(1);

    tracing::debug!(
        target: "bevgenie::persona",
        signals = signals.len(),
        overall_confidence = next.overall_confidence,
        pain_points = next.pain_points_detected.len(),
        "persona updated"
    );
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{PainPoint, PersonaTrait};

    fn trait_signal(t: PersonaTrait, strength: f32) -> Signal {
        Signal {
            kind: SignalKind::PersonaTrait(t),
            strength,
            evidence: t.as_str().to_string(),
        }
    }

    fn pain_signal(p: PainPoint, strength: f32) -> Signal {
        Signal {
            kind: SignalKind::PainPoint(p),
            strength,
            evidence: p.as_str().to_string(),
        }
    }

    #[test]
    fn input_is_not_mutated() {
        let persona = PersonaScores::default();
        let next = update_persona_with_signals(&persona, &[trait_signal(PersonaTrait::Sales, 0.3)], 0.35);
        assert_eq!(persona, PersonaScores::default());
        assert!((next.sales_focus_score - 0.3).abs() < 1e-6);
        assert_eq!(next.total_interactions, 1);
    }

    #[test]
    fn scores_clamp_at_one() {
        let mut persona = PersonaScores::default();
        for _ in 0..10 {
            persona = update_persona_with_signals(
                &persona,
                &[trait_signal(PersonaTrait::Large, 0.9), trait_signal(PersonaTrait::Large, 1.0)],
                0.35,
            );
        }
        assert_eq!(persona.large_score, 1.0);
        assert!(persona.overall_confidence <= 1.0);
    }

    #[test]
    fn pain_points_are_unique_and_ordered() {
        let persona = update_persona_with_signals(
            &PersonaScores::default(),
            &[
                pain_signal(PainPoint::InventoryVisibility, 0.35),
                pain_signal(PainPoint::ExecutionBlindSpot, 0.4),
            ],
            0.35,
        );
        let persona = update_persona_with_signals(
            &persona,
            &[pain_signal(PainPoint::InventoryVisibility, 0.35)],
            0.35,
        );
        assert_eq!(
            persona.pain_points_detected,
            vec![PainPoint::InventoryVisibility, PainPoint::ExecutionBlindSpot]
        );
        let confidence = persona.pain_points_confidence[&PainPoint::InventoryVisibility];
        assert!((confidence - 0.45).abs() < 1e-6);
    }

    #[test]
    fn overall_confidence_never_decreases() {
        let mut persona = update_persona_with_signals(
            &PersonaScores::default(),
            &[trait_signal(PersonaTrait::Sales, 0.5)],
            0.35,
        );
        let before = persona.overall_confidence;
        assert!(before > 0.0);
        persona = update_persona_with_signals(&persona, &[], 0.0);
        assert!(persona.overall_confidence >= before);
        assert_eq!(persona.total_interactions, 2);
    }
}
