//! Confidence scoring and ambiguity flagging for associations.
//!
//! `final_confidence = model_confidence × parse_confidence × proximity`,
//! where proximity decays exponentially with the weighted distance (1.0 at
//! distance zero, halving every `distance_half_life` characters, 0 at the
//! null-date `+∞` sentinel — so a dateless association scores exactly 0
//! with no special case).
//!
//! An association is flagged ambiguous when its confidence falls below
//! τ_ambig, when the two best candidate dates are closer than the margin δ
//! (a genuine tie), or when it has no date at all. Flagging only annotates;
//! it never changes the selected date.

use crate::config::PipelineConfig;
use frise_core::{Association, Confidence};

/// Proximity weight in (0, 1] for a weighted distance, halving every
/// `half_life` characters.
#[must_use]
pub fn proximity_weight(distance: f64, half_life: f64) -> f64 {
    if distance <= 0.0 {
        return 1.0;
    }
    0.5_f64.powf(distance / half_life)
}

/// Fill `final_confidence` and `is_ambiguous` on one association.
pub fn score_association(assoc: &mut Association, config: &PipelineConfig) {
    let parse_confidence = assoc.date.as_ref().map_or(0.0, |d| d.parse_confidence);
    let proximity = proximity_weight(assoc.distance_score, config.distance_half_life);
    assoc.final_confidence = Confidence::saturating(
        assoc.event.model_confidence * parse_confidence * proximity,
    )
    .get();

    let genuine_tie = assoc
        .runner_up_margin()
        .is_some_and(|margin| margin < config.ambiguity_margin);
    assoc.is_ambiguous = assoc.date.is_none()
        || assoc.final_confidence < config.ambiguity_threshold
        || genuine_tie;
}

/// Score every association of a document in place.
pub fn score_all(associations: &mut [Association], config: &PipelineConfig) {
    for assoc in associations {
        score_association(assoc, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frise_core::{
        DateMention, DocumentId, EventMention, EventType, PartialDate, RankedDate, Span,
    };

    fn assoc(distance: f64, model: f64, parse: f64) -> Association {
        Association {
            event: EventMention {
                document_id: DocumentId::new("d1"),
                span: Span::new(0, 10),
                event_type: EventType::Diagnosis,
                raw_text: "diagnostic".to_string(),
                model_confidence: model,
            },
            date: Some(DateMention {
                document_id: DocumentId::new("d1"),
                span: Span::new(20, 30),
                raw_text: "12/01/2023".to_string(),
                resolved: PartialDate::from_ymd(2023, 1, 12),
                relative_offset: None,
                parse_confidence: parse,
            }),
            distance_score: distance,
            final_confidence: 0.0,
            is_ambiguous: false,
            alternatives: Vec::new(),
        }
    }

    #[test]
    fn decay_is_one_at_zero_and_halves_at_half_life() {
        assert_eq!(proximity_weight(0.0, 120.0), 1.0);
        assert!((proximity_weight(120.0, 120.0) - 0.5).abs() < 1e-12);
        assert!((proximity_weight(240.0, 120.0) - 0.25).abs() < 1e-12);
        assert_eq!(proximity_weight(f64::INFINITY, 120.0), 0.0);
    }

    #[test]
    fn decay_is_monotone_non_increasing() {
        let half_life = 80.0;
        let mut prev = proximity_weight(0.0, half_life);
        for step in 1..200 {
            let next = proximity_weight(f64::from(step) * 5.0, half_life);
            assert!(next <= prev);
            prev = next;
        }
    }

    #[test]
    fn confidence_combines_three_factors() {
        let config = PipelineConfig::default();
        let mut a = assoc(0.0, 0.9, 1.0);
        score_association(&mut a, &config);
        assert!((a.final_confidence - 0.9).abs() < 1e-12);
        assert!(!a.is_ambiguous);

        // same thing but at one half-life of distance
        let mut b = assoc(config.distance_half_life, 0.9, 1.0);
        score_association(&mut b, &config);
        assert!((b.final_confidence - 0.45).abs() < 1e-12);
    }

    #[test]
    fn smaller_distance_never_scores_lower() {
        let config = PipelineConfig::default();
        let mut near = assoc(10.0, 0.8, 0.9);
        let mut far = assoc(300.0, 0.8, 0.9);
        score_association(&mut near, &config);
        score_association(&mut far, &config);
        assert!(near.final_confidence >= far.final_confidence);
    }

    #[test]
    fn low_confidence_flags_ambiguous() {
        let config = PipelineConfig::default().with_ambiguity_threshold(0.5);
        let mut a = assoc(1000.0, 0.9, 1.0); // heavy decay
        score_association(&mut a, &config);
        assert!(a.final_confidence < 0.5);
        assert!(a.is_ambiguous);
    }

    #[test]
    fn sub_margin_runner_up_flags_ambiguous_regardless_of_confidence() {
        let config = PipelineConfig::default();
        let mut a = assoc(5.0, 0.95, 1.0);
        a.alternatives.push(RankedDate {
            date: a.date.clone().unwrap(),
            distance_score: 5.0 + config.ambiguity_margin / 2.0,
        });
        score_association(&mut a, &config);
        assert!(a.final_confidence > config.ambiguity_threshold);
        assert!(a.is_ambiguous);
    }

    #[test]
    fn clear_runner_up_margin_is_not_ambiguous() {
        let config = PipelineConfig::default();
        let mut a = assoc(5.0, 0.95, 1.0);
        a.alternatives.push(RankedDate {
            date: a.date.clone().unwrap(),
            distance_score: 5.0 + config.ambiguity_margin * 10.0,
        });
        score_association(&mut a, &config);
        assert!(!a.is_ambiguous);
    }

    #[test]
    fn null_date_scores_zero_and_is_ambiguous() {
        let config = PipelineConfig::default();
        let mut a = assoc(f64::INFINITY, 0.9, 1.0);
        a.date = None;
        score_association(&mut a, &config);
        assert_eq!(a.final_confidence, 0.0);
        assert!(a.is_ambiguous);
    }

    #[test]
    fn flagging_never_changes_selection() {
        let config = PipelineConfig::default().with_ambiguity_threshold(1.0);
        let mut a = assoc(5.0, 0.9, 1.0);
        let chosen_before = a.date.clone();
        score_association(&mut a, &config);
        assert!(a.is_ambiguous); // everything is below τ_ambig = 1.0
        assert_eq!(a.date, chosen_before);
    }
}
