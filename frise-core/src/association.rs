//! Event-date associations: the per-document output of the temporal
//! associator.

use crate::date::PartialDate;
use crate::mention::{DateMention, EventMention};
use serde::{Deserialize, Serialize};

/// A candidate date with its weighted distance to the event, used for the
/// ranked alternatives list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDate {
    /// The candidate date mention.
    pub date: DateMention,
    /// Weighted distance between the candidate and the event.
    pub distance_score: f64,
}

/// One event paired with the date it most plausibly occurred on.
///
/// Exactly one `Association` exists per [`EventMention`]. `date` is `None`
/// only when the document contains zero [`DateMention`]s, in which case
/// `distance_score` is the `+∞` sentinel.
///
/// Lifecycle: built by the associator with `final_confidence = 0.0` and
/// `is_ambiguous = false`; the confidence scorer fills those two fields in
/// place; the aggregator then consumes the value read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    /// The event being dated.
    pub event: EventMention,
    /// The chosen date, absent only when the document has no dates at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateMention>,
    /// Weighted distance to the chosen date (`+∞` when `date` is `None`).
    pub distance_score: f64,
    /// Combined confidence in [0, 1]; filled by the scorer.
    pub final_confidence: f64,
    /// Whether the chosen date is low-confidence or not clearly better than
    /// an alternative; filled by the scorer. Flagging never changes the
    /// selected date.
    pub is_ambiguous: bool,
    /// All non-chosen candidate dates, ascending by distance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<RankedDate>,
}

impl Association {
    /// The chosen date's parsed calendar value, when both exist.
    #[must_use]
    pub fn resolved_date(&self) -> Option<PartialDate> {
        self.date.as_ref().and_then(|d| d.resolved)
    }

    /// Distance margin between the chosen date and the best alternative.
    ///
    /// `None` when there is no alternative; `+∞` margins never flag as
    /// ambiguous.
    #[must_use]
    pub fn runner_up_margin(&self) -> Option<f64> {
        self.alternatives
            .first()
            .map(|alt| alt.distance_score - self.distance_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::{DocumentId, EventType};
    use crate::span::Span;

    fn mention(doc: &str) -> EventMention {
        EventMention {
            document_id: DocumentId::new(doc),
            span: Span::new(0, 10),
            event_type: EventType::Diagnosis,
            raw_text: "diagnostic".to_string(),
            model_confidence: 0.9,
        }
    }

    fn date(doc: &str, start: usize) -> DateMention {
        DateMention {
            document_id: DocumentId::new(doc),
            span: Span::new(start, start + 10),
            raw_text: "12/01/2023".to_string(),
            resolved: PartialDate::from_ymd(2023, 1, 12),
            relative_offset: None,
            parse_confidence: 1.0,
        }
    }

    #[test]
    fn runner_up_margin_uses_first_alternative() {
        let assoc = Association {
            event: mention("d1"),
            date: Some(date("d1", 20)),
            distance_score: 12.0,
            final_confidence: 0.0,
            is_ambiguous: false,
            alternatives: vec![
                RankedDate { date: date("d1", 80), distance_score: 15.0 },
                RankedDate { date: date("d1", 200), distance_score: 90.0 },
            ],
        };
        assert_eq!(assoc.runner_up_margin(), Some(3.0));
        assert_eq!(assoc.resolved_date(), PartialDate::from_ymd(2023, 1, 12));
    }

    #[test]
    fn no_alternatives_no_margin() {
        let assoc = Association {
            event: mention("d1"),
            date: None,
            distance_score: f64::INFINITY,
            final_confidence: 0.0,
            is_ambiguous: false,
            alternatives: vec![],
        };
        assert_eq!(assoc.runner_up_margin(), None);
        assert_eq!(assoc.resolved_date(), None);
    }
}
