//! Pipeline configuration.
//!
//! One immutable [`PipelineConfig`] is threaded explicitly through every
//! component call. Nothing reads module-level mutable state, which keeps
//! per-document processing parallel-safe and deterministic. Invalid values
//! are rejected up front by [`PipelineConfig::validate`] — a run never
//! starts with a bad threshold.

use frise_core::{Error, EventType, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Date surface-form families the detector can run, in configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `12/01/2023`, `12-01-2023`, `12.01.2023` (day first, 2- or 4-digit
    /// year).
    NumericDayFirst,
    /// ISO `2023-01-12`.
    Iso,
    /// Textual day-level forms: `12 janvier 2023`, `1er janvier 2023`.
    TextualDay,
    /// Month-year partials: `janvier 2023`.
    MonthYear,
    /// Bare plausible years: `2023`.
    YearOnly,
    /// Relative forms: `le lendemain`, `trois jours après`.
    Relative,
}

impl DateFormat {
    /// Every family, in default detection order.
    pub const ALL: [DateFormat; 6] = [
        DateFormat::NumericDayFirst,
        DateFormat::Iso,
        DateFormat::TextualDay,
        DateFormat::MonthYear,
        DateFormat::YearOnly,
        DateFormat::Relative,
    ];
}

/// Immutable configuration for one pipeline run.
///
/// # Example
///
/// ```rust
/// use frise::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_confidence_threshold(0.6)
///     .with_worker_count(2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Event types the classifier wrapper may emit.
    pub event_types: BTreeSet<EventType>,
    /// τ_event: minimum per-type probability for a span to become an
    /// [`frise_core::EventMention`].
    pub confidence_threshold: f64,
    /// τ_ambig: associations scoring below this are flagged ambiguous.
    pub ambiguity_threshold: f64,
    /// δ: when the top two candidate dates are closer than this (in
    /// weighted char units), the association is a genuine tie and flagged.
    pub ambiguity_margin: f64,
    /// Half-life (char units) of the exponential proximity decay.
    pub distance_half_life: f64,
    /// Date surface-form families to run, in order.
    pub date_formats: Vec<DateFormat>,
    /// Multiplier (>= 1) applied when a sentence boundary separates event
    /// and date.
    pub sentence_boundary_penalty: f64,
    /// Multiplier in (0, 1] applied when a cue token links event and date.
    pub linguistic_cue_bonus: f64,
    /// Cue tokens that mark an explicit event-date link.
    pub linguistic_cues: Vec<String>,
    /// Candidates within this weighted distance of the minimum count as
    /// tied during selection (char-equivalent units).
    pub tie_epsilon: f64,
    /// Extra multiplier when the date lies before the event mention.
    pub date_before_event_weight: f64,
    /// Extra multiplier when the date lies after the event mention.
    pub date_after_event_weight: f64,
    /// Minimum Jaccard word-set similarity for null-date deduplication.
    pub fuzzy_dedup_similarity_threshold: f64,
    /// Worker threads for per-document processing.
    pub worker_count: usize,
    /// Documents per classifier inference batch.
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            event_types: EventType::ALL.into_iter().collect(),
            confidence_threshold: 0.5,
            ambiguity_threshold: 0.35,
            ambiguity_margin: 10.0,
            distance_half_life: 120.0,
            date_formats: DateFormat::ALL.to_vec(),
            sentence_boundary_penalty: 1.5,
            linguistic_cue_bonus: 0.6,
            linguistic_cues: [
                "le",
                "en",
                "au",
                "du",
                "depuis",
                "dès",
                "en date du",
                "à partir du",
                "à compter du",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            tie_epsilon: 1.0,
            date_before_event_weight: 1.0,
            date_after_event_weight: 1.0,
            fuzzy_dedup_similarity_threshold: 0.85,
            worker_count: 4,
            batch_size: 8,
        }
    }
}

impl PipelineConfig {
    /// Set τ_event.
    #[must_use]
    pub fn with_confidence_threshold(mut self, value: f64) -> Self {
        self.confidence_threshold = value;
        self
    }

    /// Set τ_ambig.
    #[must_use]
    pub fn with_ambiguity_threshold(mut self, value: f64) -> Self {
        self.ambiguity_threshold = value;
        self
    }

    /// Set the tie margin δ.
    #[must_use]
    pub fn with_ambiguity_margin(mut self, value: f64) -> Self {
        self.ambiguity_margin = value;
        self
    }

    /// Set the proximity decay half-life (char units).
    #[must_use]
    pub fn with_distance_half_life(mut self, value: f64) -> Self {
        self.distance_half_life = value;
        self
    }

    /// Set the worker thread count.
    #[must_use]
    pub fn with_worker_count(mut self, value: usize) -> Self {
        self.worker_count = value;
        self
    }

    /// Set the classifier batch size.
    #[must_use]
    pub fn with_batch_size(mut self, value: usize) -> Self {
        self.batch_size = value;
        self
    }

    /// Restrict the emitted event types.
    #[must_use]
    pub fn with_event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = types.into_iter().collect();
        self
    }

    /// Validate every field, failing fast with a [`Error::Config`] before
    /// any document is processed.
    pub fn validate(&self) -> Result<()> {
        fn unit(name: &str, value: f64) -> Result<()> {
            if (0.0..=1.0).contains(&value) && !value.is_nan() {
                Ok(())
            } else {
                Err(Error::config(format!("{name} must be in [0, 1], got {value}")))
            }
        }

        unit("confidence_threshold", self.confidence_threshold)?;
        unit("ambiguity_threshold", self.ambiguity_threshold)?;
        unit(
            "fuzzy_dedup_similarity_threshold",
            self.fuzzy_dedup_similarity_threshold,
        )?;
        if self.ambiguity_margin < 0.0 || self.ambiguity_margin.is_nan() {
            return Err(Error::config(format!(
                "ambiguity_margin must be >= 0, got {}",
                self.ambiguity_margin
            )));
        }
        if !(self.distance_half_life > 0.0) {
            return Err(Error::config(format!(
                "distance_half_life must be > 0, got {}",
                self.distance_half_life
            )));
        }
        if self.sentence_boundary_penalty < 1.0 || self.sentence_boundary_penalty.is_nan() {
            return Err(Error::config(format!(
                "sentence_boundary_penalty must be >= 1, got {}",
                self.sentence_boundary_penalty
            )));
        }
        if !(self.linguistic_cue_bonus > 0.0 && self.linguistic_cue_bonus <= 1.0) {
            return Err(Error::config(format!(
                "linguistic_cue_bonus must be in (0, 1], got {}",
                self.linguistic_cue_bonus
            )));
        }
        if self.tie_epsilon < 0.0 || self.tie_epsilon.is_nan() {
            return Err(Error::config(format!(
                "tie_epsilon must be >= 0, got {}",
                self.tie_epsilon
            )));
        }
        for (name, w) in [
            ("date_before_event_weight", self.date_before_event_weight),
            ("date_after_event_weight", self.date_after_event_weight),
        ] {
            if !(w > 0.0) {
                return Err(Error::config(format!("{name} must be > 0, got {w}")));
            }
        }
        if self.worker_count == 0 {
            return Err(Error::config("worker_count must be >= 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be >= 1"));
        }
        if self.event_types.is_empty() {
            return Err(Error::config("event_types must not be empty"));
        }
        if self.date_formats.is_empty() {
            return Err(Error::config("date_formats must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let bad = PipelineConfig::default().with_confidence_threshold(1.2);
        assert!(bad.validate().is_err());

        let bad = PipelineConfig::default().with_ambiguity_margin(-1.0);
        assert!(bad.validate().is_err());

        let bad = PipelineConfig::default().with_distance_half_life(0.0);
        assert!(bad.validate().is_err());

        let mut bad = PipelineConfig::default();
        bad.sentence_boundary_penalty = 0.9;
        assert!(bad.validate().is_err());

        let mut bad = PipelineConfig::default();
        bad.linguistic_cue_bonus = 0.0;
        assert!(bad.validate().is_err());

        let bad = PipelineConfig::default().with_worker_count(0);
        assert!(bad.validate().is_err());

        let bad = PipelineConfig::default().with_event_types(std::iter::empty());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"confidence_threshold": 0.7, "batch_size": 16}"#).unwrap();
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.batch_size, 16);
        // untouched fields keep their defaults
        assert_eq!(config.worker_count, PipelineConfig::default().worker_count);
    }
}
