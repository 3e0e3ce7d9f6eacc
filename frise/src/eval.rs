//! Evaluation of predicted timelines against ground truth.
//!
//! Entries are matched on `(patient_id, event_type, resolved_date)`
//! equality — the same key the evaluation collaborator uses. Ground truth
//! is an input to scoring only; nothing here feeds back into detection or
//! aggregation.

use frise_core::{EventType, PartialDate, PatientId, PatientTimeline};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One ground-truth timeline fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoldEntry {
    /// The patient the fact belongs to.
    pub patient_id: PatientId,
    /// Clinical event category.
    pub event_type: EventType,
    /// Expected resolved date, `None` for known-undatable events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_date: Option<PartialDate>,
}

/// True/false positive/negative counts with the derived metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCounts {
    /// Predicted entries present in gold.
    pub true_positives: usize,
    /// Predicted entries absent from gold.
    pub false_positives: usize,
    /// Gold entries the prediction missed.
    pub false_negatives: usize,
}

impl EvalCounts {
    /// Precision: TP / (TP + FP). Zero when nothing was predicted.
    #[must_use]
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Recall: TP / (TP + FN). Zero when gold is empty.
    #[must_use]
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// F1: harmonic mean of precision and recall.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// Overall and per-event-type evaluation result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    /// Counts over every entry.
    pub overall: EvalCounts,
    /// Counts broken down by event type.
    pub per_type: BTreeMap<EventType, EvalCounts>,
}

/// Score predicted timelines against gold entries.
#[must_use]
pub fn evaluate_timelines(predicted: &[PatientTimeline], gold: &[GoldEntry]) -> EvalReport {
    let predicted_keys: BTreeSet<(PatientId, EventType, Option<(i32, u32, u32)>)> = predicted
        .iter()
        .flat_map(|timeline| {
            timeline.entries.iter().map(|entry| {
                (
                    entry.patient_id.clone(),
                    entry.event_type,
                    entry.resolved_date.map(|d| d.sort_key()),
                )
            })
        })
        .collect();
    let gold_keys: BTreeSet<(PatientId, EventType, Option<(i32, u32, u32)>)> = gold
        .iter()
        .map(|entry| {
            (
                entry.patient_id.clone(),
                entry.event_type,
                entry.resolved_date.map(|d| d.sort_key()),
            )
        })
        .collect();

    let mut report = EvalReport::default();
    for key in &predicted_keys {
        let counts = report.per_type.entry(key.1).or_default();
        if gold_keys.contains(key) {
            report.overall.true_positives += 1;
            counts.true_positives += 1;
        } else {
            report.overall.false_positives += 1;
            counts.false_positives += 1;
        }
    }
    for key in &gold_keys {
        if !predicted_keys.contains(key) {
            report.overall.false_negatives += 1;
            report.per_type.entry(key.1).or_default().false_negatives += 1;
        }
    }
    report
}
