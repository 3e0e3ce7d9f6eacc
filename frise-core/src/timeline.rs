//! Patient timeline entries: the terminal artifact of the pipeline.

use crate::date::PartialDate;
use crate::mention::{DocumentId, EventType, PatientId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One deduplicated clinical event on a patient's timeline.
///
/// Within one patient's timeline no two entries are duplicates under the
/// aggregation equivalence rule (same event type and calendar-equal resolved
/// date, or fuzzy-matched null-date pairs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// The patient this entry belongs to.
    pub patient_id: PatientId,
    /// Clinical event category.
    pub event_type: EventType,
    /// Canonical resolved date; `None` for events no document dated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_date: Option<PartialDate>,
    /// Max confidence across merged supporting associations.
    pub confidence: f64,
    /// Every document that reported this event.
    pub supporting_documents: BTreeSet<DocumentId>,
    /// True only when every merged supporting association was ambiguous.
    pub is_ambiguous: bool,
}

impl TimelineEntry {
    /// Deterministic ordering key: resolved date ascending with nulls last,
    /// then event type declaration order, then earliest supporting document.
    #[must_use]
    pub fn sort_key(&self) -> (bool, (i32, u32, u32), usize, Option<&DocumentId>) {
        (
            self.resolved_date.is_none(),
            self.resolved_date.map_or((0, 0, 0), |d| d.sort_key()),
            self.event_type.order_key(),
            self.supporting_documents.iter().next(),
        )
    }
}

/// Whether a patient's timeline could be computed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineStatus {
    /// At least one document of the patient was processed successfully.
    Ok,
    /// Every document of the patient failed processing; the timeline is
    /// empty by construction, not because the patient had no events.
    NoData,
}

/// A patient's full ordered timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientTimeline {
    /// The patient.
    pub patient_id: PatientId,
    /// Whether any of the patient's documents survived processing.
    pub status: TimelineStatus,
    /// Deduplicated entries, chronologically ordered, null dates last.
    pub entries: Vec<TimelineEntry>,
}

impl PatientTimeline {
    /// An explicit "no data" timeline for a patient whose documents all
    /// failed processing.
    #[must_use]
    pub fn no_data(patient_id: PatientId) -> Self {
        Self {
            patient_id,
            status: TimelineStatus::NoData,
            entries: Vec::new(),
        }
    }
}
