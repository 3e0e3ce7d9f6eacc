//! Longitudinal aggregation: merging a patient's associations across all
//! their documents into one deduplicated, chronologically ordered timeline.
//!
//! Two associations merge into one timeline entry when they carry the same
//! event type and calendar-equal resolved dates after normalization — a
//! partial date that is a consistent superset of a group's full date joins
//! it, refining the group to the most specific value. Dateless
//! associations merge only on near-identical supporting text (Jaccard
//! word-set similarity), a safety net for re-scanned duplicate documents.
//!
//! Merge policy: confidence is the max across members (corroboration never
//! lowers trust), supporting documents are unioned, and an entry stays
//! ambiguous only when every member was individually ambiguous.

use crate::config::PipelineConfig;
use frise_core::{
    Association, PartialDate, PatientId, PatientTimeline, TimelineEntry, TimelineStatus,
};
use std::collections::BTreeSet;

/// Jaccard similarity on whitespace-separated word sets, in [0.0, 1.0].
#[must_use]
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let words_a: BTreeSet<&str> = a.split_whitespace().collect();
    let words_b: BTreeSet<&str> = b.split_whitespace().collect();

    if words_a.is_empty() && words_b.is_empty() {
        return 1.0;
    }
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

/// Aggregate every association of one patient into an ordered timeline.
///
/// Pure and idempotent: the same associations always produce the same
/// entry sequence.
#[must_use]
pub fn aggregate(
    patient_id: &PatientId,
    associations: &[&Association],
    config: &PipelineConfig,
) -> PatientTimeline {
    let (dated, undated): (Vec<&&Association>, Vec<&&Association>) = associations
        .iter()
        .partition(|assoc| assoc.resolved_date().is_some());

    let mut entries = Vec::new();
    entries.extend(cluster_dated(patient_id, &dated));
    entries.extend(cluster_undated(patient_id, &undated, config));
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    PatientTimeline {
        patient_id: patient_id.clone(),
        status: TimelineStatus::Ok,
        entries,
    }
}

struct DatedCluster<'a> {
    canonical: PartialDate,
    members: Vec<&'a Association>,
}

fn cluster_dated(patient_id: &PatientId, dated: &[&&Association]) -> Vec<TimelineEntry> {
    // Deterministic processing order: most specific dates first, so full
    // dates seed clusters and partials attach to them.
    let mut ordered: Vec<&Association> = dated.iter().map(|a| **a).collect();
    ordered.sort_by(|a, b| {
        let da = a.resolved_date().expect("dated partition");
        let db = b.resolved_date().expect("dated partition");
        a.event
            .event_type
            .order_key()
            .cmp(&b.event.event_type.order_key())
            .then(db.granularity().cmp(&da.granularity()))
            .then(da.sort_key().cmp(&db.sort_key()))
            .then(a.event.document_id.cmp(&b.event.document_id))
            .then(a.event.span.start.cmp(&b.event.span.start))
    });

    let mut entries = Vec::new();
    for event_type in frise_core::EventType::ALL {
        let mut clusters: Vec<DatedCluster<'_>> = Vec::new();
        for &assoc in ordered
            .iter()
            .filter(|a| a.event.event_type == event_type)
        {
            let date = assoc.resolved_date().expect("dated partition");
            match clusters
                .iter_mut()
                .find(|c| c.canonical.is_compatible_with(&date))
            {
                Some(cluster) => {
                    cluster.canonical = cluster.canonical.most_specific(date);
                    cluster.members.push(assoc);
                }
                None => clusters.push(DatedCluster {
                    canonical: date,
                    members: vec![assoc],
                }),
            }
        }
        for cluster in clusters {
            entries.push(build_entry(
                patient_id,
                Some(cluster.canonical),
                &cluster.members,
            ));
        }
    }
    entries
}

fn cluster_undated(
    patient_id: &PatientId,
    undated: &[&&Association],
    config: &PipelineConfig,
) -> Vec<TimelineEntry> {
    // Deterministic member order before clustering.
    let mut ordered: Vec<&Association> = undated.iter().map(|a| **a).collect();
    ordered.sort_by(|a, b| {
        a.event
            .event_type
            .order_key()
            .cmp(&b.event.event_type.order_key())
            .then(a.event.document_id.cmp(&b.event.document_id))
            .then(a.event.span.start.cmp(&b.event.span.start))
    });

    // Union-find over fuzzy text matches within one event type.
    let mut parent: Vec<usize> = (0..ordered.len()).collect();

    fn find(parent: &mut [usize], i: usize) -> usize {
        if parent[i] != i {
            parent[i] = find(parent, parent[i]);
        }
        parent[i]
    }

    fn union(parent: &mut [usize], i: usize, j: usize) {
        let pi = find(parent, i);
        let pj = find(parent, j);
        if pi != pj {
            // smaller root wins, keeping cluster identity order-stable
            let (lo, hi) = if pi < pj { (pi, pj) } else { (pj, pi) };
            parent[hi] = lo;
        }
    }

    for i in 0..ordered.len() {
        for j in (i + 1)..ordered.len() {
            if ordered[i].event.event_type != ordered[j].event.event_type {
                continue;
            }
            let similarity =
                string_similarity(&ordered[i].event.raw_text, &ordered[j].event.raw_text);
            if similarity >= config.fuzzy_dedup_similarity_threshold {
                union(&mut parent, i, j);
            }
        }
    }

    let root_of: Vec<usize> = (0..ordered.len()).map(|i| find(&mut parent, i)).collect();
    let roots: BTreeSet<usize> = root_of.iter().copied().collect();

    roots
        .into_iter()
        .map(|root| {
            let members: Vec<&Association> = root_of
                .iter()
                .enumerate()
                .filter(|(_, r)| **r == root)
                .map(|(i, _)| ordered[i])
                .collect();
            build_entry(patient_id, None, &members)
        })
        .collect()
}

fn build_entry(
    patient_id: &PatientId,
    resolved_date: Option<PartialDate>,
    members: &[&Association],
) -> TimelineEntry {
    debug_assert!(!members.is_empty(), "clusters are never empty");
    let confidence = members
        .iter()
        .map(|m| m.final_confidence)
        .fold(0.0_f64, f64::max);
    let supporting_documents: BTreeSet<_> = members
        .iter()
        .map(|m| m.event.document_id.clone())
        .collect();
    let is_ambiguous = members.iter().all(|m| m.is_ambiguous);

    TimelineEntry {
        patient_id: patient_id.clone(),
        event_type: members[0].event.event_type,
        resolved_date,
        confidence,
        supporting_documents,
        is_ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frise_core::{DateMention, DocumentId, EventMention, EventType, Span};

    fn assoc(
        doc: &str,
        event_type: EventType,
        date: Option<PartialDate>,
        confidence: f64,
        ambiguous: bool,
        raw_event: &str,
    ) -> Association {
        Association {
            event: EventMention {
                document_id: DocumentId::new(doc),
                span: Span::new(0, raw_event.chars().count()),
                event_type,
                raw_text: raw_event.to_string(),
                model_confidence: 0.9,
            },
            date: date.map(|d| DateMention {
                document_id: DocumentId::new(doc),
                span: Span::new(20, 30),
                raw_text: d.to_string(),
                resolved: Some(d),
                relative_offset: None,
                parse_confidence: 1.0,
            }),
            distance_score: if date.is_some() { 10.0 } else { f64::INFINITY },
            final_confidence: confidence,
            is_ambiguous: ambiguous,
            alternatives: Vec::new(),
        }
    }

    fn run(associations: &[Association]) -> PatientTimeline {
        let refs: Vec<&Association> = associations.iter().collect();
        aggregate(
            &PatientId::new("p1"),
            &refs,
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn calendar_equal_duplicates_merge_with_max_confidence() {
        let date = PartialDate::from_ymd(2023, 3, 1);
        let a = assoc("doc-a", EventType::Treatment, date, 0.4, true, "traitement");
        let b = assoc("doc-b", EventType::Treatment, date, 0.8, false, "traitement");
        let timeline = run(&[a, b]);

        assert_eq!(timeline.entries.len(), 1);
        let entry = &timeline.entries[0];
        assert_eq!(entry.confidence, 0.8);
        assert!(!entry.is_ambiguous); // the unambiguous member clears the flag
        assert_eq!(entry.supporting_documents.len(), 2);
    }

    #[test]
    fn partial_date_refines_into_full_date_group() {
        let full = PartialDate::from_ymd(2023, 1, 12);
        let month = PartialDate::year_month(2023, 1);
        let a = assoc("doc-a", EventType::Diagnosis, full, 0.9, false, "diagnostic");
        let b = assoc("doc-b", EventType::Diagnosis, month, 0.6, false, "diagnostic");
        let timeline = run(&[a, b]);

        assert_eq!(timeline.entries.len(), 1);
        assert_eq!(timeline.entries[0].resolved_date, full);
    }

    #[test]
    fn incompatible_partials_stay_separate() {
        let jan = PartialDate::from_ymd(2023, 1, 12);
        let feb = PartialDate::year_month(2023, 2);
        let a = assoc("doc-a", EventType::Diagnosis, jan, 0.9, false, "diagnostic");
        let b = assoc("doc-b", EventType::Diagnosis, feb, 0.6, false, "diagnostic");
        let timeline = run(&[a, b]);
        assert_eq!(timeline.entries.len(), 2);
    }

    #[test]
    fn different_event_types_never_merge() {
        let date = PartialDate::from_ymd(2023, 3, 1);
        let a = assoc("doc-a", EventType::Diagnosis, date, 0.9, false, "diagnostic");
        let b = assoc("doc-a", EventType::Treatment, date, 0.9, false, "traitement");
        let timeline = run(&[a, b]);
        assert_eq!(timeline.entries.len(), 2);
    }

    #[test]
    fn null_date_fuzzy_dedup() {
        let a = assoc(
            "doc-a",
            EventType::Complication,
            None,
            0.0,
            true,
            "récidive locale précoce",
        );
        let b = assoc(
            "doc-b",
            EventType::Complication,
            None,
            0.0,
            true,
            "récidive locale précoce",
        );
        let c = assoc(
            "doc-c",
            EventType::Complication,
            None,
            0.0,
            true,
            "toxicité cutanée",
        );
        let timeline = run(&[a, b, c]);

        assert_eq!(timeline.entries.len(), 2);
        // identical text merged, distinct text did not
        let merged = timeline
            .entries
            .iter()
            .find(|e| e.supporting_documents.len() == 2)
            .unwrap();
        assert!(merged.is_ambiguous);
        assert_eq!(merged.resolved_date, None);
    }

    #[test]
    fn ordering_dates_ascending_nulls_last() {
        let timeline = run(&[
            assoc("doc-a", EventType::FollowUp, None, 0.0, true, "suivi"),
            assoc(
                "doc-a",
                EventType::Treatment,
                PartialDate::from_ymd(2023, 5, 2),
                0.8,
                false,
                "traitement",
            ),
            assoc(
                "doc-a",
                EventType::Diagnosis,
                PartialDate::from_ymd(2021, 1, 1),
                0.8,
                false,
                "diagnostic",
            ),
        ]);
        let dates: Vec<Option<PartialDate>> = timeline
            .entries
            .iter()
            .map(|e| e.resolved_date)
            .collect();
        assert_eq!(
            dates,
            vec![
                PartialDate::from_ymd(2021, 1, 1),
                PartialDate::from_ymd(2023, 5, 2),
                None,
            ]
        );
    }

    #[test]
    fn same_date_ties_break_by_event_type_order() {
        let date = PartialDate::from_ymd(2023, 3, 1);
        let timeline = run(&[
            assoc("doc-a", EventType::FollowUp, date, 0.8, false, "suivi"),
            assoc("doc-a", EventType::Diagnosis, date, 0.8, false, "diagnostic"),
        ]);
        assert_eq!(timeline.entries[0].event_type, EventType::Diagnosis);
        assert_eq!(timeline.entries[1].event_type, EventType::FollowUp);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let associations = vec![
            assoc(
                "doc-a",
                EventType::Diagnosis,
                PartialDate::from_ymd(2023, 1, 12),
                0.9,
                false,
                "diagnostic",
            ),
            assoc(
                "doc-b",
                EventType::Diagnosis,
                PartialDate::year_month(2023, 1),
                0.5,
                true,
                "diagnostic",
            ),
            assoc("doc-c", EventType::FollowUp, None, 0.0, true, "suivi"),
        ];
        let first = run(&associations);
        let second = run(&associations);
        assert_eq!(first, second);
    }

    #[test]
    fn similarity_is_jaccard_on_word_sets() {
        assert_eq!(string_similarity("récidive locale", "récidive locale"), 1.0);
        assert_eq!(string_similarity("", ""), 1.0);
        assert_eq!(string_similarity("a", ""), 0.0);
        let sim = string_similarity("récidive locale précoce", "récidive locale");
        assert!((sim - 2.0 / 3.0).abs() < 1e-12);
    }
}
