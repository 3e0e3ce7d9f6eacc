//! Pipeline orchestration: normalize → detect → classify → associate →
//! score per document, then aggregate per patient.
//!
//! Per-document processing is a pure function of the document text and the
//! immutable configuration, so documents run in parallel on a worker pool
//! bounded by `worker_count` (cargo feature `parallel`, on by default).
//! Classifier inference — the one resource-heavy step — is invoked over
//! batches of `batch_size` documents, never per span.
//!
//! Failures are isolated: a classifier error on one document lands in the
//! run's failure ledger and excludes that document from its patient's
//! aggregation; the run always completes and reports counts instead of
//! failing the batch. A patient whose documents all failed gets an
//! explicit `NoData` timeline.

use crate::aggregate::aggregate;
use crate::associate::associate;
use crate::config::PipelineConfig;
use crate::detect::{DateDetector, EventClassifier, EventTagger, LexiconTagger};
use crate::normalize::Normalizer;
use crate::score::score_all;
use frise_core::{
    Association, DocumentId, EventMention, PatientId, PatientTimeline, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One input document: identifier plus raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Opaque document identifier from upstream ingestion.
    pub id: DocumentId,
    /// Document text (pre- or post-OCR; the pipeline normalizes it).
    pub text: String,
}

/// Optional document-to-patient mapping from the patient-metadata
/// collaborator. Documents without an entry form singleton patients keyed
/// by their own document id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientMapping {
    map: BTreeMap<DocumentId, PatientId>,
}

impl PatientMapping {
    /// An empty mapping: every document is its own patient.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document-to-patient link.
    pub fn insert(&mut self, document: DocumentId, patient: PatientId) {
        self.map.insert(document, patient);
    }

    /// The patient owning `document`, falling back to a singleton patient.
    #[must_use]
    pub fn patient_for(&self, document: &DocumentId) -> PatientId {
        self.map
            .get(document)
            .cloned()
            .unwrap_or_else(|| PatientId::from_document(document))
    }
}

impl FromIterator<(DocumentId, PatientId)> for PatientMapping {
    fn from_iter<T: IntoIterator<Item = (DocumentId, PatientId)>>(iter: T) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// One isolated per-document failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    /// The document that failed processing.
    pub document_id: DocumentId,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Counters and ledger for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Documents processed successfully.
    pub success_count: usize,
    /// Documents excluded after an isolated failure.
    pub failure_count: usize,
    /// Why each failed document was excluded.
    pub failures: Vec<DocumentFailure>,
    /// Event mentions associated across all successful documents.
    pub total_events: usize,
    /// Associations flagged ambiguous.
    pub ambiguous_count: usize,
}

/// Per-document audit output: every association, in event order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutput {
    /// The processed document.
    pub document_id: DocumentId,
    /// One association per event mention.
    pub associations: Vec<Association>,
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Audit trail: associations per successfully processed document.
    pub documents: Vec<DocumentOutput>,
    /// One timeline per patient, ordered by patient id.
    pub timelines: Vec<PatientTimeline>,
    /// Success/failure counters and the failure ledger.
    pub report: RunReport,
}

/// The assembled extraction pipeline.
///
/// # Example
///
/// ```rust
/// use frise::{Pipeline, PipelineConfig, DocumentRecord, PatientMapping};
///
/// let pipeline = Pipeline::with_lexicon(PipelineConfig::default()).unwrap();
/// let docs = vec![DocumentRecord {
///     id: "doc-1".into(),
///     text: "Diagnostic de diabète le 12 janvier 2023.".to_string(),
/// }];
/// let output = pipeline.run(&docs, &PatientMapping::new());
/// assert_eq!(output.report.success_count, 1);
/// assert_eq!(output.timelines.len(), 1);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: Normalizer,
    detector: DateDetector,
    classifier: EventClassifier,
}

impl Pipeline {
    /// Build a pipeline over a tagger backend. Fails fast on invalid
    /// configuration: no partial runs.
    pub fn new(config: PipelineConfig, tagger: Box<dyn EventTagger>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            normalizer: Normalizer::new(),
            detector: DateDetector::new(),
            classifier: EventClassifier::new(tagger),
        })
    }

    /// Build a pipeline over the bundled lexicon tagger.
    pub fn with_lexicon(config: PipelineConfig) -> Result<Self> {
        Self::new(config, Box::new(LexiconTagger::new()))
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a single document end to end: one association per detected
    /// event mention, scored and flagged.
    pub fn process_document(
        &self,
        document_id: &DocumentId,
        text: &str,
    ) -> Result<Vec<Association>> {
        let prepared = self.normalizer.prepare(text);
        let events = self
            .classifier
            .classify(&prepared.text, document_id, &self.config)?;
        Ok(self.associate_document(document_id, &prepared.text, events))
    }

    /// Run the full pipeline over a document batch.
    ///
    /// Always completes: per-document failures are recorded in the report,
    /// never propagated.
    #[must_use]
    pub fn run(&self, documents: &[DocumentRecord], mapping: &PatientMapping) -> RunOutput {
        log::info!(
            "starting run: {} documents, backend={}, workers={}, batch={}",
            documents.len(),
            self.classifier.backend_name(),
            self.config.worker_count,
            self.config.batch_size
        );

        #[cfg(feature = "parallel")]
        {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.worker_count)
                .build()
            {
                Ok(pool) => pool.install(|| self.run_inner(documents, mapping)),
                Err(err) => {
                    log::warn!("worker pool unavailable ({err}); running inline");
                    self.run_inner(documents, mapping)
                }
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.run_inner(documents, mapping)
        }
    }

    fn run_inner(&self, documents: &[DocumentRecord], mapping: &PatientMapping) -> RunOutput {
        // Stage 1: normalization, independent per document.
        let normalized: Vec<String> =
            map_ordered(documents.iter().collect(), |doc: &DocumentRecord| {
                self.normalizer.prepare(&doc.text).text
            });

        // Stage 2: batched classification. A failing batch is retried one
        // document at a time so a single poisoned text cannot take down
        // its batch-mates.
        let indexed: Vec<(usize, &DocumentId, &str)> = documents
            .iter()
            .enumerate()
            .map(|(idx, doc)| (idx, &doc.id, normalized[idx].as_str()))
            .collect();
        let chunk_results: Vec<Vec<(usize, Result<Vec<EventMention>>)>> = map_ordered(
            indexed.chunks(self.config.batch_size).collect(),
            |chunk: &[(usize, &DocumentId, &str)]| self.classify_chunk(chunk),
        );
        let mut events_by_doc: Vec<Option<Vec<EventMention>>> =
            (0..documents.len()).map(|_| None).collect();
        let mut failures: Vec<DocumentFailure> = Vec::new();
        for (idx, outcome) in chunk_results.into_iter().flatten() {
            match outcome {
                Ok(events) => events_by_doc[idx] = Some(events),
                Err(err) => {
                    log::warn!("document {} excluded: {err}", documents[idx].id);
                    failures.push(DocumentFailure {
                        document_id: documents[idx].id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        // Stage 3: dates, association, scoring — independent per document.
        let survivors: Vec<(usize, Vec<EventMention>)> = events_by_doc
            .iter()
            .enumerate()
            .filter_map(|(idx, events)| events.clone().map(|e| (idx, e)))
            .collect();
        let outputs: Vec<DocumentOutput> =
            map_ordered(survivors, |(idx, events): (usize, Vec<EventMention>)| {
                DocumentOutput {
                    document_id: documents[idx].id.clone(),
                    associations: self.associate_document(
                        &documents[idx].id,
                        &normalized[idx],
                        events,
                    ),
                }
            });

        // Stage 4: longitudinal aggregation, grouped by patient. Every
        // document contributes to the grouping so fully-failed patients
        // still surface as NoData.
        let mut docs_of_patient: BTreeMap<PatientId, Vec<&DocumentOutput>> = BTreeMap::new();
        for doc in documents {
            docs_of_patient
                .entry(mapping.patient_for(&doc.id))
                .or_default();
        }
        for output in &outputs {
            docs_of_patient
                .entry(mapping.patient_for(&output.document_id))
                .or_default()
                .push(output);
        }
        let timelines: Vec<PatientTimeline> = map_ordered(
            docs_of_patient.into_iter().collect(),
            |(patient_id, outputs): (PatientId, Vec<&DocumentOutput>)| {
                if outputs.is_empty() {
                    log::warn!("patient {patient_id}: no processed documents");
                    PatientTimeline::no_data(patient_id)
                } else {
                    let associations: Vec<&Association> = outputs
                        .iter()
                        .flat_map(|o| o.associations.iter())
                        .collect();
                    aggregate(&patient_id, &associations, &self.config)
                }
            },
        );

        let total_events: usize = outputs.iter().map(|o| o.associations.len()).sum();
        let ambiguous_count: usize = outputs
            .iter()
            .flat_map(|o| o.associations.iter())
            .filter(|a| a.is_ambiguous)
            .count();
        let report = RunReport {
            success_count: outputs.len(),
            failure_count: failures.len(),
            failures,
            total_events,
            ambiguous_count,
        };
        log::info!(
            "run complete: {} ok, {} failed, {} events ({} ambiguous), {} patients",
            report.success_count,
            report.failure_count,
            report.total_events,
            report.ambiguous_count,
            timelines.len()
        );

        RunOutput {
            documents: outputs,
            timelines,
            report,
        }
    }

    /// Classify one batch, falling back to per-document calls when the
    /// whole batch errors.
    fn classify_chunk(
        &self,
        chunk: &[(usize, &DocumentId, &str)],
    ) -> Vec<(usize, Result<Vec<EventMention>>)> {
        let batch: Vec<(&DocumentId, &str)> =
            chunk.iter().map(|(_, id, text)| (*id, *text)).collect();
        match self.classifier.classify_batch(&batch, &self.config) {
            Ok(results) => chunk
                .iter()
                .zip(results)
                .map(|((idx, _, _), events)| (*idx, Ok(events)))
                .collect(),
            Err(err) => {
                log::warn!("batch of {} failed ({err}); retrying per document", chunk.len());
                chunk
                    .iter()
                    .map(|(idx, id, text)| {
                        (*idx, self.classifier.classify(text, id, &self.config))
                    })
                    .collect()
            }
        }
    }

    /// Dates → association → scoring for one normalized document.
    fn associate_document(
        &self,
        document_id: &DocumentId,
        normalized: &str,
        events: Vec<EventMention>,
    ) -> Vec<Association> {
        let dates = self.detector.detect(normalized, document_id, &self.config);
        let mut associations = associate(&events, &dates, normalized, &self.config);
        score_all(&mut associations, &self.config);
        associations
    }
}

/// Order-preserving map over an owned list, parallel when the `parallel`
/// feature is enabled.
#[cfg(feature = "parallel")]
fn map_ordered<I, O, F>(items: Vec<I>, f: F) -> Vec<O>
where
    I: Send,
    O: Send,
    F: Fn(I) -> O + Send + Sync,
{
    items.into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_ordered<I, O, F>(items: Vec<I>, f: F) -> Vec<O>
where
    F: Fn(I) -> O,
{
    items.into_iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::MockTagger;

    fn record(id: &str, text: &str) -> DocumentRecord {
        DocumentRecord {
            id: DocumentId::new(id),
            text: text.to_string(),
        }
    }

    #[test]
    fn invalid_config_is_fatal_at_construction() {
        let config = PipelineConfig::default().with_confidence_threshold(7.0);
        assert!(Pipeline::with_lexicon(config).is_err());
    }

    #[test]
    fn failed_document_is_isolated_not_fatal() {
        let bad_text = "texte empoisonné";
        let tagger = MockTagger::new().failing_on(bad_text);
        let pipeline = Pipeline::new(
            PipelineConfig::default().with_batch_size(2),
            Box::new(tagger),
        )
        .unwrap();

        let docs = vec![
            record("doc-ok", "Diagnostic le 12/01/2023."),
            record("doc-bad", bad_text),
        ];
        let output = pipeline.run(&docs, &PatientMapping::new());

        assert_eq!(output.report.success_count, 1);
        assert_eq!(output.report.failure_count, 1);
        assert_eq!(output.report.failures[0].document_id, DocumentId::new("doc-bad"));
        // doc-ok survived even though it shared a batch with the poison
        assert_eq!(output.documents.len(), 1);
        assert_eq!(output.documents[0].document_id, DocumentId::new("doc-ok"));
    }

    #[test]
    fn fully_failed_patient_gets_no_data_timeline() {
        let bad_text = "illisible";
        let tagger = MockTagger::new().failing_on(bad_text);
        let pipeline =
            Pipeline::new(PipelineConfig::default(), Box::new(tagger)).unwrap();

        let mapping: PatientMapping =
            [(DocumentId::new("doc-bad"), PatientId::new("patient-x"))]
                .into_iter()
                .collect();
        let output = pipeline.run(&[record("doc-bad", bad_text)], &mapping);

        assert_eq!(output.timelines.len(), 1);
        let timeline = &output.timelines[0];
        assert_eq!(timeline.patient_id, PatientId::new("patient-x"));
        assert_eq!(timeline.status, frise_core::TimelineStatus::NoData);
        assert!(timeline.entries.is_empty());
    }

    #[test]
    fn unmapped_documents_form_singleton_patients() {
        let pipeline = Pipeline::with_lexicon(PipelineConfig::default()).unwrap();
        let docs = vec![
            record("doc-1", "Traitement le 01/02/2023."),
            record("doc-2", "Suivi le 03/04/2023."),
        ];
        let output = pipeline.run(&docs, &PatientMapping::new());
        let patients: Vec<&str> = output
            .timelines
            .iter()
            .map(|t| t.patient_id.as_str())
            .collect();
        assert_eq!(patients, vec!["doc-1", "doc-2"]);
    }

    #[test]
    fn run_is_deterministic() {
        let pipeline = Pipeline::with_lexicon(
            PipelineConfig::default().with_worker_count(3).with_batch_size(1),
        )
        .unwrap();
        let docs = vec![
            record("a", "Diagnostic le 12/01/2023. Chimiothérapie depuis mars 2023."),
            record("b", "Récidive trois jours après. Contrôle en janvier 2024."),
            record("c", "Suivi le 05/05/2022 chez le Dr. Martin."),
        ];
        let mapping: PatientMapping = [
            (DocumentId::new("a"), PatientId::new("p1")),
            (DocumentId::new("b"), PatientId::new("p1")),
        ]
        .into_iter()
        .collect();

        let first = pipeline.run(&docs, &mapping);
        let second = pipeline.run(&docs, &mapping);
        assert_eq!(first, second);
    }
}
