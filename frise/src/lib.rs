//! # frise
//!
//! Clinical timeline extraction for French-language medical documents.
//!
//! frise locates dates and clinical events (diagnosis, treatment,
//! complication, follow-up) in free text, associates each event with the
//! date it most plausibly occurred on, and aggregates per-document
//! associations into a deduplicated, chronologically ordered per-patient
//! timeline with confidence scores.
//!
//! # Pipeline
//!
//! ```text
//! normalized text ──► DateDetector ────────┐
//!                 ──► EventClassifier ─────┼─► associate ─► score ─┐
//!                     (black-box tagger)   │   (per document)      │
//!                                          │                       ▼
//!                     per patient ◄────────┴──────────────── aggregate
//! ```
//!
//! Date detection and event classification run independently per document;
//! the associator pairs their outputs by weighted character proximity; the
//! scorer attaches a final confidence and an ambiguity flag; the
//! aggregator merges all of a patient's associations into one timeline.
//! Per-document processing is embarrassingly parallel and batched for the
//! classifier, with per-document failures isolated into a run ledger.
//!
//! # Example
//!
//! ```rust
//! use frise::{Pipeline, PipelineConfig, DocumentRecord, PatientMapping};
//! use frise_core::EventType;
//!
//! let pipeline = Pipeline::with_lexicon(PipelineConfig::default()).unwrap();
//! let documents = vec![DocumentRecord {
//!     id: "consult-2023-01".into(),
//!     text: "Diagnostic de diabète le 12 janvier 2023.".to_string(),
//! }];
//!
//! let output = pipeline.run(&documents, &PatientMapping::new());
//! let timeline = &output.timelines[0];
//! assert_eq!(timeline.entries[0].event_type, EventType::Diagnosis);
//! assert!(!timeline.entries[0].is_ambiguous);
//! ```
//!
//! The classifier backend is a narrow trait ([`EventTagger`]); the bundled
//! [`LexiconTagger`] is a deterministic French trigger lexicon, and tests
//! drive the temporal-reasoning core with [`MockTagger`] — no model
//! weights involved.

#![warn(missing_docs)]

pub mod aggregate;
pub mod associate;
pub mod config;
pub mod detect;
pub mod eval;
pub mod normalize;
pub mod pipeline;
pub mod score;

pub use aggregate::{aggregate as aggregate_patient, string_similarity};
pub use associate::associate;
pub use config::{DateFormat, PipelineConfig};
pub use detect::{
    DateDetector, EventClassifier, EventTagger, LexiconTagger, MockTagger, TagSpan,
};
pub use eval::{evaluate_timelines, EvalCounts, EvalReport, GoldEntry};
pub use normalize::{Normalizer, PreparedDocument};
pub use pipeline::{
    DocumentFailure, DocumentOutput, DocumentRecord, PatientMapping, Pipeline, RunOutput,
    RunReport,
};
pub use score::{proximity_weight, score_all, score_association};

// Re-export the data model so downstream callers need only one crate.
pub use frise_core::{
    Association, Confidence, DateMention, DocumentId, Error, EventMention, EventType,
    Granularity, PartialDate, PatientId, PatientTimeline, RankedDate, RelativeOffset, Result,
    Span, TimelineEntry, TimelineStatus,
};
