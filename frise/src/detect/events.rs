//! Clinical event span classification.
//!
//! The actual span classifier is a black box behind the [`EventTagger`]
//! trait: a batch of texts goes in, spans with per-type probabilities come
//! out. Everything the pipeline cares about — threshold emission,
//! multi-label expansion, ordering — lives in [`EventClassifier`], so the
//! temporal-association logic downstream can be exercised with synthetic
//! taggers and no model weights.
//!
//! Two taggers ship with the crate:
//!
//! - [`LexiconTagger`]: deterministic French clinical trigger lexicon.
//!   No download, no inference runtime; good enough to run the CLI end to
//!   end and the default backend.
//! - [`MockTagger`]: canned responses keyed by text, for tests. Can be
//!   told to fail on specific documents to exercise failure isolation.

use crate::config::PipelineConfig;
use frise_core::{
    DocumentId, Error, EventMention, EventType, OffsetConverter, Result, Span,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One candidate span with its per-type probabilities, as produced by a
/// tagger backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSpan {
    /// Character span into the text the tagger was given.
    pub span: Span,
    /// Surface text of the span.
    pub raw_text: String,
    /// Probability per event type. Types absent from the list score zero.
    pub scores: Vec<(EventType, f64)>,
}

/// Black-box span classifier interface.
///
/// Batch-first: inference is the one resource-heavy step of the pipeline
/// and is invoked over batches of documents, never per span.
pub trait EventTagger: Send + Sync {
    /// Tag every text in the batch. `result[i]` holds the spans of
    /// `texts[i]`.
    fn tag_batch(&self, texts: &[&str]) -> Result<Vec<Vec<TagSpan>>>;

    /// Event types this tagger can produce.
    fn supported_types(&self) -> Vec<EventType>;

    /// Whether the backend is ready to serve.
    fn is_available(&self) -> bool {
        true
    }

    /// Backend name, for logs and reports.
    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// Threshold-emitting wrapper around an [`EventTagger`].
///
/// One [`EventMention`] is emitted per `(span, event_type)` whose
/// probability clears `confidence_threshold` — a single span may yield
/// several mentions. Output ordering is (span start, span end, event type
/// declaration order), so identical inputs give identical output.
pub struct EventClassifier {
    tagger: Box<dyn EventTagger>,
}

impl EventClassifier {
    /// Wrap a tagger backend.
    #[must_use]
    pub fn new(tagger: Box<dyn EventTagger>) -> Self {
        Self { tagger }
    }

    /// Backend name, for logs and reports.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.tagger.name()
    }

    /// Whether the wrapped backend is ready.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.tagger.is_available()
    }

    /// Classify one document.
    pub fn classify(
        &self,
        text: &str,
        document_id: &DocumentId,
        config: &PipelineConfig,
    ) -> Result<Vec<EventMention>> {
        let mut batch = self.classify_batch(&[(document_id, text)], config)?;
        Ok(batch.pop().unwrap_or_default())
    }

    /// Classify a batch of documents in one tagger invocation.
    pub fn classify_batch(
        &self,
        documents: &[(&DocumentId, &str)],
        config: &PipelineConfig,
    ) -> Result<Vec<Vec<EventMention>>> {
        let texts: Vec<&str> = documents.iter().map(|(_, text)| *text).collect();
        let tagged = self.tagger.tag_batch(&texts)?;
        if tagged.len() != documents.len() {
            return Err(Error::inference(format!(
                "tagger returned {} results for {} texts",
                tagged.len(),
                documents.len()
            )));
        }

        Ok(tagged
            .into_iter()
            .zip(documents)
            .map(|(spans, (document_id, _))| emit(spans, document_id, config))
            .collect())
    }
}

/// Apply the emission threshold and expand multi-label spans.
fn emit(
    spans: Vec<TagSpan>,
    document_id: &DocumentId,
    config: &PipelineConfig,
) -> Vec<EventMention> {
    let mut mentions: Vec<EventMention> = Vec::new();
    for tag in spans {
        for (event_type, probability) in &tag.scores {
            if *probability >= config.confidence_threshold
                && config.event_types.contains(event_type)
            {
                mentions.push(EventMention {
                    document_id: document_id.clone(),
                    span: tag.span,
                    event_type: *event_type,
                    raw_text: tag.raw_text.clone(),
                    model_confidence: *probability,
                });
            }
        }
    }
    mentions.sort_by_key(|m| (m.span.start, m.span.end, m.event_type.order_key()));
    mentions
}

// ============================================================================
// Lexicon tagger
// ============================================================================

/// French clinical trigger vocabulary mapped to event types and weights.
///
/// Triggers are the event-bearing words of clinical prose ("diagnostiqué",
/// "chimiothérapie", "récidive", "consultation de contrôle"), not disease
/// names. Accented and OCR-stripped variants are both listed.
#[derive(Debug, Clone)]
pub struct TriggerLexicon {
    triggers: Vec<(&'static str, EventType, f64)>,
}

impl Default for TriggerLexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerLexicon {
    /// The built-in French clinical lexicon.
    #[must_use]
    pub fn new() -> Self {
        let mut triggers: Vec<(&'static str, EventType, f64)> = Vec::new();

        // === Diagnosis ===
        for word in [
            "diagnostic",
            "diagnostique",
            "diagnostiqué",
            "diagnostiquée",
            "diagnostic posé",
            "diagnostic pose",
            "dépistage",
            "depistage",
            "découverte",
            "decouverte",
            "mise en évidence",
            "mise en evidence",
            "bilan initial",
        ] {
            triggers.push((word, EventType::Diagnosis, 0.85));
        }

        // === Treatment ===
        for word in [
            "traitement",
            "traité",
            "traitée",
            "traite par",
            "chimiothérapie",
            "chimiotherapie",
            "radiothérapie",
            "radiotherapie",
            "immunothérapie",
            "immunotherapie",
            "intervention chirurgicale",
            "chirurgie",
            "opéré",
            "opérée",
            "opere",
            "exérèse",
            "exerese",
            "prescription",
            "prescrit",
            "instauration",
            "perfusion",
            "greffe",
            "cure",
        ] {
            triggers.push((word, EventType::Treatment, 0.85));
        }

        // === Complication ===
        for word in [
            "complication",
            "compliqué",
            "compliquée",
            "récidive",
            "recidive",
            "rechute",
            "aggravation",
            "progression",
            "métastase",
            "metastase",
            "toxicité",
            "toxicite",
            "effet indésirable",
            "effet indesirable",
            "hémorragie",
            "hemorragie",
            "infection",
            "surinfection",
        ] {
            triggers.push((word, EventType::Complication, 0.8));
        }

        // === Follow-up ===
        for word in [
            "suivi",
            "surveillance",
            "contrôle",
            "controle",
            "consultation de contrôle",
            "consultation de controle",
            "réévaluation",
            "reevaluation",
            "bilan de surveillance",
            "revu",
            "revue",
            "rendez-vous",
        ] {
            triggers.push((word, EventType::FollowUp, 0.75));
        }

        // Longest phrase first, so "consultation de contrôle" beats
        // "contrôle" at the same position.
        triggers.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        Self { triggers }
    }

    fn scan(&self, text: &str) -> Vec<TagSpan> {
        let lower = text.to_lowercase();
        // offsets are computed against the lowercased text the search runs
        // on; French lowercasing is one-to-one, so char offsets line up
        // with the original
        let converter = OffsetConverter::new(&lower);
        let mut claimed: Vec<Span> = Vec::new();
        let mut spans: Vec<TagSpan> = Vec::new();

        for (phrase, event_type, weight) in &self.triggers {
            let mut search_from = 0usize;
            while let Some(rel) = lower[search_from..].find(phrase) {
                let byte_start = search_from + rel;
                let byte_end = byte_start + phrase.len();
                search_from = byte_end;

                if !word_bounded(&lower, byte_start, byte_end) {
                    continue;
                }
                let span = Span::new(
                    converter.byte_to_char(byte_start),
                    converter.byte_to_char(byte_end),
                );
                if claimed.iter().any(|c| c.overlaps(&span)) {
                    continue;
                }
                claimed.push(span);
                let raw: String = text
                    .chars()
                    .skip(span.start)
                    .take(span.len())
                    .collect();
                spans.push(TagSpan {
                    span,
                    raw_text: raw,
                    scores: vec![(*event_type, *weight)],
                });
            }
        }
        spans.sort_by_key(|t| (t.span.start, t.span.end));
        spans
    }
}

/// Lowercasing French text never changes its byte length for the
/// characters we match, but check boundaries on byte positions anyway.
fn word_bounded(lower: &str, start: usize, end: usize) -> bool {
    let before = lower[..start].chars().next_back();
    let after = lower[end..].chars().next();
    before.map_or(true, |c| !c.is_alphanumeric())
        && after.map_or(true, |c| !c.is_alphanumeric())
}

/// Deterministic lexicon-driven tagger.
#[derive(Debug, Clone, Default)]
pub struct LexiconTagger {
    lexicon: TriggerLexicon,
}

impl LexiconTagger {
    /// Create a tagger over the built-in lexicon.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventTagger for LexiconTagger {
    fn tag_batch(&self, texts: &[&str]) -> Result<Vec<Vec<TagSpan>>> {
        Ok(texts.iter().map(|text| self.lexicon.scan(text)).collect())
    }

    fn supported_types(&self) -> Vec<EventType> {
        EventType::ALL.to_vec()
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

// ============================================================================
// Mock tagger (tests and synthetic pipelines)
// ============================================================================

/// Programmable tagger for tests: canned spans keyed by exact text, plus an
/// optional failure set to exercise per-document isolation.
#[derive(Debug, Clone, Default)]
pub struct MockTagger {
    responses: HashMap<String, Vec<TagSpan>>,
    fail_on: HashSet<String>,
}

impl MockTagger {
    /// Empty mock: every text tags to no spans.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `text` with `spans`.
    #[must_use]
    pub fn with_response(mut self, text: impl Into<String>, spans: Vec<TagSpan>) -> Self {
        self.responses.insert(text.into(), spans);
        self
    }

    /// Fail the whole batch whenever it contains `text`.
    #[must_use]
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.fail_on.insert(text.into());
        self
    }
}

impl EventTagger for MockTagger {
    fn tag_batch(&self, texts: &[&str]) -> Result<Vec<Vec<TagSpan>>> {
        for text in texts {
            if self.fail_on.contains(*text) {
                return Err(Error::inference("mock tagger configured to fail"));
            }
        }
        Ok(texts
            .iter()
            .map(|text| self.responses.get(*text).cloned().unwrap_or_default())
            .collect())
    }

    fn supported_types(&self) -> Vec<EventType> {
        EventType::ALL.to_vec()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
