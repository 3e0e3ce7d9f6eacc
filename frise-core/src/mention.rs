//! Date and event mentions, plus the document/patient identifiers that
//! thread through the pipeline.

use crate::date::{PartialDate, RelativeOffset};
use crate::span::Span;
use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque identifier for one source document. Owned by upstream ingestion
/// and passed through unchanged.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque identifier grouping a patient's documents.
///
/// Supplied by the external patient-metadata mapping; a document without a
/// mapping forms a singleton patient keyed by its own [`DocumentId`].
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    /// Create a patient id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Singleton-patient fallback: the patient keyed by a document's own id.
    #[must_use]
    pub fn from_document(id: &DocumentId) -> Self {
        Self(id.as_str().to_string())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// Event types
// ============================================================================

/// Clinical event category.
///
/// All event types share identical structure and differ only in the label,
/// so this is a closed tag rather than a type hierarchy. [`EventType::ALL`]
/// fixes the declaration order used for deterministic tie-breaking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EventType {
    /// A diagnosis being established ("diagnostic de diabète").
    Diagnosis,
    /// A treatment being administered or prescribed ("chimiothérapie").
    Treatment,
    /// A complication or adverse evolution ("récidive", "toxicité").
    Complication,
    /// A follow-up or surveillance act ("consultation de contrôle").
    FollowUp,
}

impl EventType {
    /// Every event type, in tie-break order.
    pub const ALL: [EventType; 4] = [
        EventType::Diagnosis,
        EventType::Treatment,
        EventType::Complication,
        EventType::FollowUp,
    ];

    /// Canonical label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::Diagnosis => "Diagnosis",
            EventType::Treatment => "Treatment",
            EventType::Complication => "Complication",
            EventType::FollowUp => "Follow-up",
        }
    }

    /// Position in [`EventType::ALL`], used as a deterministic sort key.
    #[must_use]
    pub fn order_key(&self) -> usize {
        match self {
            EventType::Diagnosis => 0,
            EventType::Treatment => 1,
            EventType::Complication => 2,
            EventType::FollowUp => 3,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "diagnosis" | "diagnostic" => Ok(EventType::Diagnosis),
            "treatment" | "traitement" => Ok(EventType::Treatment),
            "complication" | "complications" => Ok(EventType::Complication),
            "follow-up" | "followup" | "follow_up" | "suivi" => Ok(EventType::FollowUp),
            other => Err(crate::Error::invalid_input(format!(
                "unknown event type: {other:?}"
            ))),
        }
    }
}

// ============================================================================
// Mentions
// ============================================================================

/// One date mention in a document: span, raw surface text, and the parsed
/// calendar value when parsing succeeded.
///
/// Multiple mentions of the same resolved date may coexist in one document
/// (distinct spans). A syntactically matched but uninterpretable date keeps
/// its span with `resolved = None` and `parse_confidence = 0.0` — downstream
/// association needs the span even when the value is unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateMention {
    /// The document this mention was found in.
    pub document_id: DocumentId,
    /// Character span into normalized text.
    pub span: Span,
    /// Surface text as matched.
    pub raw_text: String,
    /// Parsed calendar value; `None` for parse failures and relative forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<PartialDate>,
    /// Offset hint for relative forms ("le lendemain" → +1 day).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_offset: Option<RelativeOffset>,
    /// How confidently the surface form parsed, in [0, 1].
    pub parse_confidence: f64,
}

/// One clinical event mention in a document.
///
/// The classifier is multi-label: one text span may yield several
/// `EventMention`s, one per event type that cleared the emission threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMention {
    /// The document this mention was found in.
    pub document_id: DocumentId,
    /// Character span into normalized text.
    pub span: Span,
    /// Which clinical event category this mention carries.
    pub event_type: EventType,
    /// Surface text as matched.
    pub raw_text: String,
    /// Classifier probability for this (span, type) pair, in [0, 1].
    pub model_confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn event_type_roundtrip() {
        for ty in EventType::ALL {
            assert_eq!(EventType::from_str(ty.as_str()).unwrap(), ty);
        }
        assert_eq!(EventType::from_str("Complications").unwrap(), EventType::Complication);
        assert_eq!(EventType::from_str("suivi").unwrap(), EventType::FollowUp);
        assert!(EventType::from_str("autre").is_err());
    }

    #[test]
    fn event_type_order_matches_all() {
        for (idx, ty) in EventType::ALL.iter().enumerate() {
            assert_eq!(ty.order_key(), idx);
        }
    }

    #[test]
    fn patient_fallback_keys_by_document() {
        let doc = DocumentId::new("doc-17");
        assert_eq!(PatientId::from_document(&doc).as_str(), "doc-17");
    }

    #[test]
    fn ids_serialize_transparent() {
        let doc = DocumentId::new("a");
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#""a""#);
    }
}
