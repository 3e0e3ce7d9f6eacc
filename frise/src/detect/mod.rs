//! Per-document detectors: dates by pattern, clinical events by classifier.

pub mod dates;
pub mod events;

pub use dates::DateDetector;
pub use events::{EventClassifier, EventTagger, LexiconTagger, MockTagger, TagSpan, TriggerLexicon};
