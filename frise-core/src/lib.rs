//! # frise-core
//!
//! Core data model for clinical timeline extraction from French medical
//! documents.
//!
//! Everything here is plain data: character spans, partial calendar dates,
//! date/event mentions, event-date associations, and patient timeline
//! entries. The detection, association, and aggregation logic lives in the
//! `frise` crate; this crate only defines what flows between those stages.
//!
//! # Lifecycle
//!
//! ```text
//! DateMention  ─┐
//!               ├─► Association ──► TimelineEntry
//! EventMention ─┘      │
//!                      └─ final_confidence / is_ambiguous filled by the
//!                         scorer; everything else is immutable once built
//! ```
//!
//! All offsets are **character** offsets into normalized document text, not
//! byte offsets. Use [`OffsetConverter`] to translate byte offsets produced
//! by regex matching.

#![warn(missing_docs)]

pub mod association;
pub mod confidence;
pub mod date;
pub mod error;
pub mod mention;
pub mod span;
pub mod timeline;

pub use association::{Association, RankedDate};
pub use confidence::Confidence;
pub use date::{Granularity, PartialDate, RelativeOffset};
pub use error::{Error, Result};
pub use mention::{DateMention, DocumentId, EventMention, EventType, PatientId};
pub use span::{OffsetConverter, Span};
pub use timeline::{PatientTimeline, TimelineEntry, TimelineStatus};
