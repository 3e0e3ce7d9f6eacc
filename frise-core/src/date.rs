//! Partial calendar dates and relative-date offsets.
//!
//! French medical documents mention dates at every granularity: a full
//! "12 janvier 2023", a bare "janvier 2023" in an anamnesis, or just "2019"
//! in a history paragraph. A [`PartialDate`] keeps whatever the text
//! actually committed to; aggregation later merges a partial date into a
//! full one when they are consistent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Granularity of a [`PartialDate`], ordered coarsest to finest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Granularity {
    /// Year only ("2023").
    Year,
    /// Year and month ("janvier 2023").
    Month,
    /// Full calendar date ("12 janvier 2023").
    Day,
}

/// A calendar date that may be partial: year-only or year-month.
///
/// Invariant: `day` is only present when `month` is; day-level values are
/// calendar-validated at construction (no "31 février").
///
/// # Example
///
/// ```rust
/// use frise_core::{Granularity, PartialDate};
///
/// let full = PartialDate::from_ymd(2023, 1, 12).unwrap();
/// let month = PartialDate::year_month(2023, 1).unwrap();
/// let year = PartialDate::year(2023);
///
/// assert_eq!(full.granularity(), Granularity::Day);
/// assert!(full.is_refinement_of(&month));
/// assert!(month.is_refinement_of(&year));
/// assert!(!full.is_refinement_of(&PartialDate::year(2024)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialDate {
    /// Calendar year.
    pub year: i32,
    /// Month 1-12, when the text commits to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    /// Day of month, when the text commits to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl PartialDate {
    /// A year-only date.
    #[must_use]
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    /// A year-month date. Returns `None` when `month` is not 1-12.
    #[must_use]
    pub fn year_month(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self {
                year,
                month: Some(month),
                day: None,
            })
        } else {
            None
        }
    }

    /// A full date, calendar-validated. Returns `None` for impossible
    /// combinations such as `(2023, 2, 31)`.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self {
            year,
            month: Some(month),
            day: Some(day),
        })
    }

    /// Granularity of this value.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        match (self.month, self.day) {
            (Some(_), Some(_)) => Granularity::Day,
            (Some(_), None) => Granularity::Month,
            _ => Granularity::Year,
        }
    }

    /// True when `self` is at least as specific as `other` and agrees with
    /// every field `other` commits to.
    ///
    /// A date is a refinement of itself.
    #[must_use]
    pub fn is_refinement_of(&self, other: &PartialDate) -> bool {
        if self.granularity() < other.granularity() || self.year != other.year {
            return false;
        }
        if let Some(m) = other.month {
            if self.month != Some(m) {
                return false;
            }
            if let Some(d) = other.day {
                if self.day != Some(d) {
                    return false;
                }
            }
        }
        true
    }

    /// True when one of the two dates refines the other, i.e. they can
    /// describe the same calendar moment.
    #[must_use]
    pub fn is_compatible_with(&self, other: &PartialDate) -> bool {
        self.is_refinement_of(other) || other.is_refinement_of(self)
    }

    /// The more specific of two compatible dates (`self` on equal
    /// granularity).
    #[must_use]
    pub fn most_specific(self, other: PartialDate) -> PartialDate {
        if other.granularity() > self.granularity() {
            other
        } else {
            self
        }
    }

    /// Sort key for chronological ordering: `(year, month→0, day→0)`, so a
    /// year-only entry sorts before day-level entries of the same year.
    #[must_use]
    pub fn sort_key(&self) -> (i32, u32, u32) {
        (self.year, self.month.unwrap_or(0), self.day.unwrap_or(0))
    }
}

impl std::fmt::Display for PartialDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.month, self.day) {
            (Some(m), Some(d)) => write!(f, "{:04}-{:02}-{:02}", self.year, m, d),
            (Some(m), None) => write!(f, "{:04}-{:02}", self.year, m),
            _ => write!(f, "{:04}", self.year),
        }
    }
}

/// Offset hint carried by a relative date form.
///
/// Relative forms ("le lendemain", "trois jours après") never resolve to an
/// absolute date in this crate; the mention keeps its span plus this hint
/// for downstream consumers that know the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelativeOffset {
    /// Signed offset in days from the (unknown) reference date.
    pub days: i64,
}

impl RelativeOffset {
    /// Create an offset of `days` days.
    #[must_use]
    pub fn days(days: i64) -> Self {
        Self { days }
    }
}
