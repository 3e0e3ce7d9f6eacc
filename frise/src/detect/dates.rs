//! Date detection for French medical text.
//!
//! Extracts every date mention with its character span and parsed calendar
//! value. Pattern-detectable by design: no model involved, only compiled
//! regex families selected by the configuration. Overlapping candidates are
//! resolved by longest span, then most specific granularity (day > month >
//! year) — never dropped silently.
//!
//! A pattern that matches but fails calendar validation ("31/02/2023")
//! keeps its mention with `resolved = None` and `parse_confidence = 0.0`:
//! association needs the span even when the value is unusable.

use crate::config::{DateFormat, PipelineConfig};
use frise_core::{DateMention, DocumentId, OffsetConverter, PartialDate, RelativeOffset, Span};
use once_cell::sync::Lazy;
use regex::Regex;

// Static regex patterns - compiled once, reused forever
static NUMERIC_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{2,4})\b").expect("valid regex"));

static ISO_YMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid regex"));

const MONTHS: &str = "janvier|février|fevrier|mars|avril|mai|juin|juillet|août|aout|septembre|octobre|novembre|décembre|decembre";

static TEXTUAL_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(1er|\d{{1,2}})\s+({MONTHS})(?:\s+(\d{{4}}))?\b"
    ))
    .expect("valid regex")
});

static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\b({MONTHS})\s+(\d{{4}})\b")).expect("valid regex"));

static YEAR_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("valid regex"));

static RELATIVE_FIXED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:le\s+lendemain|le\s+surlendemain|la\s+veille|l'avant[-\s]veille)\b")
        .expect("valid regex")
});

static RELATIVE_COUNTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(un|une|deux|trois|quatre|cinq|six|sept|huit|neuf|dix|\d{1,3})\s+(jours?|semaines?|mois)\s+(après|apres|avant|plus\s+tard|plus\s+tôt|plus\s+tot)\b",
    )
    .expect("valid regex")
});

/// Plausible calendar years for clinical records. Anything outside is a
/// parse failure, not a date.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2099;

/// Regex-based date detector.
///
/// Stateless; the active pattern families come from the
/// [`PipelineConfig::date_formats`] list.
///
/// # Example
///
/// ```rust
/// use frise::{DateDetector, PipelineConfig};
/// use frise_core::{DocumentId, PartialDate};
///
/// let detector = DateDetector::new();
/// let config = PipelineConfig::default();
/// let doc = DocumentId::new("d1");
/// let mentions = detector.detect("Diagnostic le 12 janvier 2023.", &doc, &config);
///
/// assert_eq!(mentions.len(), 1);
/// assert_eq!(mentions[0].resolved, PartialDate::from_ymd(2023, 1, 12));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DateDetector;

/// Candidate match before overlap resolution. `specificity` ranks the
/// surface form: 3 day-level, 2 month-level, 1 year-level, 0 relative.
struct Candidate {
    span: Span,
    raw: String,
    resolved: Option<PartialDate>,
    relative: Option<RelativeOffset>,
    parse_confidence: f64,
    specificity: u8,
}

impl DateDetector {
    /// Create a new detector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Detect all date mentions in `text`, ordered by span start.
    #[must_use]
    pub fn detect(
        &self,
        text: &str,
        document_id: &DocumentId,
        config: &PipelineConfig,
    ) -> Vec<DateMention> {
        let converter = OffsetConverter::new(text);
        let mut candidates: Vec<Candidate> = Vec::new();

        for family in &config.date_formats {
            match family {
                DateFormat::NumericDayFirst => collect_numeric_dmy(text, &converter, &mut candidates),
                DateFormat::Iso => collect_iso(text, &converter, &mut candidates),
                DateFormat::TextualDay => collect_textual_day(text, &converter, &mut candidates),
                DateFormat::MonthYear => collect_month_year(text, &converter, &mut candidates),
                DateFormat::YearOnly => collect_year_only(text, &converter, &mut candidates),
                DateFormat::Relative => collect_relative(text, &converter, &mut candidates),
            }
        }

        // Overlap policy: longest span first, then most specific form,
        // then earliest start. A candidate overlapping a kept one loses.
        candidates.sort_by(|a, b| {
            b.span
                .len()
                .cmp(&a.span.len())
                .then(b.specificity.cmp(&a.specificity))
                .then(a.span.start.cmp(&b.span.start))
        });
        let mut kept: Vec<Candidate> = Vec::new();
        for cand in candidates {
            if !kept.iter().any(|k| k.span.overlaps(&cand.span)) {
                kept.push(cand);
            }
        }
        kept.sort_by_key(|c| (c.span.start, c.span.end));

        kept.into_iter()
            .map(|c| DateMention {
                document_id: document_id.clone(),
                span: c.span,
                raw_text: c.raw,
                resolved: c.resolved,
                relative_offset: c.relative,
                parse_confidence: c.parse_confidence,
            })
            .collect()
    }
}

fn char_span(m: &regex::Match<'_>, converter: &OffsetConverter) -> Span {
    Span::new(
        converter.byte_to_char(m.start()),
        converter.byte_to_char(m.end()),
    )
}

fn collect_numeric_dmy(text: &str, converter: &OffsetConverter, out: &mut Vec<Candidate>) {
    for caps in NUMERIC_DMY.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let year_raw = &caps[3];
        let (year, year_conf) = match year_raw.len() {
            4 => (year_raw.parse::<i32>().unwrap_or(0), 1.0),
            // two-digit years pivot at 30: 23 → 2023, 87 → 1987
            2 => {
                let yy = year_raw.parse::<i32>().unwrap_or(0);
                (if yy <= 30 { 2000 + yy } else { 1900 + yy }, 0.9)
            }
            _ => (0, 0.0),
        };
        let resolved = if YEAR_RANGE.contains(&year) {
            PartialDate::from_ymd(year, month, day)
        } else {
            None
        };
        let parse_confidence = if resolved.is_some() { year_conf } else { 0.0 };
        out.push(Candidate {
            span: char_span(&whole, converter),
            raw: whole.as_str().to_string(),
            resolved,
            relative: None,
            parse_confidence,
            specificity: 3,
        });
    }
}

fn collect_iso(text: &str, converter: &OffsetConverter, out: &mut Vec<Candidate>) {
    for caps in ISO_YMD.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        let year: i32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        let resolved = if YEAR_RANGE.contains(&year) {
            PartialDate::from_ymd(year, month, day)
        } else {
            None
        };
        let parse_confidence = if resolved.is_some() { 1.0 } else { 0.0 };
        out.push(Candidate {
            span: char_span(&whole, converter),
            raw: whole.as_str().to_string(),
            resolved,
            relative: None,
            parse_confidence,
            specificity: 3,
        });
    }
}

fn collect_textual_day(text: &str, converter: &OffsetConverter, out: &mut Vec<Candidate>) {
    for caps in TEXTUAL_DAY.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        let day_raw = &caps[1];
        let day: u32 = if day_raw.eq_ignore_ascii_case("1er") {
            1
        } else {
            day_raw.parse().unwrap_or(0)
        };
        let month = month_number(&caps[2]);
        // year is optional in the pattern; "le 12 janvier" alone cannot
        // resolve and is kept as a parse failure
        let resolved = match (caps.get(3), month) {
            (Some(y), Some(m)) => {
                let year: i32 = y.as_str().parse().unwrap_or(0);
                if YEAR_RANGE.contains(&year) {
                    PartialDate::from_ymd(year, m, day)
                } else {
                    None
                }
            }
            _ => None,
        };
        let parse_confidence = if resolved.is_some() { 1.0 } else { 0.0 };
        out.push(Candidate {
            span: char_span(&whole, converter),
            raw: whole.as_str().to_string(),
            resolved,
            relative: None,
            parse_confidence,
            specificity: 3,
        });
    }
}

fn collect_month_year(text: &str, converter: &OffsetConverter, out: &mut Vec<Candidate>) {
    for caps in MONTH_YEAR.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        let month = month_number(&caps[1]);
        let year: i32 = caps[2].parse().unwrap_or(0);
        let resolved = match month {
            Some(m) if YEAR_RANGE.contains(&year) => PartialDate::year_month(year, m),
            _ => None,
        };
        let parse_confidence = if resolved.is_some() { 0.9 } else { 0.0 };
        out.push(Candidate {
            span: char_span(&whole, converter),
            raw: whole.as_str().to_string(),
            resolved,
            relative: None,
            parse_confidence,
            specificity: 2,
        });
    }
}

fn collect_year_only(text: &str, converter: &OffsetConverter, out: &mut Vec<Candidate>) {
    for m in YEAR_ONLY.find_iter(text) {
        let year: i32 = m.as_str().parse().unwrap_or(0);
        out.push(Candidate {
            span: char_span(&m, converter),
            raw: m.as_str().to_string(),
            resolved: Some(PartialDate::year(year)),
            relative: None,
            parse_confidence: 0.8,
            specificity: 1,
        });
    }
}

fn collect_relative(text: &str, converter: &OffsetConverter, out: &mut Vec<Candidate>) {
    for m in RELATIVE_FIXED.find_iter(text) {
        let lower = m.as_str().to_lowercase();
        let days = if lower.contains("surlendemain") {
            2
        } else if lower.contains("lendemain") {
            1
        } else if lower.contains("avant") {
            -2
        } else {
            -1 // la veille
        };
        out.push(relative_candidate(&m, converter, days));
    }

    for caps in RELATIVE_COUNTED.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        let count = number_word(&caps[1]);
        let unit_days = match caps[2].to_lowercase().as_str() {
            s if s.starts_with("jour") => 1,
            s if s.starts_with("semaine") => 7,
            _ => 30, // mois
        };
        let direction = match caps[3].to_lowercase().as_str() {
            s if s.starts_with("avant") || s.contains("tôt") || s.contains("tot") => -1,
            _ => 1,
        };
        out.push(relative_candidate(
            &whole,
            converter,
            count * unit_days * direction,
        ));
    }
}

fn relative_candidate(m: &regex::Match<'_>, converter: &OffsetConverter, days: i64) -> Candidate {
    Candidate {
        span: char_span(m, converter),
        raw: m.as_str().to_string(),
        resolved: None,
        relative: Some(RelativeOffset::days(days)),
        parse_confidence: 0.5,
        specificity: 0,
    }
}

fn month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "janvier" => Some(1),
        "février" | "fevrier" => Some(2),
        "mars" => Some(3),
        "avril" => Some(4),
        "mai" => Some(5),
        "juin" => Some(6),
        "juillet" => Some(7),
        "août" | "aout" => Some(8),
        "septembre" => Some(9),
        "octobre" => Some(10),
        "novembre" => Some(11),
        "décembre" | "decembre" => Some(12),
        _ => None,
    }
}

fn number_word(word: &str) -> i64 {
    match word.to_lowercase().as_str() {
        "un" | "une" => 1,
        "deux" => 2,
        "trois" => 3,
        "quatre" => 4,
        "cinq" => 5,
        "six" => 6,
        "sept" => 7,
        "huit" => 8,
        "neuf" => 9,
        "dix" => 10,
        digits => digits.parse().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frise_core::Granularity;

    fn detect(text: &str) -> Vec<DateMention> {
        DateDetector::new().detect(text, &DocumentId::new("d1"), &PipelineConfig::default())
    }

    #[test]
    fn numeric_day_first() {
        let mentions = detect("Patient opéré le 12/01/2023 au CHU.");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].resolved, PartialDate::from_ymd(2023, 1, 12));
        assert_eq!(mentions[0].parse_confidence, 1.0);
        assert_eq!(mentions[0].raw_text, "12/01/2023");
    }

    #[test]
    fn numeric_two_digit_year_pivots() {
        let mentions = detect("vu le 05/06/98");
        assert_eq!(mentions[0].resolved, PartialDate::from_ymd(1998, 6, 5));
        assert_eq!(mentions[0].parse_confidence, 0.9);

        let mentions = detect("vu le 05/06/21");
        assert_eq!(mentions[0].resolved, PartialDate::from_ymd(2021, 6, 5));
    }

    #[test]
    fn iso_form() {
        let mentions = detect("Compte rendu du 2023-01-12.");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].resolved, PartialDate::from_ymd(2023, 1, 12));
    }

    #[test]
    fn textual_full_date() {
        let mentions = detect("Diagnostic de diabète le 12 janvier 2023");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].resolved, PartialDate::from_ymd(2023, 1, 12));
        assert_eq!(mentions[0].raw_text, "12 janvier 2023");
    }

    #[test]
    fn textual_premier() {
        let mentions = detect("hospitalisé le 1er août 2022");
        assert_eq!(mentions[0].resolved, PartialDate::from_ymd(2022, 8, 1));
    }

    #[test]
    fn textual_without_year_is_soft_failure() {
        let mentions = detect("revu le 12 janvier en consultation");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].resolved, None);
        assert_eq!(mentions[0].parse_confidence, 0.0);
        assert_eq!(mentions[0].raw_text, "12 janvier");
    }

    #[test]
    fn month_year_partial() {
        let mentions = detect("chimiothérapie depuis janvier 2023");
        assert_eq!(mentions.len(), 1);
        let resolved = mentions[0].resolved.unwrap();
        assert_eq!(resolved.granularity(), Granularity::Month);
        assert_eq!(resolved, PartialDate::year_month(2023, 1).unwrap());
    }

    #[test]
    fn year_only_partial() {
        let mentions = detect("antécédent d'infarctus en 2019");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].resolved, Some(PartialDate::year(2019)));
        assert_eq!(mentions[0].parse_confidence, 0.8);
    }

    #[test]
    fn overlap_prefers_longest_then_most_specific() {
        // "12 janvier 2023" also matches month-year ("janvier 2023") and
        // year-only ("2023"); only the full form survives
        let mentions = detect("le 12 janvier 2023");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].raw_text, "12 janvier 2023");

        let mentions = detect("en janvier 2023");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].raw_text, "janvier 2023");
    }

    #[test]
    fn invalid_calendar_date_kept_with_zero_confidence() {
        let mentions = detect("document daté du 31/02/2023");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].resolved, None);
        assert_eq!(mentions[0].parse_confidence, 0.0);
        assert_eq!(mentions[0].raw_text, "31/02/2023");
    }

    #[test]
    fn relative_forms_keep_offset_hint() {
        let mentions = detect("Transfusion le lendemain de l'intervention.");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].resolved, None);
        assert_eq!(mentions[0].relative_offset, Some(RelativeOffset::days(1)));
        assert_eq!(mentions[0].parse_confidence, 0.5);

        let mentions = detect("récidive trois jours après");
        assert_eq!(mentions[0].relative_offset, Some(RelativeOffset::days(3)));

        let mentions = detect("consultation deux semaines avant");
        assert_eq!(mentions[0].relative_offset, Some(RelativeOffset::days(-14)));

        let mentions = detect("contrôle la veille");
        assert_eq!(mentions[0].relative_offset, Some(RelativeOffset::days(-1)));
    }

    #[test]
    fn multiple_mentions_same_date_coexist() {
        let mentions = detect("Vu le 12/01/2023. Compte rendu du 12/01/2023.");
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].resolved, mentions[1].resolved);
        assert_ne!(mentions[0].span, mentions[1].span);
    }

    #[test]
    fn output_ordered_by_span_start() {
        let mentions = detect("suivi en 2021 puis le 03/04/2022 et enfin janvier 2023");
        let starts: Vec<usize> = mentions.iter().map(|m| m.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert_eq!(mentions.len(), 3);
    }

    #[test]
    fn spans_are_char_offsets() {
        let text = "opéré le 12/01/2023";
        let mentions = detect(text);
        let m = &mentions[0];
        assert_eq!(m.span.start, 9);
        assert_eq!(m.span.end, 19);
        let by_chars: String = text
            .chars()
            .skip(m.span.start)
            .take(m.span.len())
            .collect();
        assert_eq!(by_chars, m.raw_text);
    }

    #[test]
    fn disabled_family_does_not_run() {
        let config = PipelineConfig {
            date_formats: vec![DateFormat::Iso],
            ..PipelineConfig::default()
        };
        let mentions =
            DateDetector::new().detect("le 12 janvier 2023", &DocumentId::new("d1"), &config);
        assert!(mentions.is_empty());
    }
}
