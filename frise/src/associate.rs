//! Temporal association: pairing each event mention with the date it most
//! plausibly occurred on.
//!
//! This is the step that turns two independent, spatially-unaligned
//! detection streams (dates and events) into a coherent per-document
//! structure. For every event, every date in the document is scored by a
//! weighted character distance:
//!
//! ```text
//! score = |midpoint(event) - midpoint(date)|
//!         × directional weight        (date before vs. after the event)
//!         × cue bonus (< 1)           ("le", "en date du", "depuis" linking
//!                                      the spans within one sentence)
//!         × sentence penalty (>= 1)   (a sentence boundary between them)
//! ```
//!
//! The minimum-score date wins; candidates within `tie_epsilon` of the
//! minimum are tied and broken by higher parse confidence, then earlier
//! span start. Identical inputs always produce identical selections and
//! ordering: only stable sorts, no unordered-container iteration.

use crate::config::PipelineConfig;
use frise_core::{Association, DateMention, EventMention, RankedDate, Span};
use std::cmp::Ordering;

/// Tokens that end a sentence only when they end an abbreviation we know.
const ABBREVIATIONS: &[&str] = &[
    "dr", "pr", "m", "mme", "mlle", "st", "ste", "env", "cf", "ex",
];

/// Build exactly one [`Association`] per event mention.
///
/// `date = None` (with a `+∞` distance sentinel) only when `dates` is
/// empty. Confidence and ambiguity fields are left at their zero values
/// for the scorer to fill.
#[must_use]
pub fn associate(
    events: &[EventMention],
    dates: &[DateMention],
    text: &str,
    config: &PipelineConfig,
) -> Vec<Association> {
    let chars: Vec<char> = text.chars().collect();
    let boundaries = sentence_boundaries(&chars);

    events
        .iter()
        .map(|event| associate_one(event, dates, &chars, &boundaries, config))
        .collect()
}

fn associate_one(
    event: &EventMention,
    dates: &[DateMention],
    chars: &[char],
    boundaries: &[usize],
    config: &PipelineConfig,
) -> Association {
    if dates.is_empty() {
        return Association {
            event: event.clone(),
            date: None,
            distance_score: f64::INFINITY,
            final_confidence: 0.0,
            is_ambiguous: false,
            alternatives: Vec::new(),
        };
    }

    // Rank every candidate by ascending weighted distance; span start keeps
    // equal scores in a stable, position-determined order.
    let mut ranked: Vec<(usize, f64)> = dates
        .iter()
        .enumerate()
        .map(|(idx, date)| {
            (
                idx,
                weighted_distance(event, date, chars, boundaries, config),
            )
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| dates[a.0].span.start.cmp(&dates[b.0].span.start))
    });

    let min_score = ranked[0].1;
    let tied: Vec<usize> = ranked
        .iter()
        .take_while(|(_, score)| score - min_score <= config.tie_epsilon)
        .map(|(idx, _)| *idx)
        .collect();

    // Ties within epsilon: higher parse confidence wins, then earlier span.
    let chosen_idx = tied
        .iter()
        .copied()
        .min_by(|&a, &b| {
            dates[b]
                .parse_confidence
                .partial_cmp(&dates[a].parse_confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| dates[a].span.start.cmp(&dates[b].span.start))
        })
        .expect("tied set contains at least the minimum");

    let chosen_score = ranked
        .iter()
        .find(|(idx, _)| *idx == chosen_idx)
        .map(|(_, score)| *score)
        .expect("chosen index is ranked");

    let alternatives: Vec<RankedDate> = ranked
        .iter()
        .filter(|(idx, _)| *idx != chosen_idx)
        .map(|(idx, score)| RankedDate {
            date: dates[*idx].clone(),
            distance_score: *score,
        })
        .collect();

    Association {
        event: event.clone(),
        date: Some(dates[chosen_idx].clone()),
        distance_score: chosen_score,
        final_confidence: 0.0,
        is_ambiguous: false,
        alternatives,
    }
}

/// Weighted character distance between an event and a candidate date.
fn weighted_distance(
    event: &EventMention,
    date: &DateMention,
    chars: &[char],
    boundaries: &[usize],
    config: &PipelineConfig,
) -> f64 {
    let raw = (event.span.midpoint() - date.span.midpoint()).abs();
    let directional = if date.span.midpoint() < event.span.midpoint() {
        config.date_before_event_weight
    } else {
        config.date_after_event_weight
    };
    let crossings = boundaries_between(boundaries, &event.span, &date.span);
    let sentence = if crossings > 0 {
        config.sentence_boundary_penalty
    } else {
        1.0
    };
    let cue = if crossings == 0
        && cue_links(chars, &event.span, &date.span, &config.linguistic_cues)
    {
        config.linguistic_cue_bonus
    } else {
        1.0
    };
    raw * directional * sentence * cue
}

/// Character offsets that end a sentence: terminal punctuation followed by
/// whitespace and an uppercase letter or digit (with a French abbreviation
/// guard), newlines, and end-of-text punctuation.
pub(crate) fn sentence_boundaries(chars: &[char]) -> Vec<usize> {
    let mut boundaries = Vec::new();
    for (idx, &ch) in chars.iter().enumerate() {
        if ch == '\n' {
            boundaries.push(idx);
            continue;
        }
        if ch != '.' && ch != '!' && ch != '?' {
            continue;
        }
        let mut next = idx + 1;
        let mut saw_space = false;
        while next < chars.len() && chars[next] == ' ' {
            saw_space = true;
            next += 1;
        }
        if next >= chars.len() {
            boundaries.push(idx);
            continue;
        }
        if saw_space && (chars[next].is_uppercase() || chars[next].is_ascii_digit()) {
            if ch == '.' && ends_abbreviation(chars, idx) {
                continue;
            }
            boundaries.push(idx);
        }
    }
    boundaries
}

/// True when the word immediately before the period at `dot` is a known
/// abbreviation ("Dr.", "Mme.", "env.").
fn ends_abbreviation(chars: &[char], dot: usize) -> bool {
    let mut start = dot;
    while start > 0 && chars[start - 1].is_alphabetic() {
        start -= 1;
    }
    if start == dot {
        return false;
    }
    let word: String = chars[start..dot].iter().collect::<String>().to_lowercase();
    ABBREVIATIONS.contains(&word.as_str())
}

/// Count sentence boundaries strictly between two spans.
fn boundaries_between(boundaries: &[usize], a: &Span, b: &Span) -> usize {
    let gap_start = a.end.min(b.end);
    let gap_end = a.start.max(b.start);
    if gap_start >= gap_end {
        return 0; // overlapping or adjacent spans share a sentence
    }
    boundaries
        .iter()
        .filter(|&&idx| idx >= gap_start && idx < gap_end)
        .count()
}

/// True when a configured cue token appears as a whole word in the gap
/// between the two spans.
fn cue_links(chars: &[char], a: &Span, b: &Span, cues: &[String]) -> bool {
    let gap_start = a.end.min(b.end);
    let gap_end = a.start.max(b.start);
    if gap_start >= gap_end {
        return false;
    }
    let gap: String = chars[gap_start..gap_end]
        .iter()
        .collect::<String>()
        .to_lowercase();
    cues.iter()
        .any(|cue| contains_whole_word(&gap, &cue.to_lowercase()))
}

fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let h: Vec<char> = haystack.chars().collect();
    let n: Vec<char> = needle.chars().collect();
    if n.len() > h.len() {
        return false;
    }
    for start in 0..=(h.len() - n.len()) {
        if h[start..start + n.len()] == n[..] {
            let before_ok = start == 0 || !h[start - 1].is_alphanumeric();
            let after_ok =
                start + n.len() == h.len() || !h[start + n.len()].is_alphanumeric();
            if before_ok && after_ok {
                return true;
            }
        }
    }
    false
}
