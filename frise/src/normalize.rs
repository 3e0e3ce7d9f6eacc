//! Text normalization for OCR'd French medical documents.
//!
//! Upstream OCR leaves artifacts that break span-based detection: runs of
//! spaces where columns were, exotic Unicode spaces and dashes, soft
//! hyphens splitting words, stray control characters. The normalizer cleans
//! these while preserving French accents — detectors and every downstream
//! span operate on the text this module produces.

use std::collections::HashMap;

/// Prepared document text with metadata about what was cleaned.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// The cleaned text.
    pub text: String,
    /// Counters for each cleaning step that fired.
    pub metadata: HashMap<String, String>,
}

/// Document normalizer for OCR'd French text.
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Collapse whitespace runs and normalize line breaks.
    pub clean_whitespace: bool,
    /// Map exotic Unicode spaces/dashes/quotes to ASCII equivalents.
    pub normalize_unicode: bool,
    /// Remove soft hyphens and control characters.
    pub strip_artifacts: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            clean_whitespace: true,
            normalize_unicode: true,
            strip_artifacts: true,
        }
    }
}

impl Normalizer {
    /// Create a normalizer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare text for detection.
    #[must_use]
    pub fn prepare(&self, text: &str) -> PreparedDocument {
        let mut metadata = HashMap::new();
        let mut out = String::with_capacity(text.len());
        let mut stripped = 0usize;
        let mut mapped = 0usize;

        for ch in text.chars() {
            if self.strip_artifacts && is_artifact(ch) {
                stripped += 1;
                continue;
            }
            if self.normalize_unicode {
                if let Some(repl) = ascii_equivalent(ch) {
                    mapped += 1;
                    out.push(repl);
                    continue;
                }
            }
            out.push(ch);
        }

        let out = if self.clean_whitespace {
            collapse_whitespace(&out)
        } else {
            out
        };

        if stripped > 0 {
            metadata.insert("stripped_artifacts".to_string(), stripped.to_string());
        }
        if mapped > 0 {
            metadata.insert("mapped_unicode".to_string(), mapped.to_string());
        }
        metadata.insert("chars".to_string(), out.chars().count().to_string());

        PreparedDocument { text: out, metadata }
    }
}

/// Soft hyphens, BOM, and C0/C1 controls other than `\n` and `\t`.
fn is_artifact(ch: char) -> bool {
    ch == '\u{00AD}'
        || ch == '\u{FEFF}'
        || (ch.is_control() && ch != '\n' && ch != '\t')
}

/// ASCII replacement for Unicode characters OCR likes to emit.
fn ascii_equivalent(ch: char) -> Option<char> {
    match ch {
        // spaces: no-break, narrow no-break, thin, en/em, ideographic
        '\u{00A0}' | '\u{202F}' | '\u{2009}' | '\u{2002}' | '\u{2003}' | '\u{3000}' => Some(' '),
        // dashes: en, em, horizontal bar, minus
        '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{2212}' => Some('-'),
        // curly quotes
        '\u{2018}' | '\u{2019}' => Some('\''),
        '\u{201C}' | '\u{201D}' => Some('"'),
        _ => None,
    }
}

/// Collapse horizontal whitespace runs to one space and blank-line runs to
/// one blank line, trimming trailing space per line.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_lines = 0usize;
    for line in text.lines() {
        let mut compact = String::with_capacity(line.len());
        let mut in_space = false;
        for ch in line.chars() {
            if ch == ' ' || ch == '\t' {
                in_space = true;
            } else {
                if in_space && !compact.is_empty() {
                    compact.push(' ');
                }
                in_space = false;
                compact.push(ch);
            }
        }
        if compact.is_empty() {
            blank_lines += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_lines > 0 {
                out.push('\n');
            }
        }
        blank_lines = 0;
        out.push_str(&compact);
    }
    out
}
