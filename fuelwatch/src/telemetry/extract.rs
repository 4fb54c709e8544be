//! Flow-rate field extraction from telemetry lines.
//!
//! Upstream lines are JSON-like text, one message per line, for example:
//!
//! ```text
//! {"ts":"2025-05-01T10:00:00Z","msg":{"PentaEngineStatus":{"fuel_econ":{"engine_fuel_rate":12.35}}}}
//! ```
//!
//! A line is relevant only if it contains the marker token (matched
//! case-insensitively). The rate is the first run of ASCII digits with at most
//! one decimal point immediately after the `"<field>":` label. The run may be
//! empty (`"engine_fuel_rate":null`); rejecting that is left to the rate
//! parser so it is counted as a malformed sample.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

/// Default relevance marker.
pub const DEFAULT_MARKER: &str = "fuel_econ";

/// Default field label.
pub const DEFAULT_FIELD: &str = "engine_fuel_rate";

/// Build the field pattern for a label.
///
/// Pattern: `"<field>":([0-9]*\.?[0-9]*)`
///
/// ASCII digits only; `\d` would also take other Unicode digits the rate
/// parser rejects.
///
/// We capture:
/// - Group 1: the numeric run (may be empty)
fn field_pattern(field: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r#""{}":([0-9]*\.?[0-9]*)"#, regex::escape(field)))
}

fn marker_pattern(marker: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(marker))
        .case_insensitive(true)
        .build()
}

fn default_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Both inputs are escaped constants
        (
            marker_pattern(DEFAULT_MARKER).unwrap(),
            field_pattern(DEFAULT_FIELD).unwrap(),
        )
    })
}

/// Result of inspecting one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction<'a> {
    /// The line does not carry the marker or the field label.
    Irrelevant,
    /// The raw numeric text following the field label.
    Rate(&'a str),
}

/// Extracts the flow-rate field from relevant lines.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    marker: Regex,
    field: Regex,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        let (marker, field) = default_patterns().clone();
        Self { marker, field }
    }
}

impl FieldExtractor {
    /// Create an extractor for a custom marker and field label.
    ///
    /// Both are matched literally; regex metacharacters are escaped.
    pub fn new(marker: &str, field: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            marker: marker_pattern(marker)?,
            field: field_pattern(field)?,
        })
    }

    /// Whether the line carries the marker token.
    pub fn is_relevant(&self, line: &str) -> bool {
        self.marker.is_match(line)
    }

    /// Inspect a line.
    pub fn extract<'a>(&self, line: &'a str) -> Extraction<'a> {
        if !self.is_relevant(line) {
            return Extraction::Irrelevant;
        }

        match self.field.captures(line).and_then(|c| c.get(1)) {
            Some(rate) => Extraction::Rate(rate.as_str()),
            None => Extraction::Irrelevant,
        }
    }
}
