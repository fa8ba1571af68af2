//! Error-to-marker mapping for editor integration.
//!
//! Validator error strings carry a `path:line:column:` prefix. Each error
//! that yields a parseable line number becomes a full-line marker; errors
//! without one stay in the textual list but produce no marker. Markers are
//! grouped under an owner namespace and applied as a full replacement set,
//! so a new validation run wipes every marker from the previous run.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::protocol::{ValidationReport, ValidationStatus};

/// Owner namespace under which validation markers are applied.
pub const MARKER_OWNER: &str = "validation";

/// Fixed wide column bound so a marker spans the whole line.
pub const MARKER_END_COLUMN: u32 = 200;

/// Pattern for the embedded line number: colon, digits, colon, optional
/// digits, colon.
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":(\d+):\d*:").unwrap_or_else(|e| panic!("invalid line pattern: {}", e))
});

/// Marker severity. Only errors are produced today; the enum keeps the wire
/// shape open for warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerSeverity {
    Error,
}

/// An inline editor annotation spanning one source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// 1-based line number.
    pub line: u32,
    pub start_column: u32,
    pub end_column: u32,
    pub message: String,
    pub severity: MarkerSeverity,
}

/// Extract the 1-based line number embedded in a validator error string.
pub fn extract_line(message: &str) -> Option<u32> {
    let caps = LINE_RE.captures(message)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Compute the full marker set for a validation report.
///
/// PASS reports produce no markers. Errors without a parseable line number
/// are dropped from the marker set.
pub fn markers_for(report: &ValidationReport) -> Vec<Marker> {
    if report.status != ValidationStatus::Fail {
        return Vec::new();
    }

    report
        .errors
        .iter()
        .filter_map(|err| {
            extract_line(err).map(|line| Marker {
                line,
                start_column: 1,
                end_column: MARKER_END_COLUMN,
                message: err.clone(),
                severity: MarkerSeverity::Error,
            })
        })
        .collect()
}

/// Marker sets keyed by owner namespace.
///
/// `set` replaces the owner's entire set; there is no incremental update.
#[derive(Debug, Default)]
pub struct MarkerStore {
    owners: HashMap<String, Vec<Marker>>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full marker set for an owner.
    pub fn set(&mut self, owner: &str, markers: Vec<Marker>) {
        self.owners.insert(owner.to_string(), markers);
    }

    /// Remove all markers for an owner.
    pub fn clear(&mut self, owner: &str) {
        self.owners.remove(owner);
    }

    pub fn get(&self, owner: &str) -> &[Marker] {
        self.owners.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }
}
