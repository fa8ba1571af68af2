//! Editor session controller.
//!
//! Owns the mutable UI state — the document pair, the latest validation
//! result, the marker store, and the loading phase — and funnels every
//! change through explicit transitions (idle → validating → settled).
//! User-facing alerts are collected as notices for the frontend to drain.
//!
//! The loading phase gates only re-entrant validate triggers; a report
//! export may run while a validation is in flight, and neither operation is
//! cancellable once started.

use crate::client::{CsvDownload, ValidatorClient};
use crate::markers::{MARKER_OWNER, Marker, MarkerStore, markers_for};
use crate::protocol::{DocumentKind, ValidationReport};

/// Lifecycle of the current validate action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Validating,
    Settled,
}

/// User-facing alert raised by a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Validate or export was triggered with an empty XML or XSD text.
    MissingDocuments,
    /// The inline validation request failed (transport or response parsing).
    ValidationFailed(String),
    /// The CSV export request failed; no download was produced.
    ExportFailed(String),
    /// A dropped file had an unrecognized suffix and was ignored.
    UnsupportedFile(String),
}

/// A file handed to the session by a drop event, already read to text.
#[derive(Debug, Clone)]
pub struct DroppedFile {
    pub name: String,
    pub contents: String,
}

/// Single-owner controller for the document pair and validation state.
#[derive(Debug, Default)]
pub struct EditorSession {
    xml: String,
    xsd: String,
    phase: SessionPhase,
    result: Option<ValidationReport>,
    markers: MarkerStore,
    notices: Vec<Notice>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn xsd(&self) -> &str {
        &self.xsd
    }

    pub fn set_xml(&mut self, text: impl Into<String>) {
        self.xml = text.into();
    }

    pub fn set_xsd(&mut self, text: impl Into<String>) {
        self.xsd = text.into();
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn result(&self) -> Option<&ValidationReport> {
        self.result.as_ref()
    }

    /// Markers currently applied under the validation namespace.
    pub fn markers(&self) -> &[Marker] {
        self.markers.get(MARKER_OWNER)
    }

    /// Drain the accumulated user-facing notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Apply dropped files in drop order.
    ///
    /// `.xml` replaces the XML text, `.xsd` the XSD text (suffixes compared
    /// case-insensitively); anything else raises a notice and changes
    /// nothing. Same-type duplicates overwrite, last wins.
    pub fn accept_drop(&mut self, files: Vec<DroppedFile>) {
        for file in files {
            let lower = file.name.to_lowercase();
            if lower.ends_with(DocumentKind::Xml.suffix()) {
                self.xml = file.contents;
            } else if lower.ends_with(DocumentKind::Xsd.suffix()) {
                self.xsd = file.contents;
            } else {
                self.notices.push(Notice::UnsupportedFile(file.name));
            }
        }
    }

    /// Run an inline validation against the service.
    ///
    /// Re-entrant triggers while a validation is in flight are ignored.
    /// With an empty document the precondition notice is raised and no
    /// request is sent. Otherwise the previous result and markers are
    /// cleared, the request runs, and the phase settles on every exit path.
    pub async fn validate(&mut self, client: &ValidatorClient) {
        if self.phase == SessionPhase::Validating {
            return;
        }
        if self.xml.is_empty() || self.xsd.is_empty() {
            self.notices.push(Notice::MissingDocuments);
            return;
        }

        self.phase = SessionPhase::Validating;
        self.result = None;
        self.markers.set(MARKER_OWNER, Vec::new());

        match client.validate(&self.xml, &self.xsd).await {
            Ok(report) => {
                self.markers.set(MARKER_OWNER, markers_for(&report));
                self.result = Some(report);
            }
            Err(e) => {
                self.notices.push(Notice::ValidationFailed(e.to_string()));
            }
        }

        self.phase = SessionPhase::Settled;
    }

    /// Fetch the CSV report.
    ///
    /// Leaves the validation result, markers, and phase untouched. Returns
    /// the download on success; a failure raises a notice and returns
    /// nothing.
    pub async fn export_report(&mut self, client: &ValidatorClient) -> Option<CsvDownload> {
        if self.xml.is_empty() || self.xsd.is_empty() {
            self.notices.push(Notice::MissingDocuments);
            return None;
        }

        match client.export_csv(&self.xml, &self.xsd).await {
            Ok(download) => Some(download),
            Err(e) => {
                self.notices.push(Notice::ExportFailed(e.to_string()));
                None
            }
        }
    }
}
