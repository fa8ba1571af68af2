//! Wire protocol shared by the validation service and the client.
//!
//! The contract is deliberately small: two POST endpoints accepting the same
//! multipart shape (`xml` and `xsd` parts, `text/xml`, fixed filenames), one
//! returning JSON `{status, errors}` and the other a CSV attachment. Error
//! strings carry a `file.xml:<line>:<col>:` prefix so editors can map them
//! back to source lines without a structured error object on the wire.

use serde::{Deserialize, Serialize};

/// Multipart field name for the XML document part.
pub const FIELD_XML: &str = "xml";
/// Multipart field name for the XSD schema part.
pub const FIELD_XSD: &str = "xsd";
/// Content type attached to both parts.
pub const PART_CONTENT_TYPE: &str = "text/xml";
/// Filename label for the XML part.
pub const XML_FILENAME: &str = "file.xml";
/// Filename label for the XSD part.
pub const XSD_FILENAME: &str = "file.xsd";

/// Inline validation endpoint path.
pub const VALIDATE_PATH: &str = "/validate";
/// CSV report endpoint path.
pub const VALIDATE_CSV_PATH: &str = "/validate_csv";
/// Download name for the CSV report.
pub const REPORT_FILENAME: &str = "validation-report.csv";

/// Which half of the document pair a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Xml,
    Xsd,
}

impl DocumentKind {
    /// Filename suffix that classifies a dropped file as this kind.
    pub fn suffix(&self) -> &'static str {
        match self {
            DocumentKind::Xml => ".xml",
            DocumentKind::Xsd => ".xsd",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Xml => write!(f, "XML"),
            DocumentKind::Xsd => write!(f, "XSD"),
        }
    }
}

/// Outcome of validating a document against a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl ValidationStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationStatus::Pass)
    }
}

/// JSON body returned by `POST /validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub status: ValidationStatus,
    pub errors: Vec<String>,
}

impl ValidationResponse {
    pub fn pass() -> Self {
        Self {
            status: ValidationStatus::Pass,
            errors: Vec::new(),
        }
    }

    pub fn fail(errors: Vec<String>) -> Self {
        Self {
            status: ValidationStatus::Fail,
            errors,
        }
    }
}

/// Client-side validation result: the wire response plus the derived score.
///
/// The score is presentational and never server-provided; it is recomputed
/// from scratch for every response and fully replaces the previous result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub errors: Vec<String>,
    pub score: u8,
}

impl ValidationReport {
    pub fn from_response(response: ValidationResponse) -> Self {
        let score = score(response.status, response.errors.len());
        Self {
            status: response.status,
            errors: response.errors,
            score,
        }
    }
}

/// Derive the display score from a validation outcome.
///
/// PASS always maps to 100, even if an errors field is present. FAIL loses
/// 10 points per error, floored at 0.
pub fn score(status: ValidationStatus, error_count: usize) -> u8 {
    match status {
        ValidationStatus::Pass => 100,
        ValidationStatus::Fail => 100u8.saturating_sub(error_count.saturating_mul(10).min(100) as u8),
    }
}
