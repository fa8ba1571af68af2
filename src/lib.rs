//! # xsdcheck Library
//!
//! XML/XSD validation over a small HTTP protocol: an axum service wrapping
//! libxml2 schema validation with a CSV report endpoint, a reqwest client
//! implementing the multipart contract and the derived display score, and
//! an editor session controller that maps validator errors to inline
//! markers.

pub mod cli;
pub mod client;
pub mod engine;
pub mod error;
pub mod libxml2;
pub mod markers;
pub mod output;
pub mod protocol;
pub mod report;
pub mod server;
pub mod session;

pub use client::{ClientConfig, CsvDownload, ValidatorClient};
pub use engine::{DocumentVerdict, ParsedSchemaCache, ValidationEngine};
pub use error::{LibXml2Error, ValidationError};
pub use libxml2::{LibXml2Wrapper, SchemaViolation, ValidationVerdict, XmlSchemaPtr};
pub use markers::{MARKER_OWNER, Marker, MarkerSeverity, MarkerStore, markers_for};
pub use output::Output;
pub use protocol::{
    DocumentKind, ValidationReport, ValidationResponse, ValidationStatus, score,
};
pub use server::{AppState, app};
pub use session::{DroppedFile, EditorSession, Notice, SessionPhase};
