use thiserror::Error;

use crate::protocol::DocumentKind;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("missing {0} document: both XML and XSD must be non-empty")]
    EmptyDocument(DocumentKind),

    #[error("malformed validation response: {details}")]
    MalformedResponse { details: String },

    #[error("report generation error: {0}")]
    Report(String),

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

/// LibXML2-specific error types
///
/// Clone is required so the parsed-schema cache can hand the same compile
/// failure to every request waiting on a single-flight load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibXml2Error {
    #[error("schema compilation failed: {details}")]
    SchemaParseFailed { details: String },

    #[error("document is not well-formed XML: {details}")]
    DocumentParseFailed { details: String },

    #[error("validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("validation failed with internal code {code}")]
    ValidationFailed { code: i32 },

    #[error("memory allocation failed in libxml2")]
    MemoryAllocation,
}

impl From<LibXml2Error> for ValidationError {
    fn from(err: LibXml2Error) -> Self {
        ValidationError::LibXml2Internal {
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
