//! Axum service exposing the validation protocol.
//!
//! Two POST endpoints share one multipart shape (`xml` + `xsd` parts):
//! `/validate` answers the inline JSON verdict and `/validate_csv` streams
//! the element-by-element report as a CSV attachment. CORS is permissive —
//! the service exists to be called from browser editors on other origins.
//! Unparseable documents are data, not server errors: they come back as
//! FAIL verdicts or diagnostic CSV rows, and only a broken multipart
//! envelope is rejected with a 4xx.

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::{DocumentVerdict, ValidationEngine, render_violation};
use crate::protocol::{FIELD_XML, FIELD_XSD, REPORT_FILENAME, ValidationResponse};
use crate::report::build_report;

/// Maximum request body size: both documents plus multipart overhead.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared service state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ValidationEngine>,
}

impl AppState {
    pub fn new(engine: Arc<ValidationEngine>) -> Self {
        Self { engine }
    }
}

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "MISSING_PART").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Request-level errors. Document-level problems never take this path;
/// they are reported inside the validation verdict instead.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The multipart body could not be read (422).
    #[error("unreadable multipart body: {0}")]
    UnreadableForm(String),

    /// A required part is missing or empty (422).
    #[error("missing or empty multipart part '{0}'")]
    MissingPart(&'static str),

    /// Internal validation engine fault (500). Logged, not detailed to the
    /// client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::UnreadableForm(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNREADABLE_FORM"),
            Self::MissingPart(_) => (StatusCode::UNPROCESSABLE_ENTITY, "MISSING_PART"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(details) => {
                tracing::error!("validation engine fault: {}", details);
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/validate", post(validate))
        .route("/validate_csv", post(validate_csv))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The two documents extracted from a request.
struct DocumentPair {
    xml: Vec<u8>,
    xsd: Vec<u8>,
}

/// Read the `xml` and `xsd` parts from a multipart body. Unknown parts are
/// ignored; repeated parts overwrite, last wins.
async fn read_document_pair(mut multipart: Multipart) -> Result<DocumentPair, ApiError> {
    let mut xml: Option<Vec<u8>> = None;
    let mut xsd: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::UnreadableForm(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::UnreadableForm(e.to_string()))?;

        match name.as_str() {
            n if n == FIELD_XML => xml = Some(data.to_vec()),
            n if n == FIELD_XSD => xsd = Some(data.to_vec()),
            _ => {}
        }
    }

    let xml = xml.filter(|d| !d.is_empty()).ok_or(ApiError::MissingPart(FIELD_XML))?;
    let xsd = xsd.filter(|d| !d.is_empty()).ok_or(ApiError::MissingPart(FIELD_XSD))?;

    Ok(DocumentPair { xml, xsd })
}

/// POST /validate — inline validation verdict as JSON.
async fn validate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ValidationResponse>, ApiError> {
    let pair = read_document_pair(multipart).await?;

    let verdict = state
        .engine
        .validate(pair.xml, pair.xsd)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let response = match verdict {
        DocumentVerdict::Valid => ValidationResponse::pass(),
        DocumentVerdict::Invalid { violations } => {
            tracing::info!(violations = violations.len(), "document failed validation");
            ValidationResponse::fail(violations.iter().map(render_violation).collect())
        }
        DocumentVerdict::InvalidXml { details } => {
            ValidationResponse::fail(vec![format!("Invalid XML: {}", details)])
        }
        DocumentVerdict::InvalidXsd { details } => {
            ValidationResponse::fail(vec![format!("Invalid XSD: {}", details)])
        }
    };

    Ok(Json(response))
}

/// POST /validate_csv — element-by-element report as a CSV attachment.
async fn validate_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let pair = read_document_pair(multipart).await?;

    let xml_text = String::from_utf8_lossy(&pair.xml).into_owned();
    let xsd_text = String::from_utf8_lossy(&pair.xsd).into_owned();

    let verdict = state
        .engine
        .validate(pair.xml, pair.xsd)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let csv =
        build_report(&xml_text, &xsd_text, &verdict).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", REPORT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}

/// Liveness probe — always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — compiles a trivial schema through the engine.
async fn readiness(State(state): State<AppState>) -> Response {
    const PROBE_XSD: &str =
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:element name="ping" type="xs:string"/></xs:schema>"#;
    const PROBE_XML: &str = "<ping>ready</ping>";

    match state
        .engine
        .validate(PROBE_XML.into(), PROBE_XSD.into())
        .await
    {
        Ok(verdict) if verdict.is_valid() => (StatusCode::OK, "ready").into_response(),
        Ok(_) => (StatusCode::SERVICE_UNAVAILABLE, "engine degraded").into_response(),
        Err(e) => {
            tracing::warn!("readiness probe failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "engine unavailable").into_response()
        }
    }
}
