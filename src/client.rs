//! HTTP client for the validation service.
//!
//! Builds the multipart request both endpoints share (parts `xml` and `xsd`,
//! content type `text/xml`, filenames `file.xml`/`file.xsd`), interprets the
//! JSON response of `/validate` into a scored report, and fetches the CSV
//! report from `/validate_csv` as a named download. The non-empty
//! precondition is enforced before any request is constructed, so a missing
//! document never touches the network.

use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};

use crate::error::{Result, ValidationError};
use crate::protocol::{
    DocumentKind, FIELD_XML, FIELD_XSD, PART_CONTENT_TYPE, REPORT_FILENAME, VALIDATE_CSV_PATH,
    VALIDATE_PATH, ValidationReport, ValidationResponse, XML_FILENAME, XSD_FILENAME,
};

/// Configuration for the validator client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the validation service, without a trailing slash
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout_seconds: 30,
            user_agent: format!("xsdcheck/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A fetched CSV report, ready to be written out under its download name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Client for the `/validate` and `/validate_csv` endpoints.
pub struct ValidatorClient {
    client: Client,
    config: ClientConfig,
}

impl ValidatorClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .build()
            .map_err(ValidationError::from)?;

        Ok(Self { client, config })
    }

    /// Validate a document pair inline and derive the display score.
    ///
    /// # Errors
    ///
    /// `EmptyDocument` before any network activity when either text is
    /// empty; `HttpStatus` on a non-2xx response; `Http` on transport
    /// failures; `MalformedResponse` when the body is not the expected JSON.
    pub async fn validate(&self, xml: &str, xsd: &str) -> Result<ValidationReport> {
        check_documents(xml, xsd)?;

        let url = self.url(VALIDATE_PATH);
        let response = self
            .client
            .post(&url)
            .multipart(document_form(xml, xsd)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::HttpStatus {
                url,
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("validation request rejected")
                    .to_string(),
            });
        }

        let body: ValidationResponse =
            response
                .json()
                .await
                .map_err(|e| ValidationError::MalformedResponse {
                    details: e.to_string(),
                })?;

        Ok(ValidationReport::from_response(body))
    }

    /// Fetch the CSV report for a document pair.
    ///
    /// A non-2xx response yields an error and no download; the caller's
    /// validation result state is untouched either way.
    pub async fn export_csv(&self, xml: &str, xsd: &str) -> Result<CsvDownload> {
        check_documents(xml, xsd)?;

        let url = self.url(VALIDATE_CSV_PATH);
        let response = self
            .client
            .post(&url)
            .multipart(document_form(xml, xsd)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::HttpStatus {
                url,
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("report request rejected")
                    .to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(ValidationError::from)?;

        Ok(CsvDownload {
            filename: REPORT_FILENAME.to_string(),
            bytes: bytes.to_vec(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Both endpoints take the same two-part form.
fn document_form(xml: &str, xsd: &str) -> Result<Form> {
    let xml_part = Part::text(xml.to_string())
        .file_name(XML_FILENAME)
        .mime_str(PART_CONTENT_TYPE)
        .map_err(ValidationError::from)?;
    let xsd_part = Part::text(xsd.to_string())
        .file_name(XSD_FILENAME)
        .mime_str(PART_CONTENT_TYPE)
        .map_err(ValidationError::from)?;

    Ok(Form::new()
        .part(FIELD_XML, xml_part)
        .part(FIELD_XSD, xsd_part))
}

/// Precondition shared by both operations: no request leaves the client
/// while either document is empty.
fn check_documents(xml: &str, xsd: &str) -> Result<()> {
    if xml.is_empty() {
        return Err(ValidationError::EmptyDocument(DocumentKind::Xml));
    }
    if xsd.is_empty() {
        return Err(ValidationError::EmptyDocument(DocumentKind::Xsd));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = ClientConfig::new("http://localhost:8000/");
        assert_eq!(config.base_url, "http://localhost:8000");

        let client = ValidatorClient::new(config).unwrap();
        assert_eq!(client.url(VALIDATE_PATH), "http://localhost:8000/validate");
        assert_eq!(
            client.url(VALIDATE_CSV_PATH),
            "http://localhost:8000/validate_csv"
        );
    }

    #[tokio::test]
    async fn test_empty_xml_never_issues_a_request() {
        // The endpoint is unroutable; reaching the network would surface a
        // transport error instead of the precondition error.
        let client = ValidatorClient::new(ClientConfig::new("http://192.0.2.1:1")).unwrap();

        let err = client.validate("", "<xs:schema/>").await.unwrap_err();
        match err {
            ValidationError::EmptyDocument(DocumentKind::Xml) => (),
            other => panic!("Expected EmptyDocument(Xml), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_xsd_never_issues_a_request() {
        let client = ValidatorClient::new(ClientConfig::new("http://192.0.2.1:1")).unwrap();

        let err = client.validate("<root/>", "").await.unwrap_err();
        match err {
            ValidationError::EmptyDocument(DocumentKind::Xsd) => (),
            other => panic!("Expected EmptyDocument(Xsd), got {:?}", other),
        }

        let err = client.export_csv("<root/>", "").await.unwrap_err();
        assert!(matches!(
            err,
            ValidationError::EmptyDocument(DocumentKind::Xsd)
        ));
    }

    #[test]
    fn test_document_form_builds() {
        // Part construction validates the mime type eagerly.
        assert!(document_form("<root/>", "<xs:schema/>").is_ok());
    }
}
