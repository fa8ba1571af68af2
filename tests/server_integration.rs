//! Router-level tests for the validation service, driven through
//! `tower::ServiceExt::oneshot` without binding a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use xsdcheck::engine::ValidationEngine;
use xsdcheck::protocol::{ValidationResponse, ValidationStatus};
use xsdcheck::server::{AppState, app};

const BOUNDARY: &str = "xsdcheck-test-boundary";

const SIMPLE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="root" type="xs:string"/>
</xs:schema>"#;

const VALID_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>Hello World</root>"#;

const INVALID_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root><invalid>content</invalid></root>"#;

fn test_app() -> axum::Router {
    app(AppState::new(Arc::new(ValidationEngine::new())))
}

/// Build a multipart/form-data body from (name, filename, content) parts.
fn multipart_body(parts: &[(&str, &str, &str)]) -> String {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!("--{}\r\n", BOUNDARY));
        body.push_str(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            name, filename
        ));
        body.push_str("Content-Type: text/xml\r\n\r\n");
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body
}

fn multipart_request(uri: &str, parts: &[(&str, &str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn document_request(uri: &str, xml: &str, xsd: &str) -> Request<Body> {
    multipart_request(
        uri,
        &[("xml", "file.xml", xml), ("xsd", "file.xsd", xsd)],
    )
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

#[tokio::test]
async fn validate_returns_pass_for_conforming_document() {
    let response = test_app()
        .oneshot(document_request("/validate", VALID_XML, SIMPLE_XSD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: ValidationResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.status, ValidationStatus::Pass);
    assert!(body.errors.is_empty());
}

#[tokio::test]
async fn validate_returns_fail_with_line_prefixed_errors() {
    let response = test_app()
        .oneshot(document_request("/validate", INVALID_XML, SIMPLE_XSD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: ValidationResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.status, ValidationStatus::Fail);
    assert!(!body.errors.is_empty());
    for error in &body.errors {
        assert!(
            error.starts_with("file.xml:"),
            "error lacks line protocol prefix: {}",
            error
        );
        assert!(xsdcheck::markers::extract_line(error).is_some());
    }
}

#[tokio::test]
async fn validate_reports_malformed_xml_as_fail_not_500() {
    let response = test_app()
        .oneshot(document_request("/validate", "<root>unclosed", SIMPLE_XSD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: ValidationResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.status, ValidationStatus::Fail);
    assert!(body.errors[0].starts_with("Invalid XML:"));
}

#[tokio::test]
async fn validate_rejects_missing_xsd_part() {
    let response = test_app()
        .oneshot(multipart_request(
            "/validate",
            &[("xml", "file.xml", VALID_XML)],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["error"]["code"], "MISSING_PART");
    assert!(body["error"]["message"].as_str().unwrap().contains("xsd"));
}

#[tokio::test]
async fn validate_rejects_empty_parts() {
    let response = test_app()
        .oneshot(document_request("/validate", "", SIMPLE_XSD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn validate_ignores_unknown_parts() {
    let response = test_app()
        .oneshot(multipart_request(
            "/validate",
            &[
                ("xml", "file.xml", VALID_XML),
                ("xsd", "file.xsd", SIMPLE_XSD),
                ("extra", "noise.bin", "ignored"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn validate_csv_returns_attachment_with_header_row() {
    let response = test_app()
        .oneshot(document_request("/validate_csv", VALID_XML, SIMPLE_XSD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=validation-report.csv"
    );

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.starts_with("element,line,status,value,message"));
    assert!(body.contains("SUMMARY"));
}

#[tokio::test]
async fn validate_csv_short_circuits_on_malformed_xml() {
    let response = test_app()
        .oneshot(document_request("/validate_csv", "<broken", SIMPLE_XSD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("N/A,N/A,FAIL"));
    assert!(body.contains("Invalid XML:"));
}

#[tokio::test]
async fn validate_csv_rejects_missing_parts_like_validate() {
    let response = test_app()
        .oneshot(multipart_request("/validate_csv", &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn health_probes_respond() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
