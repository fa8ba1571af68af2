//! CSV validation report generation.
//!
//! The report complements the inline verdict with an element-by-element
//! breakdown: one row for the whole-document schema validation, then one row
//! per element in document order checking that a declared `xs:element` with
//! the same local name exists in the schema's target namespace, and a
//! trailing summary row. Unparseable input short-circuits to a single
//! diagnostic row rather than an HTTP error, so the report download always
//! yields a CSV.

use crate::engine::{DocumentVerdict, render_violation};
use crate::error::{Result, ValidationError};

const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Column headers, in wire order.
const HEADER: [&str; 5] = ["element", "line", "status", "value", "message"];

/// One CSV row. All columns are text; `line` may be empty or `N/A`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportRow {
    pub element: String,
    pub line: String,
    pub status: String,
    pub value: String,
    pub message: String,
}

impl ReportRow {
    fn record(&self) -> [&str; 5] {
        [
            &self.element,
            &self.line,
            &self.status,
            &self.value,
            &self.message,
        ]
    }
}

/// Build the CSV report for a document pair and its validation verdict.
///
/// The verdict must come from validating the same pair; it supplies the
/// whole-document row and the short-circuit diagnostics for unparseable
/// input.
pub fn build_report(xml: &str, xsd: &str, verdict: &DocumentVerdict) -> Result<Vec<u8>> {
    match verdict {
        DocumentVerdict::InvalidXml { details } => {
            diagnostic_report(&format!("Invalid XML: {}", details))
        }
        DocumentVerdict::InvalidXsd { details } => {
            diagnostic_report(&format!("Invalid XSD: {}", details))
        }
        DocumentVerdict::Valid | DocumentVerdict::Invalid { .. } => {
            let rows = element_rows(xml, xsd, verdict)?;
            write_rows(&rows)
        }
    }
}

/// Single-row report used when the XML or XSD cannot be parsed at all.
fn diagnostic_report(message: &str) -> Result<Vec<u8>> {
    write_rows(&[ReportRow {
        element: "N/A".to_string(),
        line: "N/A".to_string(),
        status: "FAIL".to_string(),
        value: String::new(),
        message: message.to_string(),
    }])
}

fn element_rows(xml: &str, xsd: &str, verdict: &DocumentVerdict) -> Result<Vec<ReportRow>> {
    let xml_doc = roxmltree::Document::parse(xml)
        .map_err(|e| ValidationError::Report(format!("XML parse: {}", e)))?;
    let xsd_doc = roxmltree::Document::parse(xsd)
        .map_err(|e| ValidationError::Report(format!("XSD parse: {}", e)))?;

    let schema_root = xsd_doc.root_element();
    let schema_ns = schema_root.attribute("targetNamespace");
    let declared: Vec<&str> = schema_root
        .descendants()
        .filter(|n| n.has_tag_name((XSD_NS, "element")))
        .filter_map(|n| n.attribute("name"))
        .collect();

    let root = xml_doc.root_element();
    let mut rows = Vec::new();
    let mut total = 0usize;
    let mut passed = 0usize;
    let mut failed = 0usize;

    // Whole-document validation row.
    let (doc_status, doc_message) = match verdict {
        DocumentVerdict::Valid => ("PASS", "Document is valid".to_string()),
        DocumentVerdict::Invalid { violations } => (
            "FAIL",
            violations
                .last()
                .map(render_violation)
                .unwrap_or_else(|| "Document is invalid".to_string()),
        ),
        _ => unreachable!("short-circuited above"),
    };
    if doc_status == "PASS" {
        passed += 1;
    } else {
        failed += 1;
    }
    total += 1;
    rows.push(ReportRow {
        element: root.tag_name().name().to_string(),
        line: line_of(&xml_doc, root).to_string(),
        status: doc_status.to_string(),
        value: element_value(root),
        message: doc_message,
    });

    // Element-by-element declaration check against the schema namespace.
    for node in root.descendants().filter(|n| n.is_element()) {
        total += 1;
        let local = node.tag_name().name();
        let elem_ns = node.tag_name().namespace().unwrap_or("");

        // A schema without a targetNamespace declares nothing matchable here.
        let found = matches!(schema_ns, Some(tns) if elem_ns == tns)
            && declared.contains(&local);

        if found {
            passed += 1;
            rows.push(ReportRow {
                element: local.to_string(),
                line: line_of(&xml_doc, node).to_string(),
                status: "PASS".to_string(),
                value: element_value(node),
                message: String::new(),
            });
        } else {
            failed += 1;
            rows.push(ReportRow {
                element: local.to_string(),
                line: line_of(&xml_doc, node).to_string(),
                status: "FAIL".to_string(),
                value: element_value(node),
                message: format!(
                    "Element '{}' not found in schema namespace '{}'",
                    local,
                    schema_ns.unwrap_or("None")
                ),
            });
        }
    }

    // Blank separator, then the summary row.
    let percent = if total > 0 {
        (passed as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    rows.push(ReportRow::default());
    rows.push(ReportRow {
        element: "SUMMARY".to_string(),
        line: String::new(),
        status: format!("{}/{} Passed", passed, total),
        value: String::new(),
        message: format!("{:.2}% Valid ({} Failed)", percent, failed),
    });

    Ok(rows)
}

/// 1-based source line of a node.
fn line_of(doc: &roxmltree::Document<'_>, node: roxmltree::Node<'_, '_>) -> u32 {
    doc.text_pos_at(node.range().start).row
}

/// The value column: trimmed direct text, with attributes appended as
/// `[k="v", ...]` when present.
fn element_value(node: roxmltree::Node<'_, '_>) -> String {
    let text = node.text().map(str::trim).unwrap_or("").to_string();

    let attrs = node
        .attributes()
        .map(|a| format!("{}=\"{}\"", a.name(), a.value()))
        .collect::<Vec<_>>()
        .join(", ");
    if attrs.is_empty() {
        return text;
    }

    if text.is_empty() {
        format!("[{}]", attrs)
    } else {
        format!("{} [{}]", text, attrs)
    }
}

fn write_rows(rows: &[ReportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(HEADER)
        .map_err(|e| ValidationError::Report(e.to_string()))?;
    for row in rows {
        writer
            .write_record(row.record())
            .map_err(|e| ValidationError::Report(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| ValidationError::Report(e.to_string()))
}
