//! Safe wrapper around libxml2 FFI calls for XML Schema validation.
//!
//! The Rust ecosystem has no mature pure-Rust XSD validator, so schema
//! compilation and document validation go through libxml2 directly. The
//! wrapper keeps the unsafe surface small:
//!
//! - global parser initialization is guarded by `std::sync::Once` (libxml2's
//!   init functions are not thread-safe),
//! - compiled schemas are Arc-wrapped pointers freed exactly once on drop
//!   (schema structures are thread-safe for reading after parsing),
//! - every validation creates its own validation context, so concurrent
//!   validations against a shared schema are safe,
//! - validation errors are captured through the structured error callback
//!   with their source line and column instead of being printed to stderr.
//!
//! Schema PARSING is not thread-safe and must not run concurrently; the
//! parsed-schema cache serializes it through single-flight loading.

use std::marker::PhantomData;
use std::sync::{Arc, Once};

use libc::{c_char, c_int, c_uint};

use crate::error::{LibXml2Error, LibXml2Result};

/// Global initialization flag for libxml2
static LIBXML2_INIT: Once = Once::new();

/// Suppress network fetches and stderr chatter while parsing documents.
const XML_PARSE_NOERROR: c_int = 32;
const XML_PARSE_NOWARNING: c_int = 64;
const XML_PARSE_NONET: c_int = 2048;

/// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    // Document parsing
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);

    // Schema parsing functions
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut libc::c_void,
    );

    // Schema validation functions
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaValidateDoc(ctxt: *const XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        sherr: XmlStructuredErrorFunc,
        ctx: *mut libc::c_void,
    );
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut libc::c_void,
    pub node: *mut libc::c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut libc::c_void, error: *mut xmlError)>;

/// A single schema violation reported by libxml2, with its source position.
///
/// `line` is 1-based; libxml2 reports `0` when it cannot attribute the error
/// to a location (for example schema-level problems). `column` comes from
/// the error's `int2` field and is frequently `0` for validity errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Callback for libxml2 to report errors (structured)
unsafe extern "C" fn structured_error_callback(user_data: *mut libc::c_void, error: *mut xmlError) {
    let violations = unsafe { &mut *(user_data as *mut Vec<SchemaViolation>) };

    if error.is_null() {
        return;
    }
    let msg_ptr = unsafe { (*error).message };
    if msg_ptr.is_null() {
        return;
    }
    let c_str = unsafe { std::ffi::CStr::from_ptr(msg_ptr) };
    if let Ok(s) = c_str.to_str() {
        let line = unsafe { (*error).line }.max(0) as u32;
        let column = unsafe { (*error).int2 }.max(0) as u32;
        violations.push(SchemaViolation {
            line,
            column,
            message: s.trim().to_string(),
        });
    }
}

/// Thread-safe wrapper for a compiled libxml2 schema pointer.
///
/// The Arc ensures `xmlSchemaFree` runs exactly once, and the pointer can be
/// shared across threads for validation (read-only access is thread-safe per
/// the libxml2 documentation).
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: libxml2 documentation states that xmlSchema structures are
// thread-safe for reading. See: http://xmlsoft.org/threads.html
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// The pointer must be a valid schema allocated by libxml2 that no other
    /// code will free.
    pub(crate) unsafe fn from_raw(ptr: *mut XmlSchema, details: String) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed { details });
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    /// Get the raw pointer for FFI calls. Valid only while `self` lives.
    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    /// Check if the schema pointer is valid (non-null)
    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// RAII guard for a parsed libxml2 document. Not shared across threads.
struct XmlDocGuard {
    ptr: *mut XmlDoc,
}

impl Drop for XmlDocGuard {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
        }
    }
}

/// Validation result from libxml2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with schema violations (return code > 0)
    Invalid { violations: Vec<SchemaViolation> },
}

impl ValidationVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationVerdict::Valid)
    }
}

/// Safe access to libxml2 schema compilation and document validation.
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Create a new wrapper, initializing libxml2 exactly once across all
    /// threads and instances.
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Compile an XML Schema from an in-memory buffer.
    ///
    /// NOT thread-safe: callers must ensure no concurrent schema parsing.
    /// In practice compiled schemas are cached and each distinct schema is
    /// parsed once through a single-flight load.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::SchemaParseFailed` with the first parser
    /// diagnostic if the schema cannot be compiled.
    pub fn parse_schema_from_memory(&self, schema_data: &[u8]) -> LibXml2Result<XmlSchemaPtr> {
        unsafe {
            let parser_ctxt = xmlSchemaNewMemParserCtxt(
                schema_data.as_ptr() as *const c_char,
                schema_data.len() as c_int,
            );

            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            let mut diagnostics: Vec<SchemaViolation> = Vec::new();
            let diagnostics_ptr = &mut diagnostics as *mut Vec<SchemaViolation> as *mut libc::c_void;
            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(structured_error_callback),
                diagnostics_ptr,
            );

            let schema_ptr = xmlSchemaParse(parser_ctxt);

            // Always free the parser context
            xmlSchemaFreeParserCtxt(parser_ctxt);

            let details = diagnostics
                .first()
                .map(|v| v.message.clone())
                .unwrap_or_else(|| "schema could not be parsed".to_string());

            XmlSchemaPtr::from_raw(schema_ptr, details)
        }
    }

    /// Validate in-memory XML content against a compiled schema.
    ///
    /// Thread-safe: each call creates its own validation context, and the
    /// shared schema pointer is read-only.
    ///
    /// # Errors
    ///
    /// Returns `DocumentParseFailed` when the content is not well-formed,
    /// `ValidationContextCreationFailed` when libxml2 cannot allocate a
    /// context, and `ValidationFailed` on a negative internal return code.
    pub fn validate_memory(
        &self,
        schema: &XmlSchemaPtr,
        xml_content: &[u8],
        file_name: &str,
    ) -> LibXml2Result<ValidationVerdict> {
        let c_name = std::ffi::CString::new(file_name)
            .unwrap_or_else(|_| std::ffi::CString::new("file.xml").unwrap_or_default());

        unsafe {
            let doc = XmlDocGuard {
                ptr: xmlReadMemory(
                    xml_content.as_ptr() as *const c_char,
                    xml_content.len() as c_int,
                    c_name.as_ptr(),
                    std::ptr::null(),
                    XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NONET,
                ),
            };
            if doc.ptr.is_null() {
                return Err(LibXml2Error::DocumentParseFailed {
                    details: "document could not be parsed".to_string(),
                });
            }

            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            let mut violations: Vec<SchemaViolation> = Vec::new();
            let violations_ptr = &mut violations as *mut Vec<SchemaViolation> as *mut libc::c_void;
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                violations_ptr,
            );

            let result_code = xmlSchemaValidateDoc(valid_ctxt, doc.ptr);

            // Always free the validation context; the doc guard frees the doc.
            xmlSchemaFreeValidCtxt(valid_ctxt);

            match result_code {
                0 => Ok(ValidationVerdict::Valid),
                n if n > 0 => Ok(ValidationVerdict::Invalid { violations }),
                n => Err(LibXml2Error::ValidationFailed { code: n }),
            }
        }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="root" type="xs:string"/>
</xs:schema>"#;

    const VALID_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>Hello World</root>"#;

    const INVALID_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root><invalid>content</invalid></root>"#;

    #[test]
    fn test_schema_parsing_success() {
        let wrapper = LibXml2Wrapper::new();
        let schema = wrapper.parse_schema_from_memory(SIMPLE_XSD.as_bytes()).unwrap();
        assert!(schema.is_valid());
    }

    #[test]
    fn test_schema_parsing_invalid_schema() {
        let wrapper = LibXml2Wrapper::new();
        let result = wrapper.parse_schema_from_memory(b"<invalid>not a schema</invalid>");

        match result.unwrap_err() {
            LibXml2Error::SchemaParseFailed { .. } => (),
            other => panic!("Expected SchemaParseFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_parsing_empty_data() {
        let wrapper = LibXml2Wrapper::new();
        assert!(wrapper.parse_schema_from_memory(&[]).is_err());
    }

    #[test]
    fn test_validate_memory_valid_document() {
        let wrapper = LibXml2Wrapper::new();
        let schema = wrapper.parse_schema_from_memory(SIMPLE_XSD.as_bytes()).unwrap();

        let verdict = wrapper
            .validate_memory(&schema, VALID_XML.as_bytes(), "file.xml")
            .unwrap();
        assert!(verdict.is_valid());
    }

    #[test]
    fn test_validate_memory_invalid_document_reports_lines() {
        let wrapper = LibXml2Wrapper::new();
        let schema = wrapper.parse_schema_from_memory(SIMPLE_XSD.as_bytes()).unwrap();

        let verdict = wrapper
            .validate_memory(&schema, INVALID_XML.as_bytes(), "file.xml")
            .unwrap();

        match verdict {
            ValidationVerdict::Invalid { violations } => {
                assert!(!violations.is_empty());
                // The offending element sits on line 2 of INVALID_XML.
                assert!(violations.iter().any(|v| v.line == 2));
                assert!(violations.iter().all(|v| !v.message.is_empty()));
            }
            other => panic!("Expected Invalid verdict, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_memory_malformed_document() {
        let wrapper = LibXml2Wrapper::new();
        let schema = wrapper.parse_schema_from_memory(SIMPLE_XSD.as_bytes()).unwrap();

        let result = wrapper.validate_memory(&schema, b"<root>no closing tag", "file.xml");
        match result.unwrap_err() {
            LibXml2Error::DocumentParseFailed { .. } => (),
            other => panic!("Expected DocumentParseFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_ptr_cloning() {
        let wrapper = LibXml2Wrapper::new();
        let schema = wrapper.parse_schema_from_memory(SIMPLE_XSD.as_bytes()).unwrap();
        let cloned = schema.clone();

        assert!(schema.is_valid());
        assert!(cloned.is_valid());
        assert_eq!(schema.as_ptr(), cloned.as_ptr());
    }

    #[test]
    fn test_memory_safety_on_drop() {
        let wrapper = LibXml2Wrapper::new();

        {
            let schema = wrapper.parse_schema_from_memory(SIMPLE_XSD.as_bytes()).unwrap();
            assert!(schema.is_valid());
        }

        // Dropping a schema must not poison subsequent parses.
        let schema2 = wrapper.parse_schema_from_memory(SIMPLE_XSD.as_bytes()).unwrap();
        assert!(schema2.is_valid());
    }

    #[test]
    fn test_concurrent_validation_against_shared_schema() {
        let wrapper = Arc::new(LibXml2Wrapper::new());
        let schema = wrapper.parse_schema_from_memory(SIMPLE_XSD.as_bytes()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let wrapper = Arc::clone(&wrapper);
                let schema = schema.clone();
                std::thread::spawn(move || {
                    wrapper
                        .validate_memory(&schema, VALID_XML.as_bytes(), "file.xml")
                        .unwrap()
                        .is_valid()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
