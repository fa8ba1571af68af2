//! Validation engine: compiled-schema caching plus document validation.
//!
//! Schema compilation is CPU-bound, not thread-safe, and comparatively
//! expensive, so compiled schemas are cached in-memory keyed by a digest of
//! the schema bytes. The moka cache provides single-flight loading: when
//! several requests carry the same schema, exactly one compiles it and the
//! rest await the result. Validation itself is thread-safe and runs under
//! `spawn_blocking` so it never stalls the async runtime.

use std::sync::Arc;

use moka::future::Cache;
use sha2::{Digest, Sha256};

use crate::error::{LibXml2Error, Result, ValidationError};
use crate::libxml2::{LibXml2Wrapper, SchemaViolation, ValidationVerdict, XmlSchemaPtr};
use crate::protocol::XML_FILENAME;

/// Default number of compiled schemas kept in memory.
const DEFAULT_SCHEMA_CACHE_CAPACITY: u64 = 64;

/// In-memory cache for compiled libxml2 schema pointers.
///
/// moka's `try_get_with` guarantees that concurrent requests for the same
/// key wait for a single loader rather than compiling in parallel, which
/// also upholds the libxml2 rule that schema parsing must not be concurrent
/// for identical inputs.
pub struct ParsedSchemaCache {
    cache: Cache<String, Arc<XmlSchemaPtr>>,
}

impl ParsedSchemaCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();

        Self { cache }
    }

    /// Get a compiled schema from the cache, or compile it if missing.
    ///
    /// The `loader` future only runs when the key is absent; its error is
    /// cloned out to every waiter.
    pub async fn get_or_load<F, Fut>(
        &self,
        key: String,
        loader: F,
    ) -> std::result::Result<Arc<XmlSchemaPtr>, LibXml2Error>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<Arc<XmlSchemaPtr>, LibXml2Error>>,
    {
        self.cache
            .try_get_with(key, loader())
            .await
            .map_err(|e| (*e).clone())
    }

    pub async fn get(&self, key: &str) -> Option<Arc<XmlSchemaPtr>> {
        self.cache.get(key).await
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

/// How a validation request resolved, before any wire formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentVerdict {
    /// Document conforms to the schema.
    Valid,
    /// Document parsed but violates the schema.
    Invalid { violations: Vec<SchemaViolation> },
    /// The XML part is not well-formed.
    InvalidXml { details: String },
    /// The XSD part is not well-formed or not a valid schema.
    InvalidXsd { details: String },
}

impl DocumentVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, DocumentVerdict::Valid)
    }
}

/// Render a violation as the wire error string consumed by editor clients.
///
/// The `file.xml:<line>:<col>:` prefix is a documented part of the protocol;
/// clients extract the line number from it to place editor markers.
pub fn render_violation(violation: &SchemaViolation) -> String {
    format!(
        "{}:{}:{}: {}",
        XML_FILENAME, violation.line, violation.column, violation.message
    )
}

/// Async facade over libxml2 with compiled-schema caching.
pub struct ValidationEngine {
    wrapper: Arc<LibXml2Wrapper>,
    schemas: ParsedSchemaCache,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SCHEMA_CACHE_CAPACITY)
    }

    pub fn with_capacity(schema_cache_capacity: u64) -> Self {
        Self {
            wrapper: Arc::new(LibXml2Wrapper::new()),
            schemas: ParsedSchemaCache::new(schema_cache_capacity),
        }
    }

    /// Validate an XML document against an XSD schema, both as raw bytes.
    ///
    /// Returns a verdict rather than an error for all input-caused failures
    /// (malformed XML, malformed XSD, violations); `Err` is reserved for
    /// internal faults such as allocation failures or negative libxml2
    /// return codes.
    pub async fn validate(&self, xml: Vec<u8>, xsd: Vec<u8>) -> Result<DocumentVerdict> {
        // Well-formedness gates run first: roxmltree produces positioned,
        // human-readable diagnostics that libxml2 would only print to stderr.
        if let Err(e) = roxmltree::Document::parse(&String::from_utf8_lossy(&xsd)) {
            return Ok(DocumentVerdict::InvalidXsd {
                details: e.to_string(),
            });
        }
        if let Err(e) = roxmltree::Document::parse(&String::from_utf8_lossy(&xml)) {
            return Ok(DocumentVerdict::InvalidXml {
                details: e.to_string(),
            });
        }

        let schema = match self.compile_schema(xsd).await {
            Ok(schema) => schema,
            Err(LibXml2Error::SchemaParseFailed { details }) => {
                return Ok(DocumentVerdict::InvalidXsd { details });
            }
            Err(e) => return Err(e.into()),
        };

        let wrapper = Arc::clone(&self.wrapper);
        let verdict = tokio::task::spawn_blocking(move || {
            wrapper.validate_memory(&schema, &xml, XML_FILENAME)
        })
        .await
        .map_err(|e| ValidationError::Concurrency {
            details: format!("validation task join error: {}", e),
        })?;

        match verdict {
            Ok(ValidationVerdict::Valid) => Ok(DocumentVerdict::Valid),
            Ok(ValidationVerdict::Invalid { violations }) => {
                Ok(DocumentVerdict::Invalid { violations })
            }
            Err(LibXml2Error::DocumentParseFailed { details }) => {
                Ok(DocumentVerdict::InvalidXml { details })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Compile a schema through the cache, keyed by content digest.
    async fn compile_schema(
        &self,
        xsd: Vec<u8>,
    ) -> std::result::Result<Arc<XmlSchemaPtr>, LibXml2Error> {
        let key = schema_cache_key(&xsd);
        let wrapper = Arc::clone(&self.wrapper);

        self.schemas
            .get_or_load(key, || async move {
                tokio::task::spawn_blocking(move || {
                    wrapper.parse_schema_from_memory(&xsd).map(Arc::new)
                })
                .await
                .map_err(|e| LibXml2Error::SchemaParseFailed {
                    details: format!("schema compile task join error: {}", e),
                })?
            })
            .await
    }

    pub fn cached_schema_count(&self) -> u64 {
        self.schemas.entry_count()
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key for a schema: hex SHA-256 of its bytes.
fn schema_cache_key(xsd: &[u8]) -> String {
    let digest = Sha256::digest(xsd);
    let mut key = String::with_capacity(64);
    for byte in digest {
        key.push_str(&format!("{:02x}", byte));
    }
    key
}
