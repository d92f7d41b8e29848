//! Schema gate: every metadata document must satisfy a single JSON Schema
//! loaded once at startup.
//!
//! Loading failures are fatal (no schema means no record can ever pass the
//! gate); per-document failures are reported as values, never raised.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

/// Why a metadata document failed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidateError {
    /// The document parsed but violates the schema.
    Schema(String),
    /// The document could not be read or parsed at all.
    Malformed(String),
}

impl std::fmt::Display for ValidateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidateError::Schema(msg) => write!(f, "schema violation: {msg}"),
            ValidateError::Malformed(msg) => write!(f, "malformed document: {msg}"),
        }
    }
}

impl std::error::Error for ValidateError {}

/// Compiled validation schema, loaded once and shared read-only for the
/// process lifetime. Safe for concurrent use.
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Loads and compiles the schema file. Missing, unparsable or invalid
    /// schema documents are all fatal configuration errors.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        info!(schema_path = ?path_ref, "Loading validation schema");

        let raw = fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read schema file {}", path_ref.display()))?;
        let schema: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Schema file {} is not valid JSON", path_ref.display()))?;
        let compiled = jsonschema::validator_for(&schema)
            .map_err(|e| anyhow::anyhow!("Schema file {} is invalid: {e}", path_ref.display()))?;

        info!(schema_path = ?path_ref, "Validation schema compiled");
        Ok(Self { compiled })
    }

    /// True iff the document satisfies every constraint in the schema.
    /// No side effects; callable concurrently.
    pub fn validate(&self, document: &Value) -> bool {
        self.compiled.is_valid(document)
    }

    /// Richer companion to [`validate`](Self::validate): carries the first
    /// violation message instead of collapsing to a boolean. No side
    /// effects; the caller decides what to log.
    pub fn check(&self, document: &Value) -> std::result::Result<(), ValidateError> {
        self.compiled
            .validate(document)
            .map_err(|e| ValidateError::Schema(e.to_string()))
    }
}

/// Reads and parses a metadata document from disk. Unlike schema loading,
/// a broken document here is a per-pair condition, not a fatal one.
pub fn load_document<P: AsRef<Path>>(path: P) -> std::result::Result<Value, ValidateError> {
    let path_ref = path.as_ref();
    let raw = fs::read_to_string(path_ref).map_err(|e| {
        ValidateError::Malformed(format!("cannot read {}: {e}", path_ref.display()))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        ValidateError::Malformed(format!("cannot parse {}: {e}", path_ref.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn validator_requiring_name() -> SchemaValidator {
        let mut schema_file = tempfile::NamedTempFile::new().unwrap();
        write!(
            schema_file,
            r#"{{"type":"object","required":["name"],"properties":{{"name":{{"type":"string"}}}}}}"#
        )
        .unwrap();
        SchemaValidator::load(schema_file.path()).unwrap()
    }

    #[test]
    fn document_with_required_key_validates() {
        let validator = validator_requiring_name();
        assert!(validator.validate(&json!({"name": "x"})));
        assert!(validator.check(&json!({"name": "x"})).is_ok());
    }

    #[test]
    fn document_missing_required_key_fails() {
        let validator = validator_requiring_name();
        assert!(!validator.validate(&json!({"other": 1})));
        match validator.check(&json!({"other": 1})) {
            Err(ValidateError::Schema(_)) => {}
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[test]
    fn missing_schema_file_is_fatal() {
        assert!(SchemaValidator::load("/nonexistent/schema.json").is_err());
    }

    #[test]
    fn malformed_document_is_per_pair_error() {
        let mut doc = tempfile::NamedTempFile::new().unwrap();
        write!(doc, "not json").unwrap();
        match load_document(doc.path()) {
            Err(ValidateError::Malformed(_)) => {}
            other => panic!("expected malformed error, got {other:?}"),
        }
    }
}
