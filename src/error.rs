//! Error types for contract loading, cache construction and request validation.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors while loading a contract document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    // Document errors (exit code 2)
    #[error("unsupported OpenAPI version \"{version}\": expected 3.x")]
    UnsupportedVersion { version: String },

    #[error("invalid document at {pointer}: {message}")]
    InvalidDocument { pointer: String, message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while rendering a schema into a self-contained form.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("reference {reference} does not resolve to anything in the document")]
    UnresolvedReference { reference: String },

    #[error("circular reference detected: {reference}")]
    CircularReference { reference: String },

    #[error("external reference {reference} cannot be inlined")]
    ExternalReference { reference: String },

    #[error("cannot serialize inlined schema: {source}")]
    Serialize {
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors while converting an inline (YAML) rendering into canonical JSON.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("rendered schema is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("rendered schema cannot be written as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors while pre-rendering the request body schemas of a contract.
///
/// Any of these leaves the validator without a usable cache, so construction
/// fails as a whole.
#[derive(Debug, Error)]
pub enum CacheBuildError {
    #[error("failed to render inline schema for {location}: {source}")]
    Render {
        location: String,
        #[source]
        source: RenderError,
    },

    #[error("failed to convert rendered inline schema to JSON for {location}: {source}")]
    Conversion {
        location: String,
        #[source]
        source: ConversionError,
    },

    #[error("schema for {location} does not compile: {message}")]
    Compile { location: String, message: String },
}

impl CacheBuildError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while pinning a path item on a validator.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("path '{path}' is not declared in the contract")]
    UnknownPath { path: String },

    #[error("path item pinned as '{path}' is not the contract's item for that path")]
    ForeignPathItem { path: String },
}

impl PinError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Outcome of a failed request body validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// The request does not conform to the contract.
    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<ValidationError> },

    /// A declared schema has no cache entry. The validator is broken, not the request.
    #[error("no cached schema for {operation} ({content_type}); the schema cache is inconsistent")]
    CacheMiss {
        operation: String,
        content_type: String,
    },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Invalid { .. } => 1,
            ValidateError::CacheMiss { .. } => 4,
        }
    }

    /// Diagnostics carried by an `Invalid` outcome; empty for internal failures.
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidateError::Invalid { errors } => errors,
            ValidateError::CacheMiss { .. } => &[],
        }
    }
}

/// Category of a request diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// No path template in the contract matches the request.
    Path,
    /// The matched path item has no operation for the request method.
    Operation,
    /// The request content type is not declared for the operation.
    ContentType,
    /// The request body could not be decoded.
    Body,
    /// The decoded body does not satisfy the schema.
    Schema,
}

/// A single diagnostic about an incoming request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Short summary of what failed.
    pub message: String,
    /// Longer explanation of why it failed.
    pub reason: String,
    pub request_method: String,
    pub request_path: String,
    /// JSON pointer of the contract node the request was checked against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_path: Option<String>,
    /// Individual failures reported by the schema engine.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schema_errors: Vec<SchemaError>,
}

impl ValidationError {
    pub(crate) fn path_not_found(method: &str, path: &str) -> Self {
        Self {
            kind: ValidationErrorKind::Path,
            message: format!("{} Path '{}' not found", method, path),
            reason: format!(
                "The {} request contains a path of '{}' however that path does not exist in the contract",
                method, path
            ),
            request_method: method.to_string(),
            request_path: path.to_string(),
            spec_path: None,
            schema_errors: Vec::new(),
        }
    }

    pub(crate) fn operation_not_found(method: &str, path: &str, template: &str) -> Self {
        Self {
            kind: ValidationErrorKind::Operation,
            message: format!("{} operation for '{}' not found", method, template),
            reason: format!(
                "The path '{}' matched '{}' but the contract declares no {} operation for it",
                path, template, method
            ),
            request_method: method.to_string(),
            request_path: path.to_string(),
            spec_path: None,
            schema_errors: Vec::new(),
        }
    }

    pub(crate) fn content_type_not_found(
        operation: &str,
        method: &str,
        path: &str,
        content_type: &str,
    ) -> Self {
        Self {
            kind: ValidationErrorKind::ContentType,
            message: format!(
                "{} operation request content type '{}' does not exist",
                operation, content_type
            ),
            reason: format!(
                "The content type '{}' of the {} request submitted has not been defined for this operation",
                content_type, method
            ),
            request_method: method.to_string(),
            request_path: path.to_string(),
            spec_path: None,
            schema_errors: Vec::new(),
        }
    }

    pub(crate) fn body_not_decodable(
        method: &str,
        path: &str,
        spec_path: &str,
        cause: &serde_json::Error,
    ) -> Self {
        Self {
            kind: ValidationErrorKind::Body,
            message: format!("{} request body for '{}' cannot be decoded", method, path),
            reason: format!("The request body is not valid JSON: {}", cause),
            request_method: method.to_string(),
            request_path: path.to_string(),
            spec_path: Some(spec_path.to_string()),
            schema_errors: Vec::new(),
        }
    }

    pub(crate) fn schema_failed(
        method: &str,
        path: &str,
        template: &str,
        spec_path: &str,
        schema_errors: Vec<SchemaError>,
    ) -> Self {
        Self {
            kind: ValidationErrorKind::Schema,
            message: format!(
                "{} request body for '{}' failed to validate schema",
                method, template
            ),
            reason: format!(
                "The request body does not meet the schema requirements of the contract ({} error(s))",
                schema_errors.len()
            ),
            request_method: method.to_string(),
            request_path: path.to_string(),
            spec_path: Some(spec_path.to_string()),
            schema_errors,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.message, self.reason)
    }
}

/// Single schema failure with path context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// JSON Pointer to the schema keyword that failed.
    pub keyword_location: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("petstore.yaml"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::UnsupportedVersion {
            version: "2.0".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = LoadError::InvalidDocument {
            pointer: "#/paths".into(),
            message: "expected object, got array".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![ValidationError::path_not_found("GET", "/nope")],
        };
        assert_eq!(err.exit_code(), 1);

        let err = ValidateError::CacheMiss {
            operation: "createPet".into(),
            content_type: "application/json".into(),
        };
        assert_eq!(err.exit_code(), 4);
        assert!(err.errors().is_empty());
    }

    #[test]
    fn schema_error_display() {
        let err = SchemaError {
            path: "/owner/email".into(),
            keyword_location: "/properties/owner/properties/email/type".into(),
            message: "123 is not of type \"string\"".into(),
        };
        assert_eq!(err.to_string(), "/owner/email: 123 is not of type \"string\"");
    }

    #[test]
    fn validation_error_serializes_kind_in_snake_case() {
        let err = ValidationError::content_type_not_found(
            "createPet",
            "POST",
            "/pets",
            "application/xml",
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "content_type");
        assert!(json.get("schema_errors").is_none());
        assert!(json.get("spec_path").is_none());
    }
}
