//! Core types shared across the validator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Substring that marks a media type as JSON-flavored.
pub const JSON_TYPE: &str = "json";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// HTTP methods a path item can declare an operation for.
///
/// The declaration order is the iteration order used wherever operations are
/// enumerated, so `Ord` is part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    /// All methods, in iteration order.
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Options,
        Method::Head,
        Method::Patch,
        Method::Trace,
    ];

    /// The key used for this method inside an OpenAPI path item.
    pub fn key(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
            Method::Patch => "patch",
            Method::Trace => "trace",
        }
    }

    /// Uppercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Trace => "TRACE",
        }
    }

    /// Parse a method name, case-insensitively.
    ///
    /// Returns `None` for methods OpenAPI path items cannot declare (e.g. CONNECT).
    pub fn parse(s: &str) -> Option<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
    }

    pub fn from_http(method: &http::Method) -> Option<Self> {
        Self::parse(method.as_str())
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options applied when the schema cache is built.
#[derive(Debug, Clone, Default)]
pub struct ValidatorOptions {
    /// When true, sets `additionalProperties: false` on all object schemas
    /// to reject unknown fields. Defaults to false to respect schema extensibility.
    pub strict: bool,
    /// When true, `format` keywords (e.g. `date-time`, `email`) are asserted
    /// rather than treated as annotations.
    pub format_assertions: bool,
}

impl ValidatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict mode (additionalProperties: false on all objects).
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Turn `format` assertions on or off.
    pub fn format_assertions(mut self, enabled: bool) -> Self {
        self.format_assertions = enabled;
        self
    }
}
