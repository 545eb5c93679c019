//! Request payload validation against cached schemas.

use http::Request;
use jsonschema::{Draft, Validator};
use serde_json::Value;

use crate::cache::CacheEntry;
use crate::error::{SchemaError, ValidationError};

/// Compile a canonical JSON rendering into a reusable validator.
pub(crate) fn compile(
    rendered_json: &[u8],
    draft: Draft,
    format_assertions: bool,
) -> Result<Validator, String> {
    let schema: Value = serde_json::from_slice(rendered_json).map_err(|e| e.to_string())?;
    jsonschema::options()
        .with_draft(draft)
        .should_validate_formats(format_assertions)
        .build(&schema)
        .map_err(|e| e.to_string())
}

/// Validate the body of `request` against a cached schema.
///
/// An empty body is validated as JSON `null`. `path_value` is the matched
/// path template, used in the diagnostic.
///
/// # Errors
///
/// Returns one `body` error if the payload is not JSON, or one `schema`
/// error carrying every failure the engine reported.
pub fn validate_request_schema<B: AsRef<[u8]>>(
    request: &Request<B>,
    entry: &CacheEntry,
    path_value: &str,
) -> Result<(), ValidationError> {
    let method = request.method().as_str();
    let path = request.uri().path();
    let spec_path = entry.schema().pointer();

    let raw = request.body().as_ref();
    let payload: Value = if raw.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(raw)
            .map_err(|e| ValidationError::body_not_decodable(method, path, spec_path, &e))?
    };

    let errors: Vec<SchemaError> = entry
        .validator()
        .iter_errors(&payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            keyword_location: e.schema_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::schema_failed(
            method, path, path_value, spec_path, errors,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Schema};
    use crate::error::ValidationErrorKind;
    use crate::types::ValidatorOptions;
    use serde_json::json;

    fn entry(schema: Value, openapi: &str) -> CacheEntry {
        let doc = Document::from_value(json!({ "openapi": openapi, "paths": {} })).unwrap();
        CacheEntry::render(
            &Schema::new(schema, "#/paths/~1pets/post/requestBody/content/application~1json/schema"),
            &doc,
            &ValidatorOptions::default(),
            "test",
        )
        .unwrap()
    }

    fn post(body: &str) -> Request<Vec<u8>> {
        Request::post("/pets")
            .header("content-type", "application/json")
            .body(body.as_bytes().to_vec())
            .unwrap()
    }

    fn pet_schema() -> Value {
        json!({
            "type": "object",
            "required": ["id"],
            "properties": { "id": { "type": "integer" } }
        })
    }

    #[test]
    fn valid_payload() {
        let entry = entry(pet_schema(), "3.1.0");
        assert!(validate_request_schema(&post(r#"{"id": 1}"#), &entry, "/pets").is_ok());
    }

    #[test]
    fn missing_required_property() {
        let entry = entry(pet_schema(), "3.1.0");
        let err = validate_request_schema(&post("{}"), &entry, "/pets").unwrap_err();

        assert_eq!(err.kind, ValidationErrorKind::Schema);
        assert_eq!(err.message, "POST request body for '/pets' failed to validate schema");
        assert_eq!(err.schema_errors.len(), 1);
        assert!(err.schema_errors[0].message.contains("\"id\""));
        assert_eq!(err.schema_errors[0].keyword_location, "/required");
    }

    #[test]
    fn collects_multiple_errors() {
        let entry = entry(
            json!({
                "type": "object",
                "required": ["name", "age"],
                "properties": { "tag": { "type": "string" } }
            }),
            "3.1.0",
        );
        let err = validate_request_schema(&post(r#"{"tag": 5}"#), &entry, "/pets").unwrap_err();
        assert_eq!(err.schema_errors.len(), 3);
        assert!(err.schema_errors.iter().any(|e| e.path == "/tag"));
    }

    #[test]
    fn undecodable_body() {
        let entry = entry(pet_schema(), "3.1.0");
        let err = validate_request_schema(&post("{ nope"), &entry, "/pets").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::Body);
        assert!(err.schema_errors.is_empty());
    }

    #[test]
    fn empty_body_is_null() {
        let entry = entry(pet_schema(), "3.1.0");
        let err = validate_request_schema(&post(""), &entry, "/pets").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::Schema);

        let entry = self::entry(json!({ "type": ["object", "null"] }), "3.1.0");
        assert!(validate_request_schema(&post("  "), &entry, "/pets").is_ok());
    }

    #[test]
    fn openapi_30_nullable_accepts_null() {
        let entry = entry(
            json!({
                "type": "object",
                "properties": { "tag": { "type": "string", "nullable": true } }
            }),
            "3.0.3",
        );
        assert!(validate_request_schema(&post(r#"{"tag": null}"#), &entry, "/pets").is_ok());
    }

    #[test]
    fn openapi_30_boolean_exclusive_minimum() {
        let entry = entry(
            json!({ "type": "integer", "minimum": 0, "exclusiveMinimum": true }),
            "3.0.3",
        );
        assert!(validate_request_schema(&post("0"), &entry, "/pets").is_err());
        assert!(validate_request_schema(&post("1"), &entry, "/pets").is_ok());
    }
}
