//! Schema rendering - turns a contract schema node into a self-contained schema.
//!
//! Rendering happens once per distinct schema while the cache is built:
//! local `$ref`s are inlined, OpenAPI 3.0 `nullable` is rewritten into a JSON
//! Schema type union, and strict mode closes object schemas. The result is
//! serialized to YAML (the inline rendering) and then converted to canonical
//! JSON bytes for the validation engine.

use serde_json::{Map, Value};

use crate::document::Schema;
use crate::error::{ConversionError, RenderError};
use crate::fingerprint::canonicalize;
use crate::loader::navigate_fragment;

/// Keywords whose values are instance data rather than subschemas.
const DATA_KEYWORDS: &[&str] = &["example", "examples", "enum", "const", "default"];

/// Keywords whose values map arbitrary names to subschemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
];

/// How a schema is rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Set `additionalProperties: false` on object schemas.
    pub strict: bool,
    /// Rewrite the OpenAPI 3.0 `nullable` keyword.
    pub nullable_keyword: bool,
}

/// Inline every local `$ref` in `schema`, resolving against `root`.
///
/// Keywords written next to a `$ref` are kept and take precedence over the
/// keys of the referenced definition.
///
/// # Errors
///
/// Returns `RenderError` if a reference is external, does not resolve, or
/// (directly or indirectly) contains itself.
pub fn render_inline(
    schema: &Schema,
    root: &Value,
    options: &RenderOptions,
) -> Result<Value, RenderError> {
    let mut stack = Vec::new();
    let mut rendered = inline_value(schema.node(), root, options, &mut stack)?;

    if options.strict {
        close_additional_properties(&mut rendered);
    }

    Ok(rendered)
}

/// Serialize an inlined schema into its YAML rendering.
pub fn to_inline_bytes(rendered: &Value) -> Result<Vec<u8>, RenderError> {
    serde_yaml::to_string(rendered)
        .map(String::into_bytes)
        .map_err(|source| RenderError::Serialize { source })
}

/// Convert a YAML rendering into canonical (key-sorted, compact) JSON bytes.
pub fn convert_yaml_to_json(inline: &[u8]) -> Result<Vec<u8>, ConversionError> {
    let value: Value = serde_yaml::from_slice(inline)?;
    Ok(serde_json::to_vec(&canonicalize(&value))?)
}

// --- Internal implementation ---

fn inline_value(
    value: &Value,
    root: &Value,
    options: &RenderOptions,
    stack: &mut Vec<String>,
) -> Result<Value, RenderError> {
    match value {
        Value::Object(map) => inline_object(map, root, options, stack),
        Value::Array(arr) => arr
            .iter()
            .map(|item| inline_value(item, root, options, stack))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        // Primitives pass through unchanged
        other => Ok(other.clone()),
    }
}

fn inline_object(
    map: &Map<String, Value>,
    root: &Value,
    options: &RenderOptions,
    stack: &mut Vec<String>,
) -> Result<Value, RenderError> {
    let mut result = Map::new();
    for (key, child) in map {
        if key == "$ref" && child.is_string() {
            continue;
        }
        let rendered = if DATA_KEYWORDS.contains(&key.as_str()) {
            child.clone()
        } else if SCHEMA_MAP_KEYWORDS.contains(&key.as_str()) {
            inline_schema_map(child, root, options, stack)?
        } else {
            inline_value(child, root, options, stack)?
        };
        result.insert(key.clone(), rendered);
    }

    if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
        let target = resolve_reference(reference, root, options, stack)?;
        match target {
            Value::Object(target_map) => {
                for (k, v) in target_map {
                    result.entry(k).or_insert(v);
                }
            }
            // Boolean schemas can only be inlined when nothing sits next to the $ref.
            other if result.is_empty() => return Ok(other),
            _ => {}
        }
    }

    if options.nullable_keyword {
        rewrite_nullable(&mut result);
    }

    Ok(Value::Object(result))
}

/// Render every value of a name-to-subschema map. The names are user data,
/// so none of them is treated as a keyword.
fn inline_schema_map(
    value: &Value,
    root: &Value,
    options: &RenderOptions,
    stack: &mut Vec<String>,
) -> Result<Value, RenderError> {
    let Value::Object(map) = value else {
        return Ok(value.clone());
    };

    let mut result = Map::new();
    for (name, schema) in map {
        result.insert(name.clone(), inline_value(schema, root, options, stack)?);
    }
    Ok(Value::Object(result))
}

fn resolve_reference(
    reference: &str,
    root: &Value,
    options: &RenderOptions,
    stack: &mut Vec<String>,
) -> Result<Value, RenderError> {
    if !reference.starts_with('#') {
        return Err(RenderError::ExternalReference {
            reference: reference.to_string(),
        });
    }
    if stack.iter().any(|r| r == reference) {
        return Err(RenderError::CircularReference {
            reference: reference.to_string(),
        });
    }

    let target =
        navigate_fragment(root, reference).ok_or_else(|| RenderError::UnresolvedReference {
            reference: reference.to_string(),
        })?;

    stack.push(reference.to_string());
    let rendered = inline_value(target, root, options, stack);
    stack.pop();
    rendered
}

/// `nullable: true` next to a `type` becomes a union with `"null"`.
fn rewrite_nullable(map: &mut Map<String, Value>) {
    let Some(Value::Bool(nullable)) = map.get("nullable") else {
        return;
    };
    let nullable = *nullable;
    map.remove("nullable");
    if !nullable {
        return;
    }

    let Some(ty) = map.get_mut("type") else {
        return;
    };
    match ty {
        Value::String(t) => {
            let single = Value::String(std::mem::take(t));
            *ty = Value::Array(vec![single, Value::String("null".into())]);
        }
        Value::Array(types) => {
            if !types.iter().any(|t| t == "null") {
                types.push(Value::String("null".into()));
            }
        }
        _ => {}
    }
}

/// Recursively set `additionalProperties: false` on all object schemas.
///
/// Only sets the value if `additionalProperties` is missing or explicitly `true`.
/// Custom `additionalProperties` schemas are left untouched. `allOf` branches
/// are not closed: each branch only knows its own properties, so closing them
/// would reject everything the other branches add.
fn close_additional_properties(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };

    let is_object_schema = map.get("type").is_some_and(|t| match t {
        Value::String(s) => s == "object",
        Value::Array(types) => types.iter().any(|t| t == "object"),
        _ => false,
    }) || map.contains_key("properties");

    if is_object_schema && !map.contains_key("allOf") {
        match map.get("additionalProperties") {
            None | Some(Value::Bool(true)) => {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            _ => {}
        }
    }

    for (key, child) in map.iter_mut() {
        match key.as_str() {
            "properties" | "patternProperties" | "$defs" | "definitions" | "dependentSchemas" => {
                if let Value::Object(props) = child {
                    for prop_value in props.values_mut() {
                        close_additional_properties(prop_value);
                    }
                }
            }
            "items" | "additionalProperties" | "not" => close_additional_properties(child),
            "anyOf" | "oneOf" | "prefixItems" => {
                if let Value::Array(arr) = child {
                    for item in arr {
                        close_additional_properties(item);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::canonical_bytes;
    use serde_json::json;

    fn root() -> Value {
        json!({
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "required": ["id"],
                        "properties": {
                            "id": { "type": "integer" },
                            "owner": { "$ref": "#/components/schemas/Owner" }
                        }
                    },
                    "Owner": {
                        "type": "object",
                        "properties": { "name": { "type": "string", "nullable": true } }
                    },
                    "Node": {
                        "type": "object",
                        "properties": { "next": { "$ref": "#/components/schemas/Node" } }
                    },
                    "Flag": true
                }
            }
        })
    }

    fn render(node: Value, options: RenderOptions) -> Result<Value, RenderError> {
        render_inline(&Schema::new(node, "#/test"), &root(), &options)
    }

    #[test]
    fn inlines_nested_refs() {
        let rendered = render(
            json!({ "$ref": "#/components/schemas/Pet" }),
            RenderOptions::default(),
        )
        .unwrap();

        assert_eq!(rendered["required"], json!(["id"]));
        assert_eq!(
            rendered["properties"]["owner"]["properties"]["name"]["type"],
            "string"
        );
        assert!(!serde_json::to_string(&rendered).unwrap().contains("$ref"));
    }

    #[test]
    fn siblings_take_precedence() {
        let rendered = render(
            json!({ "$ref": "#/components/schemas/Owner", "type": "null" }),
            RenderOptions::default(),
        )
        .unwrap();
        assert_eq!(rendered["type"], "null");
        assert!(rendered["properties"].get("name").is_some());
    }

    #[test]
    fn boolean_target() {
        let rendered = render(
            json!({ "$ref": "#/components/schemas/Flag" }),
            RenderOptions::default(),
        )
        .unwrap();
        assert_eq!(rendered, json!(true));
    }

    #[test]
    fn circular_reference_fails() {
        let result = render(
            json!({ "$ref": "#/components/schemas/Node" }),
            RenderOptions::default(),
        );
        assert!(matches!(result, Err(RenderError::CircularReference { .. })));
    }

    #[test]
    fn same_ref_twice_is_not_circular() {
        let rendered = render(
            json!({
                "type": "object",
                "properties": {
                    "a": { "$ref": "#/components/schemas/Owner" },
                    "b": { "$ref": "#/components/schemas/Owner" }
                }
            }),
            RenderOptions::default(),
        )
        .unwrap();
        assert_eq!(rendered["properties"]["a"], rendered["properties"]["b"]);
    }

    #[test]
    fn unresolved_and_external_refs_fail() {
        let result = render(
            json!({ "$ref": "#/components/schemas/Missing" }),
            RenderOptions::default(),
        );
        assert!(matches!(result, Err(RenderError::UnresolvedReference { .. })));

        let result = render(
            json!({ "$ref": "common.yaml#/Pet" }),
            RenderOptions::default(),
        );
        assert!(matches!(result, Err(RenderError::ExternalReference { .. })));
    }

    #[test]
    fn data_keywords_are_not_inlined() {
        let rendered = render(
            json!({
                "type": "object",
                "example": { "$ref": "not-a-schema" }
            }),
            RenderOptions::default(),
        )
        .unwrap();
        assert_eq!(rendered["example"]["$ref"], "not-a-schema");
    }

    #[test]
    fn properties_named_like_data_keywords_are_inlined() {
        let rendered = render(
            json!({
                "type": "object",
                "properties": {
                    "default": { "$ref": "#/components/schemas/Owner" },
                    "enum": { "$ref": "#/components/schemas/Owner" }
                },
                "$defs": { "example": { "$ref": "#/components/schemas/Owner" } }
            }),
            RenderOptions::default(),
        )
        .unwrap();

        assert_eq!(rendered["properties"]["default"]["type"], "object");
        assert_eq!(rendered["properties"]["enum"]["type"], "object");
        assert_eq!(rendered["$defs"]["example"]["type"], "object");
        assert!(!serde_json::to_string(&rendered).unwrap().contains("$ref"));
    }

    #[test]
    fn property_named_nullable_survives_rewrite() {
        let options = RenderOptions {
            nullable_keyword: true,
            ..Default::default()
        };
        let rendered = render(
            json!({
                "type": "object",
                "properties": {
                    "nullable": { "type": "boolean" },
                    "ref": { "$ref": "#/components/schemas/Owner", "nullable": true }
                }
            }),
            options,
        )
        .unwrap();

        assert_eq!(rendered["properties"]["nullable"], json!({ "type": "boolean" }));
        assert_eq!(
            rendered["properties"]["ref"]["type"],
            json!(["object", "null"])
        );
    }

    #[test]
    fn nullable_rewritten_only_when_enabled() {
        let node = json!({ "$ref": "#/components/schemas/Owner" });

        let rendered = render(node.clone(), RenderOptions::default()).unwrap();
        assert_eq!(rendered["properties"]["name"]["nullable"], true);

        let options = RenderOptions {
            nullable_keyword: true,
            ..Default::default()
        };
        let rendered = render(node, options).unwrap();
        assert_eq!(
            rendered["properties"]["name"]["type"],
            json!(["string", "null"])
        );
        assert!(rendered["properties"]["name"].get("nullable").is_none());
    }

    #[test]
    fn strict_closes_objects_but_not_all_of_branches() {
        let options = RenderOptions {
            strict: true,
            ..Default::default()
        };
        let rendered = render(
            json!({
                "type": "object",
                "properties": {
                    "nested": { "type": "object", "properties": { "x": { "type": "string" } } },
                    "custom": { "type": "object", "additionalProperties": { "type": "string" } }
                },
                "allOf": [{ "type": "object", "properties": { "y": { "type": "string" } } }]
            }),
            options,
        )
        .unwrap();

        assert!(rendered.get("additionalProperties").is_none());
        assert_eq!(
            rendered["properties"]["nested"]["additionalProperties"],
            false
        );
        assert_eq!(
            rendered["properties"]["custom"]["additionalProperties"],
            json!({ "type": "string" })
        );
        assert!(rendered["allOf"][0].get("additionalProperties").is_none());
    }

    #[test]
    fn yaml_rendering_converts_to_canonical_json() {
        let rendered = render(
            json!({ "$ref": "#/components/schemas/Pet" }),
            RenderOptions::default(),
        )
        .unwrap();

        let inline = to_inline_bytes(&rendered).unwrap();
        assert!(String::from_utf8_lossy(&inline).contains("required:"));

        let json = convert_yaml_to_json(&inline).unwrap();
        let reparsed: Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(reparsed, rendered);
        assert_eq!(json, canonical_bytes(&rendered));
    }

    #[test]
    fn conversion_rejects_broken_yaml() {
        let result = convert_yaml_to_json(b"type: [unclosed");
        assert!(matches!(result, Err(ConversionError::Yaml(_))));
    }
}
