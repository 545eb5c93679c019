//! Read-only object model of an OpenAPI 3 contract.
//!
//! Only the parts needed for request body validation are modeled: servers,
//! path items, their operations, request bodies and media types. The raw
//! document is kept alongside so schema references can be resolved later.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::loader::{escape_pointer_token, navigate_fragment};
use crate::types::{json_type_name, Method};

/// An already-parsed OpenAPI 3 document.
#[derive(Debug, Clone)]
pub struct Document {
    openapi: String,
    servers: Vec<String>,
    paths: IndexMap<String, PathItem>,
    root: Value,
}

impl Document {
    /// Build the model from a raw JSON value.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::UnsupportedVersion` if the `openapi` field is not 3.x,
    /// or `LoadError::InvalidDocument` if a modeled node has the wrong shape or
    /// a path item / request body reference does not resolve.
    pub fn from_value(root: Value) -> Result<Self, LoadError> {
        let openapi = match root.get("openapi") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(invalid(
                    "#/openapi",
                    format!("expected string, got {}", json_type_name(other)),
                ))
            }
            None => {
                return Err(LoadError::UnsupportedVersion {
                    version: String::new(),
                })
            }
        };
        if !openapi.starts_with("3.") {
            return Err(LoadError::UnsupportedVersion { version: openapi });
        }

        let servers = match root.get("servers") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|s| s.get("url").and_then(Value::as_str))
                .map(String::from)
                .collect(),
            Some(other) => {
                return Err(invalid(
                    "#/servers",
                    format!("expected array, got {}", json_type_name(other)),
                ))
            }
            None => Vec::new(),
        };

        let mut paths = IndexMap::new();
        match root.get("paths") {
            Some(Value::Object(map)) => {
                for (template, item) in map {
                    // Specification extensions live next to the paths.
                    if template.starts_with("x-") {
                        continue;
                    }
                    let pointer = format!("#/paths/{}", escape_pointer_token(template));
                    let item = PathItem::from_value(item, &pointer, &root)?;
                    paths.insert(template.clone(), item);
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => {
                return Err(invalid(
                    "#/paths",
                    format!("expected object, got {}", json_type_name(other)),
                ))
            }
        }

        Ok(Self {
            openapi,
            servers,
            paths,
            root,
        })
    }

    /// The declared OpenAPI version.
    pub fn openapi(&self) -> &str {
        &self.openapi
    }

    /// True for OpenAPI 3.0.x documents, whose schemas use the `nullable` keyword.
    pub fn is_openapi_30(&self) -> bool {
        self.openapi.starts_with("3.0")
    }

    /// Server URLs, in document order.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Path templates and their items, in document order.
    pub fn path_items(&self) -> impl Iterator<Item = (&str, &PathItem)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up a path item by its exact template (e.g. `/pets/{id}`).
    pub fn path_item(&self, template: &str) -> Option<&PathItem> {
        self.paths.get(template)
    }

    /// The raw document, used to resolve `$ref`s.
    pub fn root(&self) -> &Value {
        &self.root
    }
}

/// Operations declared for one path template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathItem {
    operations: BTreeMap<Method, Operation>,
}

impl PathItem {
    fn from_value(value: &Value, pointer: &str, root: &Value) -> Result<Self, LoadError> {
        let (value, pointer) = follow_ref(value, pointer, root)?;
        let map = expect_object(value, &pointer)?;

        let mut operations = BTreeMap::new();
        for method in Method::ALL {
            if let Some(op) = map.get(method.key()) {
                let op_pointer = format!("{}/{}", pointer, method.key());
                operations.insert(method, Operation::from_value(method, op, &op_pointer, root)?);
            }
        }
        Ok(Self { operations })
    }

    /// The operation declared for `method`, if any.
    pub fn operation(&self, method: Method) -> Option<&Operation> {
        self.operations.get(&method)
    }

    /// All declared operations, in fixed method order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Operations whose request body declares at least one content type,
    /// in fixed method order (GET, PUT, POST, DELETE, OPTIONS, HEAD, PATCH, TRACE).
    pub fn operations_with_request_body(&self) -> Vec<&Operation> {
        self.operations
            .values()
            .filter(|op| {
                op.request_body
                    .as_ref()
                    .is_some_and(|body| !body.content.is_empty())
            })
            .collect()
    }
}

/// A single HTTP-method handler definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub method: Method,
    pub operation_id: Option<String>,
    pub request_body: Option<RequestBody>,
}

impl Operation {
    fn from_value(
        method: Method,
        value: &Value,
        pointer: &str,
        root: &Value,
    ) -> Result<Self, LoadError> {
        let map = expect_object(value, pointer)?;

        let operation_id = map
            .get("operationId")
            .and_then(Value::as_str)
            .map(String::from);

        let request_body = match map.get("requestBody") {
            Some(body) => Some(RequestBody::from_value(
                body,
                &format!("{}/requestBody", pointer),
                root,
            )?),
            None => None,
        };

        Ok(Self {
            method,
            operation_id,
            request_body,
        })
    }

    /// The operationId, or the method name when none is declared.
    pub fn label(&self) -> String {
        self.operation_id
            .clone()
            .unwrap_or_else(|| self.method.as_str().to_string())
    }
}

/// Declared request body of an operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    /// Media type entries keyed by content type, in document order.
    pub content: IndexMap<String, MediaType>,
}

impl RequestBody {
    fn from_value(value: &Value, pointer: &str, root: &Value) -> Result<Self, LoadError> {
        let (value, pointer) = follow_ref(value, pointer, root)?;
        let map = expect_object(value, &pointer)?;

        let required = map.get("required").and_then(Value::as_bool).unwrap_or(false);

        let mut content = IndexMap::new();
        if let Some(entries) = map.get("content") {
            let content_pointer = format!("{}/content", pointer);
            for (content_type, media) in expect_object(entries, &content_pointer)? {
                let media_pointer =
                    format!("{}/{}", content_pointer, escape_pointer_token(content_type));
                content.insert(
                    content_type.clone(),
                    MediaType::from_value(media, &media_pointer)?,
                );
            }
        }

        Ok(Self { required, content })
    }
}

/// A content-type keyed schema declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaType {
    pub schema: Option<Schema>,
}

impl MediaType {
    fn from_value(value: &Value, pointer: &str) -> Result<Self, LoadError> {
        let map = expect_object(value, pointer)?;
        let schema = map.get("schema").map(|node| Schema {
            node: node.clone(),
            pointer: format!("{}/schema", pointer),
        });
        Ok(Self { schema })
    }
}

/// A schema node as written in the contract, possibly a `$ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    node: Value,
    pointer: String,
}

impl Schema {
    /// Wrap a schema node located at `pointer` (e.g. `#/components/schemas/Pet`).
    pub fn new(node: Value, pointer: impl Into<String>) -> Self {
        Self {
            node,
            pointer: pointer.into(),
        }
    }

    pub fn node(&self) -> &Value {
        &self.node
    }

    /// Location of this node in the contract.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// The `$ref` target if this node is a reference.
    pub fn reference(&self) -> Option<&str> {
        self.node.get("$ref").and_then(Value::as_str)
    }
}

fn invalid(pointer: &str, message: impl Into<String>) -> LoadError {
    LoadError::InvalidDocument {
        pointer: pointer.to_string(),
        message: message.into(),
    }
}

fn expect_object<'a>(value: &'a Value, pointer: &str) -> Result<&'a Map<String, Value>, LoadError> {
    value
        .as_object()
        .ok_or_else(|| invalid(pointer, format!("expected object, got {}", json_type_name(value))))
}

/// Follow a chain of local `$ref`s, returning the target and its pointer.
fn follow_ref<'a>(
    value: &'a Value,
    pointer: &str,
    root: &'a Value,
) -> Result<(&'a Value, String), LoadError> {
    let mut current = value;
    let mut current_pointer = pointer.to_string();
    let mut seen = Vec::new();

    while let Some(reference) = current.get("$ref").and_then(Value::as_str) {
        if !reference.starts_with('#') {
            return Err(invalid(
                &current_pointer,
                format!("external reference {} is not supported", reference),
            ));
        }
        if seen.iter().any(|r| r == reference) {
            return Err(invalid(
                &current_pointer,
                format!("circular reference {}", reference),
            ));
        }
        seen.push(reference.to_string());
        current = navigate_fragment(root, reference).ok_or_else(|| {
            invalid(
                &current_pointer,
                format!("reference {} does not resolve", reference),
            )
        })?;
        current_pointer = reference.to_string();
    }

    Ok((current, current_pointer))
}
