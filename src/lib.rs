//! OpenAPI Request Body Validator
//!
//! Validates the body of incoming HTTP requests against the schemas an
//! OpenAPI 3.0 / 3.1 contract declares for them.
//!
//! Every request body schema in the contract is rendered once, when the
//! validator is built: references are inlined, the result is converted to
//! canonical JSON and compiled. Renderings are cached by a SHA-256 fingerprint
//! of the schema, so identical schemas shared by several operations are only
//! rendered once and validating a request never renders anything.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use openapi_body_validator::{load_contract_str, RequestBodyValidator};
//!
//! let contract = r#"
//! openapi: 3.1.0
//! paths:
//!   /pets:
//!     post:
//!       operationId: createPet
//!       requestBody:
//!         content:
//!           application/json:
//!             schema:
//!               type: object
//!               required: [id]
//!               properties:
//!                 id: { type: integer }
//! "#;
//!
//! let document = Arc::new(load_contract_str(contract).unwrap());
//! let validator = RequestBodyValidator::new(document).unwrap();
//!
//! let request = http::Request::post("/pets")
//!     .header("content-type", "application/json")
//!     .body(r#"{"id": 7}"#)
//!     .unwrap();
//! assert!(validator.validate_request_body(&request).is_ok());
//!
//! let request = http::Request::post("/pets")
//!     .header("content-type", "application/json")
//!     .body("{}")
//!     .unwrap();
//! let err = validator.validate_request_body(&request).unwrap_err();
//! assert_eq!(err.errors().len(), 1);
//! ```
//!
//! # Dispatch
//!
//! | Request | Outcome |
//! |---------|---------|
//! | no matching path template | `path` error |
//! | no operation for the method | `operation` error |
//! | no or empty `Content-Type` header | accepted, body not checked |
//! | operation declares no request body | accepted |
//! | content type not declared | `content_type` error |
//! | declared, not JSON | accepted, body not checked |
//! | declared JSON schema | body validated against the cached rendering |

mod cache;
mod content_type;
mod document;
mod error;
mod fingerprint;
mod loader;
mod paths;
mod render;
mod schema_validation;
mod types;
mod validator;

pub use cache::{CacheEntry, SchemaCache};
pub use content_type::{negotiate, ContentType};
pub use document::{Document, MediaType, Operation, PathItem, RequestBody, Schema};
pub use error::{
    CacheBuildError, ConversionError, LoadError, PinError, RenderError, SchemaError,
    ValidateError, ValidationError, ValidationErrorKind,
};
pub use fingerprint::Fingerprint;
pub use loader::{is_url, load_contract, load_contract_auto, load_contract_str, navigate_fragment};
pub use paths::{find_path, PathMatch};
pub use render::{convert_yaml_to_json, render_inline, to_inline_bytes, RenderOptions};
pub use schema_validation::validate_request_schema;
pub use types::{Method, ValidatorOptions};
pub use validator::RequestBodyValidator;

#[cfg(feature = "remote")]
pub use loader::load_contract_url;
