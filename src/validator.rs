//! Request body validation against an OpenAPI contract.
//!
//! [`RequestBodyValidator`] owns the contract, a schema cache built eagerly at
//! construction, and an optional pinned path item. The cache is never changed
//! after construction. A single read/write lock guards the pin and the cache:
//! every validation holds the read side for its whole duration, while pinning
//! a path item takes the write side.

use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::Request;
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::cache::SchemaCache;
use crate::content_type::{negotiate, ContentType};
use crate::document::{Document, PathItem};
use crate::error::{CacheBuildError, PinError, ValidateError, ValidationError};
use crate::fingerprint::Fingerprint;
use crate::paths::find_path;
use crate::schema_validation::validate_request_schema;
use crate::types::{Method, ValidatorOptions};

/// Validates request bodies against the schemas declared in a contract.
///
/// The validator is `Send + Sync`; share it behind an `Arc` across request
/// handling threads.
pub struct RequestBodyValidator {
    document: Arc<Document>,
    options: ValidatorOptions,
    state: RwLock<DispatchState>,
}

struct DispatchState {
    pinned: Option<PinnedPath>,
    cache: SchemaCache,
}

struct PinnedPath {
    path_item: PathItem,
    path_value: String,
}

impl RequestBodyValidator {
    /// Build a validator with default options.
    ///
    /// # Errors
    ///
    /// Returns `CacheBuildError` if any request body schema cannot be
    /// rendered; no validator is produced in that case.
    pub fn new(document: Arc<Document>) -> Result<Self, CacheBuildError> {
        Self::with_options(document, ValidatorOptions::default())
    }

    /// Build a validator, rendering every request body schema up front.
    pub fn with_options(
        document: Arc<Document>,
        options: ValidatorOptions,
    ) -> Result<Self, CacheBuildError> {
        let cache = SchemaCache::build(&document, &options)?;
        Ok(Self {
            document,
            options,
            state: RwLock::new(DispatchState {
                pinned: None,
                cache,
            }),
        })
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Number of distinct schemas in the cache.
    pub fn cache_len(&self) -> usize {
        self.state.read().cache.len()
    }

    /// The path template of the pinned path item, if one is set.
    pub fn pinned_path(&self) -> Option<String> {
        self.state
            .read()
            .pinned
            .as_ref()
            .map(|pin| pin.path_value.clone())
    }

    /// Pin a path item: every later validation uses it instead of resolving
    /// the request path.
    ///
    /// The item must be the contract's own item for `path_value`, as returned
    /// by [`Document::path_item`]; its schemas are then already cached.
    ///
    /// # Errors
    ///
    /// Returns `PinError::UnknownPath` if the contract declares no such path,
    /// or `PinError::ForeignPathItem` if `path_item` differs from the
    /// contract's item. The previous pin stays in place.
    pub fn set_path_item(
        &self,
        path_item: PathItem,
        path_value: impl Into<String>,
    ) -> Result<(), PinError> {
        let path_value = path_value.into();
        match self.document.path_item(&path_value) {
            None => return Err(PinError::UnknownPath { path: path_value }),
            Some(declared) if *declared != path_item => {
                return Err(PinError::ForeignPathItem { path: path_value })
            }
            Some(_) => {}
        }

        warn!(path = %path_value, "path item pinned; requests bypass path resolution");
        self.state.write().pinned = Some(PinnedPath {
            path_item,
            path_value,
        });
        Ok(())
    }

    /// Drop the pinned path item and go back to resolving each request path.
    pub fn clear_path_item(&self) {
        self.state.write().pinned = None;
    }

    /// Validate the body of `request` against its operation's declared schema.
    ///
    /// A request without a `Content-Type` header is not checked here. Media
    /// types that are not JSON-flavored are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ValidateError::Invalid` with every diagnostic for a
    /// non-conforming request, or `ValidateError::CacheMiss` if a declared
    /// schema is missing from the cache.
    pub fn validate_request_body<B: AsRef<[u8]>>(
        &self,
        request: &Request<B>,
    ) -> Result<(), ValidateError> {
        let state = self.state.read();
        let method = request.method().as_str();
        let request_path = request.uri().path();

        let (path_item, path_value) = match &state.pinned {
            Some(pin) => {
                debug!(path = %pin.path_value, "using pinned path item");
                (&pin.path_item, pin.path_value.as_str())
            }
            None => match find_path(request, &self.document) {
                Ok(found) => (found.path_item, found.path_value),
                Err(errors) => return Err(ValidateError::Invalid { errors }),
            },
        };

        let Some(operation) =
            Method::from_http(request.method()).and_then(|m| path_item.operation(m))
        else {
            return Err(ValidateError::Invalid {
                errors: vec![ValidationError::operation_not_found(
                    method,
                    request_path,
                    path_value,
                )],
            });
        };

        let Some(header) = request.headers().get(CONTENT_TYPE) else {
            debug!(%method, path = %request_path, "no content type; body not checked");
            return Ok(());
        };
        let content_type = ContentType::parse(&String::from_utf8_lossy(header.as_bytes()));
        if content_type.media_type.is_empty() {
            debug!(%method, path = %request_path, "empty content type; body not checked");
            return Ok(());
        }

        let Some(body) = &operation.request_body else {
            return Ok(());
        };

        let mut errors = Vec::new();
        match negotiate(&body.content, &content_type) {
            None => errors.push(ValidationError::content_type_not_found(
                &operation.label(),
                method,
                request_path,
                &content_type.media_type,
            )),
            Some((declared, _)) if !content_type.is_json() => {
                debug!(content_type = %declared, "not a JSON media type; body not checked");
            }
            Some((declared, media)) => {
                if let Some(schema) = &media.schema {
                    let fingerprint = Fingerprint::of(schema, self.document.root());
                    let Some(entry) = state.cache.get(&fingerprint) else {
                        error!(
                            %fingerprint,
                            operation = %operation.label(),
                            content_type = %declared,
                            "declared schema missing from cache"
                        );
                        return Err(ValidateError::CacheMiss {
                            operation: format!("{} {}", operation.label(), path_value),
                            content_type: declared.to_string(),
                        });
                    };

                    if let Err(e) = validate_request_schema(request, entry, path_value) {
                        errors.push(e);
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidateError::Invalid { errors })
        }
    }
}

impl std::fmt::Debug for RequestBodyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("RequestBodyValidator")
            .field("openapi", &self.document.openapi())
            .field("options", &self.options)
            .field("cached_schemas", &state.cache.len())
            .field(
                "pinned_path",
                &state.pinned.as_ref().map(|pin| pin.path_value.as_str()),
            )
            .finish()
    }
}
