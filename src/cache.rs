//! Pre-rendered request body schemas, keyed by content fingerprint.
//!
//! The cache is filled eagerly when a validator is constructed so that the
//! request path never renders or compiles a schema. Entries are only ever
//! added, never replaced or removed.

use std::collections::HashMap;

use jsonschema::{Draft, Validator};
use tracing::{debug, info};

use crate::document::{Document, PathItem, Schema};
use crate::error::CacheBuildError;
use crate::fingerprint::Fingerprint;
use crate::render::{convert_yaml_to_json, render_inline, to_inline_bytes, RenderOptions};
use crate::schema_validation::compile;
use crate::types::ValidatorOptions;

/// One rendered schema, ready for validation.
pub struct CacheEntry {
    schema: Schema,
    rendered_inline: Vec<u8>,
    rendered_json: Vec<u8>,
    validator: Validator,
}

impl CacheEntry {
    /// Render and compile `schema`; `location` names it in errors.
    pub fn render(
        schema: &Schema,
        document: &Document,
        options: &ValidatorOptions,
        location: &str,
    ) -> Result<Self, CacheBuildError> {
        let render_options = RenderOptions {
            strict: options.strict,
            nullable_keyword: document.is_openapi_30(),
        };

        let inlined = render_inline(schema, document.root(), &render_options).map_err(|source| {
            CacheBuildError::Render {
                location: location.to_string(),
                source,
            }
        })?;
        let rendered_inline =
            to_inline_bytes(&inlined).map_err(|source| CacheBuildError::Render {
                location: location.to_string(),
                source,
            })?;
        let rendered_json =
            convert_yaml_to_json(&rendered_inline).map_err(|source| CacheBuildError::Conversion {
                location: location.to_string(),
                source,
            })?;

        let draft = if document.is_openapi_30() {
            Draft::Draft4
        } else {
            Draft::Draft202012
        };
        let validator = compile(&rendered_json, draft, options.format_assertions).map_err(
            |message| CacheBuildError::Compile {
                location: location.to_string(),
                message,
            },
        )?;

        Ok(Self {
            schema: schema.clone(),
            rendered_inline,
            rendered_json,
            validator,
        })
    }

    /// The schema node this entry was rendered from.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// YAML rendering with every reference inlined.
    pub fn rendered_inline(&self) -> &[u8] {
        &self.rendered_inline
    }

    /// Canonical JSON rendering handed to the validation engine.
    pub fn rendered_json(&self) -> &[u8] {
        &self.rendered_json
    }

    pub(crate) fn validator(&self) -> &Validator {
        &self.validator
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("schema", &self.schema.pointer())
            .field("rendered_json_len", &self.rendered_json.len())
            .finish_non_exhaustive()
    }
}

/// Mapping from schema fingerprint to its rendered entry.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: HashMap<Fingerprint, CacheEntry>,
}

impl SchemaCache {
    /// Render every request body schema reachable from the document's path items.
    ///
    /// # Errors
    ///
    /// Fails on the first schema that cannot be rendered, converted or compiled.
    pub fn build(document: &Document, options: &ValidatorOptions) -> Result<Self, CacheBuildError> {
        let mut cache = Self::default();

        for (template, item) in document.path_items() {
            let rendered = render_path_item(document, template, item, options, &|fp| {
                cache.contains(fp)
            })?;
            for (fingerprint, entry) in rendered {
                cache.insert(fingerprint, entry);
            }
        }

        info!(entries = cache.len(), "schema cache built");
        Ok(cache)
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&CacheEntry> {
        self.entries.get(fingerprint)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached fingerprints, sorted.
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        let mut fingerprints: Vec<Fingerprint> = self.entries.keys().copied().collect();
        fingerprints.sort();
        fingerprints
    }

    /// Insert an entry unless the fingerprint is already cached.
    ///
    /// Returns true if the entry was added.
    pub(crate) fn insert(&mut self, fingerprint: Fingerprint, entry: CacheEntry) -> bool {
        if self.entries.contains_key(&fingerprint) {
            return false;
        }
        self.entries.insert(fingerprint, entry);
        true
    }
}

/// Render the request body schemas of one path item that `known` does not
/// already cover. Each distinct fingerprint is rendered at most once.
pub(crate) fn render_path_item(
    document: &Document,
    template: &str,
    item: &PathItem,
    options: &ValidatorOptions,
    known: &dyn Fn(&Fingerprint) -> bool,
) -> Result<Vec<(Fingerprint, CacheEntry)>, CacheBuildError> {
    let mut rendered: Vec<(Fingerprint, CacheEntry)> = Vec::new();

    for operation in item.operations_with_request_body() {
        let Some(body) = &operation.request_body else {
            continue;
        };
        for (content_type, media) in &body.content {
            let Some(schema) = &media.schema else {
                continue;
            };

            let fingerprint = Fingerprint::of(schema, document.root());
            if known(&fingerprint) || rendered.iter().any(|(fp, _)| *fp == fingerprint) {
                debug!(%fingerprint, %template, %content_type, "schema already rendered");
                continue;
            }

            let location = format!("{} {} ({})", operation.method, template, content_type);
            let entry = CacheEntry::render(schema, document, options, &location)?;
            rendered.push((fingerprint, entry));
        }
    }

    Ok(rendered)
}
