//! Contract loading from various sources.
//!
//! Handles loading OpenAPI documents (JSON or YAML) from files, strings, and HTTP URLs.

use std::path::Path;

use serde_json::Value;

use crate::document::Document;
use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a contract from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, a parse error
/// if the content is neither JSON nor YAML, or a document error if it is not
/// an OpenAPI 3 document.
pub fn load_contract(path: &Path) -> Result<Document, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_contract_str(&content)
}

/// Load a contract from a JSON or YAML string.
///
/// Content starting with `{` is parsed as JSON, anything else as YAML.
pub fn load_contract_str(content: &str) -> Result<Document, LoadError> {
    Document::from_value(parse_value(content)?)
}

fn parse_value(content: &str) -> Result<Value, LoadError> {
    if content.trim_start().starts_with('{') {
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
    } else {
        serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })
    }
}

/// Load a contract from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or the same parse
/// and document errors as [`load_contract_str`].
#[cfg(feature = "remote")]
pub fn load_contract_url(url: &str) -> Result<Document, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before parsing
    let response = response
        .error_for_status()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let body = response.text().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })?;

    load_contract_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a contract from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
pub fn load_contract_auto(source: &str) -> Result<Document, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_contract_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_contract(Path::new(source))
    }
}

/// Navigate a local reference fragment (e.g. `#/components/schemas/Pet`).
///
/// The fragment is a JSON Pointer prefixed with `#`; `~1` and `~0` escapes
/// are honored. `#` alone refers to the root.
pub fn navigate_fragment<'a>(root: &'a Value, fragment: &str) -> Option<&'a Value> {
    let pointer = fragment.strip_prefix('#').unwrap_or(fragment);
    if pointer.is_empty() {
        return Some(root);
    }
    root.pointer(pointer)
}

/// Escape a single JSON Pointer token (`~` → `~0`, `/` → `~1`).
pub(crate) fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
