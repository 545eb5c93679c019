//! Content-type parsing and negotiation against declared media types.

use indexmap::IndexMap;

use crate::document::MediaType;
use crate::types::JSON_TYPE;

/// A parsed `Content-Type` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Lowercased `type/subtype`, parameters stripped.
    pub media_type: String,
    pub charset: Option<String>,
    pub boundary: Option<String>,
}

impl ContentType {
    /// Parse a header value such as `application/json; charset=utf-8`.
    pub fn parse(header: &str) -> Self {
        let mut parts = header.split(';');
        let media_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();

        let mut charset = None;
        let mut boundary = None;
        for param in parts {
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_string();
            match name.trim().to_ascii_lowercase().as_str() {
                "charset" => charset = Some(value),
                "boundary" => boundary = Some(value),
                _ => {}
            }
        }

        Self {
            media_type,
            charset,
            boundary,
        }
    }

    /// True for anything that mentions `json`, e.g. `application/problem+json`.
    pub fn is_json(&self) -> bool {
        self.media_type.contains(JSON_TYPE)
    }

    /// The `type` half of `type/subtype`.
    fn top_level(&self) -> &str {
        self.media_type
            .split_once('/')
            .map_or(self.media_type.as_str(), |(top, _)| top)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.media_type)
    }
}

/// Pick the declared media type entry for a request content type.
///
/// Preference: exact match (case-insensitive, declared parameters ignored),
/// then a `type/*` range, then `*/*`. Returns the declared key with the entry.
pub fn negotiate<'a>(
    content: &'a IndexMap<String, MediaType>,
    content_type: &ContentType,
) -> Option<(&'a str, &'a MediaType)> {
    let declared = move |wanted: &str| {
        content
            .iter()
            .find(|(key, _)| ContentType::parse(key).media_type == wanted)
            .map(|(key, media)| (key.as_str(), media))
    };

    declared(&content_type.media_type)
        .or_else(|| declared(&format!("{}/*", content_type.top_level())))
        .or_else(|| declared("*/*"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(keys: &[&str]) -> IndexMap<String, MediaType> {
        keys.iter()
            .map(|k| (k.to_string(), MediaType::default()))
            .collect()
    }

    #[test]
    fn parse_strips_parameters() {
        let ct = ContentType::parse("Application/JSON; charset=UTF-8");
        assert_eq!(ct.media_type, "application/json");
        assert_eq!(ct.charset.as_deref(), Some("UTF-8"));
        assert_eq!(ct.boundary, None);

        let ct = ContentType::parse("multipart/form-data; boundary=\"----abc\"");
        assert_eq!(ct.media_type, "multipart/form-data");
        assert_eq!(ct.boundary.as_deref(), Some("----abc"));
    }

    #[test]
    fn json_detection() {
        assert!(ContentType::parse("application/json").is_json());
        assert!(ContentType::parse("application/vnd.api+json").is_json());
        assert!(ContentType::parse("application/merge-patch+json; charset=utf-8").is_json());
        assert!(!ContentType::parse("application/xml").is_json());
        assert!(!ContentType::parse("text/plain").is_json());
    }

    #[test]
    fn exact_match_wins() {
        let content = content(&["*/*", "application/*", "application/json"]);
        let (key, _) = negotiate(&content, &ContentType::parse("application/json")).unwrap();
        assert_eq!(key, "application/json");
    }

    #[test]
    fn declared_parameters_and_case_are_ignored() {
        let content = content(&["Application/JSON; charset=utf-8"]);
        let (key, _) =
            negotiate(&content, &ContentType::parse("application/json; charset=latin1")).unwrap();
        assert_eq!(key, "Application/JSON; charset=utf-8");
    }

    #[test]
    fn ranges_fall_back_in_order() {
        let content = content(&["*/*", "application/*"]);
        let (key, _) = negotiate(&content, &ContentType::parse("application/json")).unwrap();
        assert_eq!(key, "application/*");

        let (key, _) = negotiate(&content, &ContentType::parse("text/plain")).unwrap();
        assert_eq!(key, "*/*");
    }

    #[test]
    fn no_match() {
        let content = content(&["application/json"]);
        assert!(negotiate(&content, &ContentType::parse("application/xml")).is_none());
    }
}
