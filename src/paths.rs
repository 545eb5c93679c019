//! Mapping a request URL onto a contract path template.

use http::Request;

use crate::document::{Document, PathItem};
use crate::error::ValidationError;

/// A path item matched for a request, with the template that matched.
#[derive(Debug, Clone, Copy)]
pub struct PathMatch<'a> {
    pub path_item: &'a PathItem,
    pub path_value: &'a str,
}

/// Find the path item for `request`.
///
/// Server base paths are stripped when they prefix the request path. When
/// several templates match, the one with the fewest templated segments wins;
/// ties go to the template declared first.
///
/// # Errors
///
/// Returns a single `path` diagnostic when no template matches.
pub fn find_path<'a, B>(
    request: &Request<B>,
    document: &'a Document,
) -> Result<PathMatch<'a>, Vec<ValidationError>> {
    let request_path = request.uri().path();
    let candidates = candidate_paths(request_path, document.servers());

    let mut best: Option<(usize, PathMatch<'a>)> = None;
    for (template, path_item) in document.path_items() {
        let Some(params) = candidates
            .iter()
            .filter_map(|segments| match_template(template, segments))
            .min()
        else {
            continue;
        };
        if best.as_ref().map_or(true, |(fewest, _)| params < *fewest) {
            best = Some((
                params,
                PathMatch {
                    path_item,
                    path_value: template,
                },
            ));
        }
    }

    best.map(|(_, found)| found).ok_or_else(|| {
        vec![ValidationError::path_not_found(
            request.method().as_str(),
            request_path,
        )]
    })
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// The request path as-is, plus the remainder after each matching server base path.
fn candidate_paths<'p>(request_path: &'p str, servers: &[String]) -> Vec<Vec<&'p str>> {
    let full = segments(request_path);
    let mut candidates = vec![full.clone()];

    for server in servers {
        let base = segments(server_base_path(server));
        if base.is_empty() || base.len() > full.len() {
            continue;
        }
        let prefixed = base
            .iter()
            .zip(&full)
            .all(|(template, actual)| segment_matches(template, actual));
        if prefixed {
            candidates.push(full[base.len()..].to_vec());
        }
    }

    candidates
}

/// The path component of a server URL (`https://host/v1` → `/v1`).
fn server_base_path(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => url,
    }
}

/// Match a template against request segments, returning how many segments
/// were templated.
fn match_template(template: &str, actual: &[&str]) -> Option<usize> {
    let template = segments(template);
    if template.len() != actual.len() {
        return None;
    }

    let mut params = 0;
    for (t, a) in template.iter().zip(actual) {
        if !segment_matches(t, a) {
            return None;
        }
        if t.contains('{') {
            params += 1;
        }
    }
    Some(params)
}

/// Match one template segment such as `pets`, `{id}` or `{name}.{ext}`.
///
/// Every parameter has to consume at least one character.
fn segment_matches(template: &str, actual: &str) -> bool {
    let Some(literals) = literal_parts(template) else {
        return template == actual;
    };
    let Some((first, rest)) = literals.split_first() else {
        return template == actual;
    };
    let Some((last, middle)) = rest.split_last() else {
        return template == actual;
    };

    let Some(mut remaining) = actual.strip_prefix(first) else {
        return false;
    };
    for literal in middle {
        let skip = match remaining.chars().next() {
            Some(c) => c.len_utf8(),
            None => return false,
        };
        match remaining[skip..].find(literal) {
            Some(i) => remaining = &remaining[skip + i + literal.len()..],
            None => return false,
        }
    }

    remaining.len() > last.len() && remaining.ends_with(last)
}

/// Split a template segment into the literal text around its parameters.
///
/// `{name}.{ext}` → `["", ".", ""]`. Returns `None` for unbalanced braces.
fn literal_parts(template: &str) -> Option<Vec<&str>> {
    let mut literals = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        literals.push(&rest[..open]);
        let close = rest[open..].find('}')?;
        rest = &rest[open + close + 1..];
    }
    literals.push(rest);
    Some(literals)
}
