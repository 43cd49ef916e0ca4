//! Route template matching for HTTP triggers.
//!
//! Templates use `:paramName` segments, e.g. `/orders/:id/items/:itemId`.
//! A match requires an equal segment count; static segments must match
//! exactly. No match yields an empty mapping.

use std::collections::HashMap;

/// Extract path parameters from a route template against a request
/// path. Returns an empty map on any mismatch.
pub fn match_route(template: &str, path: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    let template_segments: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if template_segments.len() != path_segments.len() {
        return HashMap::new();
    }

    for (template_segment, path_segment) in template_segments.iter().zip(&path_segments) {
        if let Some(name) = template_segment.strip_prefix(':') {
            params.insert(name.to_string(), (*path_segment).to_string());
        } else if template_segment != path_segment {
            return HashMap::new();
        }
    }

    params
}

/// Whether a request path satisfies a route template at all.
pub fn validate_route(template: &str, path: &str) -> bool {
    let template_segments: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if template_segments.len() != path_segments.len() {
        return false;
    }

    template_segments
        .iter()
        .zip(&path_segments)
        .all(|(t, p)| t.starts_with(':') || t == p)
}

/// Last non-empty segment of a path, used by triggers to pick the
/// workflow name out of the request path.
pub fn extract_workflow_name(path: &str) -> Option<&str> {
    path.split('/').filter(|s| !s.is_empty()).last()
}
