use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Collects HTTP request count and latency
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Collections whose next path segment is a document key
const KEYED_COLLECTIONS: &[&str] = &["students", "tests", "results"];

/// Fixed sub-routes that live beside a key segment
const STATIC_SEGMENTS: &[&str] = &["all", "upload"];

/// Normalize URL path to avoid cardinality explosion.
/// Usernames, test names and registration numbers become `{key}`.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut normalized = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let follows_collection = i > 0 && KEYED_COLLECTIONS.contains(&segments[i - 1]);
        if follows_collection && !segment.is_empty() && !STATIC_SEGMENTS.contains(segment) {
            normalized.push("{key}");
        } else if is_numeric_id(segment) {
            normalized.push("{id}");
        } else {
            normalized.push(segment);
        }
    }

    normalized.join("/")
}

/// Check if string is a numeric ID
fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/admin/students/asha.k"),
            "/admin/students/{key}"
        );
        assert_eq!(normalize_path("/admin/students/upload"), "/admin/students/upload");
        assert_eq!(normalize_path("/admin/students/all"), "/admin/students/all");
        assert_eq!(normalize_path("/admin/tests/Quiz%201"), "/admin/tests/{key}");
        assert_eq!(normalize_path("/results/ravi"), "/results/{key}");
        assert_eq!(normalize_path("/results"), "/results");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn test_is_numeric_id() {
        assert!(is_numeric_id("123"));
        assert!(!is_numeric_id("abc"));
        assert!(!is_numeric_id(""));
    }
}
