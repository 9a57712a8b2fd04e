/*
 * Responsibility
 * - Wire contract between the resolver and downstream consumers
 *   (X-Public / X-Caller-Id / X-Client-Id, ?access_token=)
 * - Small pure helpers over HeaderMap / Uri, shared by resolver and extractors
 */
use axum::http::{HeaderMap, HeaderName, HeaderValue, Uri};

pub const X_PUBLIC: HeaderName = HeaderName::from_static("x-public");
pub const X_CALLER_ID: HeaderName = HeaderName::from_static("x-caller-id");
pub const X_CLIENT_ID: HeaderName = HeaderName::from_static("x-client-id");

pub const PARAM_ACCESS_TOKEN: &str = "access_token";

// Exact, case-sensitive match.
const PUBLIC_MARKER: &str = "true";

pub fn is_public_marked(headers: &HeaderMap) -> bool {
    headers
        .get(X_PUBLIC)
        .is_some_and(|v| v.as_bytes() == PUBLIC_MARKER.as_bytes())
}

/// Removes every value of both identity headers.
pub fn clear_identity(headers: &mut HeaderMap) {
    headers.remove(X_CALLER_ID);
    headers.remove(X_CLIENT_ID);
}

/// Replaces both identity headers so exactly one value of each is present.
pub fn set_identity(headers: &mut HeaderMap, caller_id: i64, client_id: i64) {
    headers.insert(X_CALLER_ID, HeaderValue::from(caller_id));
    headers.insert(X_CLIENT_ID, HeaderValue::from(client_id));
}

/// Reads an identity header as a base-10 `i64`.
pub fn header_id(headers: &HeaderMap, name: &HeaderName) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
}

/// First `access_token` query value, url-decoded and trimmed. Empty is `None`.
pub fn access_token_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == PARAM_ACCESS_TOKEN)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
