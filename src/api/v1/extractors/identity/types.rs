/*
 * Responsibility
 * - The "resolved identity" type handlers see
 * - Built from the identity headers the middleware stamped; token lookup
 *   itself belongs to services::oauth
 */
use axum::http::HeaderMap;

use crate::services::oauth::headers::{X_CALLER_ID, X_CLIENT_ID, header_id};

/// Identity attached to a request whose access token was resolved.
///
/// - `caller_id`: the end user the token was issued to
/// - `client_id`: the client application that obtained the token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub caller_id: i64,
    pub client_id: i64,
}

impl Identity {
    /// Both headers must be present and numeric; the middleware never sets just one.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Some(Self {
            caller_id: header_id(headers, &X_CALLER_ID)?,
            client_id: header_id(headers, &X_CLIENT_ID)?,
        })
    }
}
