/*
 * Responsibility
 * - Wire shape of errors exchanged with the token authority (RestError)
 * - Failure kinds of identity resolution (AuthError)
 * - IntoResponse so the host can hand an AuthError straight back to the client
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const MSG_FETCH_FAILED: &str = "error when fetching access token";
pub(crate) const MSG_INVALID_ERROR_BODY: &str = "invalid error body when fetching access token";
pub(crate) const MSG_INVALID_TOKEN_BODY: &str = "error when unmarshalling access token response";

/// Structured error body used by the token authority on non-2xx responses.
///
/// The same shape is rendered back to clients, so an upstream rejection
/// reaches the end client unchanged.
///
/// Every field is optional on decode; a missing `status` reads as 0 and is
/// answered with 500 (see [`AuthError::status`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: String,
    // null and missing are both accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causes: Option<Vec<serde_json::Value>>,
}

impl RestError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let error = status
            .canonical_reason()
            .unwrap_or("unknown")
            .to_ascii_lowercase()
            .replace(' ', "_");

        Self {
            message: message.into(),
            status: status.as_u16(),
            error,
            causes: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }
}

/// Why a request could not be resolved to an identity.
///
/// "Not found" is never represented here: an unknown token leaves the request
/// unauthenticated instead of failing it.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The authority rejected the token; carried verbatim.
    #[error("token authority rejected access token: {} {}", .0.status, .0.message)]
    Upstream(RestError),

    /// No response could be obtained from the authority (transport error or timeout).
    #[error("error when fetching access token")]
    UpstreamUnavailable,

    /// The authority answered with a body we could not decode.
    #[error("{0}")]
    UpstreamProtocol(&'static str),
}

impl AuthError {
    /// Status line for the client. An upstream body claiming a non-error
    /// status (or none at all) still fails the request, so it maps to 500.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Upstream(rest) => StatusCode::from_u16(rest.status)
                .ok()
                .filter(|status| status.is_client_error() || status.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AuthError::UpstreamUnavailable | AuthError::UpstreamProtocol(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AuthError::Upstream(rest) => &rest.message,
            AuthError::UpstreamUnavailable => MSG_FETCH_FAILED,
            AuthError::UpstreamProtocol(message) => message,
        }
    }

    pub fn into_rest_error(self) -> RestError {
        match self {
            AuthError::Upstream(rest) => rest,
            AuthError::UpstreamUnavailable => RestError::internal(MSG_FETCH_FAILED),
            AuthError::UpstreamProtocol(message) => RestError::internal(message),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_rest_error())).into_response()
    }
}
