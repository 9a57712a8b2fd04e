//! Token authority interface used by the identity resolver.
use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;

/// Raw answer of the token authority. Decoding is the resolver's job.
#[derive(Debug, Clone)]
pub struct AuthorityResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl AuthorityResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failures before any response was obtained.
///
/// Note:
/// - Messages may contain low-level details. They are logged, never returned
///   to the client.
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("invalid token authority url: {0}")]
    InvalidUrl(String),
    /// `.` and `..` cannot be sent as a path segment; URL normalisation drops them.
    #[error("access token id cannot be addressed as a path segment")]
    UnaddressableTokenId,
    #[error("token authority request timed out")]
    Timeout,
    #[error("token authority transport error: {0}")]
    Transport(String),
}

/// Looks up an access token by id on the remote authority.
///
/// Implementations are shared across request tasks, so they must be usable
/// concurrently without external locking.
#[async_trait]
pub trait TokenAuthority: Send + Sync + 'static {
    // Returns the authority name (for logging).
    fn authority_name(&self) -> &'static str;

    // GET the access token record identified by `access_token_id`.
    //
    // Returns:
    // - `Ok(response)` whenever the authority answered, whatever the status
    // - `Err(_)` when no response could be obtained
    async fn get_access_token(
        &self,
        access_token_id: &str,
    ) -> Result<AuthorityResponse, AuthorityError>;
}
