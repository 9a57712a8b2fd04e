use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

use super::Identity;

/// Extractor for handlers that require a resolved identity.
/// Assumes the identity middleware already ran on this route.
/// Rejects with 401 when the request stayed unauthenticated.
pub struct IdentityExtractor(pub Identity);

impl FromRequestParts<AppState> for IdentityExtractor
where
    AppState: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Identity::from_headers(&parts.headers)
            .map(IdentityExtractor)
            .ok_or(AppError::Unauthorized)
    }
}
