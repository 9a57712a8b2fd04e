//! Identity resolution middleware: `?access_token=` → X-Caller-Id / X-Client-Id.
//!
//! - Public requests (`X-Public: true`) skip the token authority; identity
//!   headers are still stripped so a forged value never reaches a handler.
//! - Other requests go through `IdentityResolver::authenticate_request`.
//!   Unknown or missing tokens leave the request unauthenticated; rejecting it
//!   is up to the handler (see the `Identity` extractor).
//! - Authority failures are answered directly (`AuthError` is `IntoResponse`).

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::services::oauth::{self, AuthError, headers};
use crate::state::AppState;

/// Apply identity resolution to every route of `router`.
///
/// ```ignore
/// let v1 = api::v1::routes();
/// let v1 = middleware::auth::identity::apply(v1, state.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8: `from_fn` cannot use the State extractor, so pass state via `from_fn_with_state`
    router.layer(middleware::from_fn_with_state(state, identity_middleware))
}

async fn identity_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if oauth::is_public(Some(&req)) {
        headers::clear_identity(req.headers_mut());
        return Ok(next.run(req).await);
    }

    if let Err(err) = state.identity.authenticate_request(Some(&mut req)).await {
        tracing::warn!(
            status = %err.status(),
            error = %err,
            "identity resolution failed"
        );
        return Err(err);
    }

    Ok(next.run(req).await)
}
