/*
 * Responsibility
 * - GET /whoami: echo the identity resolved by the middleware
 * - 401 when the request stayed unauthenticated (extractor rejection)
 */
use axum::Json;

use crate::api::v1::{dto::whoami::WhoAmIResponse, extractors::IdentityExtractor};

pub async fn whoami(IdentityExtractor(identity): IdentityExtractor) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        caller_id: identity.caller_id,
        client_id: identity.client_id,
    })
}
