/*
 * Responsibility
 * - URL structure of v1
 * - Identity resolution is applied to the whole v1 router by app.rs
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::whoami::whoami;

pub fn routes() -> Router<AppState> {
    Router::new().route("/whoami", get(whoami))
}
