/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 *   - identity: the resolver, built once from Config at startup
 * - Cheap to clone (Arc inside)
 */
use std::sync::Arc;

use crate::services::oauth::IdentityResolver;

#[derive(Clone, Debug)]
pub struct AppState {
    pub identity: Arc<IdentityResolver>,
}

impl AppState {
    pub fn new(identity: Arc<IdentityResolver>) -> Self {
        Self { identity }
    }
}
