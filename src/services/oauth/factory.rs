/// Factory: build `IdentityResolver` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::oauth::{AuthorityError, HttpTokenAuthority, IdentityResolver};

pub fn build_identity_resolver(config: &Config) -> Result<Arc<IdentityResolver>, AuthorityError> {
    let authority = HttpTokenAuthority::new(config.oauth_base_url.clone(), config.oauth_timeout)?;

    tracing::info!(
        base_url = %authority.base_url(),
        timeout_ms = config.oauth_timeout.as_millis() as u64,
        "token authority client ready"
    );

    Ok(Arc::new(IdentityResolver::new(Arc::new(authority))))
}
