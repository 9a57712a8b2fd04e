/*!
 * Identity extractor
 *
 * Responsibility:
 * - Hand the identity resolved by the middleware (X-Caller-Id / X-Client-Id)
 *   to handlers
 * - axum dependent code lives in core, the type itself in types
 *
 * Public API:
 * - Identity
 * - IdentityExtractor
 */

mod core;
mod types;

pub use self::core::IdentityExtractor;
pub use self::types::Identity;
