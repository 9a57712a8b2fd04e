/*
 * Responsibility
 * - Public interface of the middlewares
 * - auth::identity::apply(...), http::apply(...)
 */
pub mod auth;
pub mod http;
