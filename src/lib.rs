//! Request identity resolution against a remote OAuth token authority.
//!
//! The core lives in [`services::oauth`]; the rest is the axum server that
//! hosts it.
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
