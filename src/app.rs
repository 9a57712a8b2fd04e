/*
 * Responsibility
 * - tracing / panic hook setup
 * - Load Config → build dependencies (token authority client, resolver) → assemble Router
 * - Apply middleware (identity resolution on /api/v1, HTTP layers on everything)
 * - Serve with axum::serve()
 */
use std::{panic, process};

use anyhow::Result;
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, v1::handlers::health::health};
use crate::config::Config;
use crate::middleware;
use crate::services::oauth::build_identity_resolver;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,oauth_identity=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing; stderr may be hidden depending on
        // how the process is launched.
        tracing::error!(?info, "panic");

        // Development: crash the whole process so it gets noticed.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting identity gateway in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_state(config: &Config) -> Result<AppState> {
    // The token authority client is created once here and shared by every request.
    let identity = build_identity_resolver(config)?;
    Ok(AppState::new(identity))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let v1 = middleware::auth::identity::apply(api::v1::routes(), state.clone());

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", v1)
        .with_state(state);

    middleware::http::apply(router, config)
}
