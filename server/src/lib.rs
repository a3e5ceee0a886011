#![warn(clippy::nursery, clippy::pedantic)]

//! HTTP service for Pastebin Lite: short-lived pastes that expire by time
//! or by view count.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use pastebin_lite_common::{PASTES_ENDPOINT, VIEW_ENDPOINT};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod paste;
pub mod service;
pub mod short_code;
pub mod state;
pub mod store;
pub mod time;

pub use config::Config;
pub use state::AppState;
pub use store::{PasteStore, SqliteStore};

/// Worst-case growth of content once JSON-escaped (`\u0000` per byte).
const JSON_ESCAPE_FACTOR: usize = 6;

/// Builds the router for all API and HTML routes.
pub fn app(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_paste_bytes
        .saturating_mul(JSON_ESCAPE_FACTOR)
        .saturating_add(1024);

    Router::new()
        .route("/", get(pages::index))
        .route("/healthz", get(handlers::health))
        .route(&format!("{VIEW_ENDPOINT}/:id"), get(pages::view))
        .route(PASTES_ENDPOINT, post(handlers::create))
        .route(
            &format!("{PASTES_ENDPOINT}/:id"),
            get(handlers::consume).delete(handlers::delete),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
