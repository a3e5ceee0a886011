use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pastebin_lite_common::{CreatePaste, CreatedPaste, Deleted};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result};
use crate::service;
use crate::state::AppState;
use crate::time::Now;

#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    now: Now,
    body: Result<Json<CreatePaste>, JsonRejection>,
) -> Result<Json<CreatedPaste>> {
    let Json(request) = body?;

    if request.content.len() > state.config.max_paste_bytes {
        return Err(AppError::PayloadTooLarge);
    }

    let mut rng = StdRng::from_entropy();
    let id = service::create_paste(state.store.as_ref(), &mut rng, request, now.0).await?;
    info!(%id, "Created paste");

    Ok(Json(CreatedPaste {
        id: id.to_string(),
        url: state.config.paste_url(id.as_str()),
    }))
}

/// Public view endpoint. Every successful call counts as one view, so the
/// response must never be cached.
#[instrument(skip(state))]
pub async fn consume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    now: Now,
) -> Result<impl IntoResponse> {
    let view = service::consume_paste(state.store.as_ref(), &id, now.0).await?;
    Ok(([(CACHE_CONTROL, "no-store")], Json(view)))
}

#[instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Deleted>> {
    service::delete_paste(state.store.as_ref(), &id).await?;
    Ok(Json(Deleted { success: true }))
}

pub async fn health(State(state): State<AppState>) -> Result<(StatusCode, &'static str)> {
    state.store.health_check().await.map_err(|e| {
        warn!("Health check failed: {e}");
        AppError::Unavailable
    })?;
    Ok((StatusCode::OK, "ok"))
}
