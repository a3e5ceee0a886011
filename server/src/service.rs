//! Paste lifecycle: creation, view consumption and removal.
//!
//! Every operation takes "now" explicitly so callers (and tests) decide
//! which clock applies.

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use pastebin_lite_common::{CreatePaste, PasteView, ValidationError};
use rand::Rng;
use tracing::{error, warn};

use crate::error::{AppError, Result};
use crate::paste::Paste;
use crate::short_code::{Generator, PasteId};
use crate::store::{PasteStore, StoreError};

/// Fresh codes to try before giving up on a create. With 64^10 codes a
/// single collision is already unlikely.
const MAX_ID_ATTEMPTS: usize = 16;

/// Validates `request` and stores it as a new paste, returning its id.
///
/// A `ttl_seconds` turns into an absolute expiry `ttl_seconds * 1000` ms
/// after `now`.
pub async fn create_paste<R: Rng + Send>(
    store: &dyn PasteStore,
    rng: &mut R,
    request: CreatePaste,
    now: DateTime<Utc>,
) -> Result<PasteId> {
    request.validate()?;

    let expires_at = request
        .ttl_seconds
        .map(|ttl| expiry_after(now, ttl))
        .transpose()?;
    let max_views = request
        .max_views
        .map(i64::try_from)
        .transpose()
        .map_err(|_| ValidationError::OutOfRange { field: "max_views" })?;

    let mut paste = Paste::new(
        rng.sample(Generator),
        request.content,
        expires_at,
        max_views,
        now,
    );

    for _ in 0..MAX_ID_ATTEMPTS {
        match store.insert(&paste).await {
            Ok(()) => return Ok(paste.id),
            Err(StoreError::Conflict(id)) => {
                warn!(%id, "Short code already taken, drawing another");
                paste.id = rng.sample(Generator);
            }
            Err(e) => return Err(e.into()),
        }
    }

    error!("Failed to generate a valid shortcode");
    Err(AppError::Internal(anyhow!(
        "no free short code after {MAX_ID_ATTEMPTS} attempts"
    )))
}

fn expiry_after(now: DateTime<Utc>, ttl_seconds: u64) -> Result<DateTime<Utc>, ValidationError> {
    let out_of_range = ValidationError::OutOfRange {
        field: "ttl_seconds",
    };

    i64::try_from(ttl_seconds)
        .ok()
        .and_then(|secs| secs.checked_mul(1000))
        .and_then(Duration::try_milliseconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(out_of_range)
}

/// Takes one view of the paste named by the untrusted `raw_id`.
///
/// Unknown, malformed, expired and exhausted ids are all
/// [`AppError::NotFound`].
pub async fn consume_paste(
    store: &dyn PasteStore,
    raw_id: &str,
    now: DateTime<Utc>,
) -> Result<PasteView> {
    let Ok(id) = raw_id.parse::<PasteId>() else {
        return Err(AppError::NotFound);
    };

    store
        .consume(&id, now)
        .await?
        .map(PasteView::from)
        .ok_or(AppError::NotFound)
}

/// Removes a paste. Unknown and malformed ids are a no-op.
pub async fn delete_paste(store: &dyn PasteStore, raw_id: &str) -> Result<()> {
    if let Ok(id) = raw_id.parse::<PasteId>() {
        store.delete(&id).await?;
    }
    Ok(())
}
