// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stateless check-in endpoints for desks that decode on the client or
//! upload single snapshots.

use crate::checkin::{self, CheckInError, CheckInReceipt, Review};
use crate::error::{AppError, Result};
use crate::models::{Operator, PayloadError, QrPayload, RiderNumber};
use crate::scanner::GrayFrame;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Phone camera snapshots run a few megabytes.
const MAX_SNAPSHOT_BYTES: usize = 8 * 1024 * 1024;

/// Operator routes. Auth and role middleware are applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/checkin/lookup", post(lookup))
        .route(
            "/api/admin/checkin/scan",
            post(scan).layer(DefaultBodyLimit::max(MAX_SNAPSHOT_BYTES)),
        )
        .route("/api/admin/checkin/confirm", post(confirm))
}

/// A review plus what the confirm button should look like.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    #[serde(flatten)]
    pub review: Review,
    pub can_confirm: bool,
    pub confirm_label: String,
    pub blocked_reason: Option<String>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            can_confirm: review.can_confirm(),
            confirm_label: review.confirm_label().to_string(),
            blocked_reason: review.blocked_reason().map(str::to_string),
            review,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    /// Raw decoded QR text
    pub payload: String,
}

async fn lookup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LookupRequest>,
) -> Result<Json<ReviewResponse>> {
    let review = checkin::lookup_text(state.db.as_ref(), &request.payload).await?;
    Ok(Json(review.into()))
}

/// Decode a QR code from an uploaded PNG or JPEG snapshot, then look it up.
async fn scan(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<ReviewResponse>> {
    let decoder = Arc::clone(&state.decoder);
    let decoded = tokio::task::spawn_blocking(move || {
        GrayFrame::from_image_bytes(&body).map(|frame| decoder.decode(&frame))
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?;

    let text = match decoded {
        Ok(Some(text)) => text,
        Ok(None) => {
            return Err(AppError::BadRequest(
                "No QR code found in the image".to_string(),
            ))
        }
        Err(err) => return Err(CheckInError::Capture(err).into()),
    };

    let review = checkin::lookup_text(state.db.as_ref(), &text).await?;
    Ok(Json(review.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub registration_id: String,
    pub rider: RiderNumber,
}

async fn confirm(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<CheckInReceipt>> {
    if request.registration_id.trim().is_empty() {
        return Err(CheckInError::Payload(PayloadError::EmptyRegistrationId).into());
    }

    let payload = QrPayload::new(request.registration_id, request.rider);
    let receipt = checkin::confirm(state.db.as_ref(), &operator, &payload).await?;
    Ok(Json(receipt))
}
