// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated riders.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    NewRegistration, QrPayload, Registration, RegistrationStatus, RegistrationType, RiderDetails,
    RiderNumber, UserProfile, UserRole,
};
use crate::services::{certificate_pdf, TicketError};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/registrations", post(create_registration))
        .route("/api/me/registration", get(get_my_registration))
        .route("/api/me/registration/rider2", put(add_second_rider))
        .route("/api/me/registration/cancel", post(request_cancellation))
        .route("/api/me/tickets/{rider}", get(get_ticket))
        .route("/api/me/tickets/{rider}/pdf", get(get_ticket_pdf))
        .route("/api/me/certificates/{rider}/pdf", get(get_certificate_pdf))
}

impl From<TicketError> for AppError {
    fn from(err: TicketError) -> Self {
        AppError::Internal(anyhow::anyhow!("{}", err))
    }
}

pub(crate) fn parse_rider(raw: u8) -> Result<RiderNumber> {
    RiderNumber::try_from(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

async fn my_registration(state: &AppState, user: &AuthUser) -> Result<Registration> {
    state
        .db
        .get_registration(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("No registration for this account".to_string()))
}

/// Build a `Content-Disposition: attachment` value with a percent-encoded name.
pub(crate) fn attachment(filename: &str) -> HeaderValue {
    let encoded = urlencoding::encode(filename);
    HeaderValue::from_str(&format!("attachment; filename*=UTF-8''{}", encoded))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn pdf_response(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, attachment(filename)),
        ],
        bytes,
    )
        .into_response()
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: UserRole,
}

/// Get the caller's profile, creating a plain rider profile on first visit.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = match state.db.get_user(&user.uid).await? {
        Some(profile) => profile,
        None => {
            let profile = UserProfile {
                uid: user.uid.clone(),
                email: None,
                display_name: None,
                role: UserRole::User,
                created_at: now_rfc3339(),
            };
            state.db.upsert_user(&profile).await?;
            tracing::info!(uid = %user.uid, "Created user profile");
            profile
        }
    };

    Ok(Json(UserResponse {
        uid: profile.uid,
        email: profile.email,
        display_name: profile.display_name,
        role: profile.role,
    }))
}

// ─── Registration ────────────────────────────────────────────

/// Register the caller. One registration per account, keyed by uid.
async fn create_registration(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<NewRegistration>,
) -> Result<(StatusCode, Json<Registration>)> {
    request.validate()?;
    if request.registration_type == RegistrationType::Solo && request.rider2.is_some() {
        return Err(AppError::BadRequest(
            "Solo registrations cannot name a second rider".to_string(),
        ));
    }

    if state.db.get_registration(&user.uid).await?.is_some() {
        return Err(AppError::Conflict(
            "This account is already registered".to_string(),
        ));
    }

    let registration = Registration::new_pending(&user.uid, &user.uid, request, &now_rfc3339());
    state.db.create_registration(&registration).await?;

    tracing::info!(
        registration_id = %registration.id,
        registration_type = ?registration.registration_type,
        "Registration created"
    );
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn get_my_registration(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Registration>> {
    Ok(Json(my_registration(&state, &user).await?))
}

/// Turn a solo registration into a duo, or replace a not-yet-checked-in rider 2.
async fn add_second_rider(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(rider2): Json<RiderDetails>,
) -> Result<Json<Registration>> {
    rider2.validate()?;

    let registration = my_registration(&state, &user).await?;
    if !matches!(
        registration.status,
        RegistrationStatus::Pending | RegistrationStatus::Approved
    ) {
        return Err(AppError::Conflict(format!(
            "Cannot change riders on a {} registration",
            registration.status
        )));
    }
    if registration.rider2_checked_in {
        return Err(AppError::Conflict(
            "Rider 2 is already checked in".to_string(),
        ));
    }

    state.db.set_rider2(&registration.id, &rider2).await?;
    tracing::info!(registration_id = %registration.id, "Second rider set");

    Ok(Json(my_registration(&state, &user).await?))
}

/// Pending registrations are cancelled outright; approved ones need an
/// organizer to accept the request.
async fn request_cancellation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Registration>> {
    let registration = my_registration(&state, &user).await?;
    if registration.rider1_checked_in || registration.rider2_checked_in {
        return Err(AppError::Conflict(
            "Checked-in registrations cannot be cancelled".to_string(),
        ));
    }

    let next = match registration.status {
        RegistrationStatus::Pending => RegistrationStatus::Cancelled,
        RegistrationStatus::Approved => RegistrationStatus::CancellationRequested,
        other => {
            return Err(AppError::Conflict(format!(
                "Registration is already {}",
                other
            )))
        }
    };

    state
        .db
        .set_registration_status(&registration.id, next)
        .await?;
    tracing::info!(registration_id = %registration.id, status = %next, "Cancellation requested");

    Ok(Json(my_registration(&state, &user).await?))
}

// ─── Tickets and Certificates ────────────────────────────────

/// Ticket for one rider.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub registration_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub rider: RiderNumber,
    pub full_name: String,
    /// Text encoded in the QR code
    pub payload: String,
    /// `data:image/png;base64,...`
    pub qr_png: String,
}

/// The rider's details, once the registration is approved.
fn ticket_holder(registration: &Registration, rider: RiderNumber) -> Result<&RiderDetails> {
    if registration.status != RegistrationStatus::Approved {
        return Err(AppError::Conflict(format!(
            "Tickets are issued for approved registrations; this one is {}",
            registration.status
        )));
    }
    registration
        .rider(rider)
        .ok_or_else(|| AppError::NotFound(format!("No rider {} on this registration", rider)))
}

async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(rider): Path<u8>,
) -> Result<Json<TicketResponse>> {
    let rider = parse_rider(rider)?;
    let registration = my_registration(&state, &user).await?;
    let holder = ticket_holder(&registration, rider)?;

    let payload = QrPayload::new(registration.id.clone(), rider);
    let png = state.tickets.ticket_png(&payload)?;

    Ok(Json(TicketResponse {
        registration_id: registration.id.clone(),
        rider,
        full_name: holder.full_name.clone(),
        payload: payload.encode(),
        qr_png: format!("data:image/png;base64,{}", STANDARD.encode(png)),
    }))
}

async fn get_ticket_pdf(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(rider): Path<u8>,
) -> Result<Response> {
    let rider = parse_rider(rider)?;
    let registration = my_registration(&state, &user).await?;
    let holder = ticket_holder(&registration, rider)?;

    let payload = QrPayload::new(registration.id.clone(), rider);
    let caption = [
        holder.full_name.clone(),
        format!("Rider {} - {}", rider, state.config.event_name),
        registration.id.clone(),
    ];
    let pdf = state.tickets.ticket_pdf(&payload, &caption)?;

    let filename = format!("ticket-{}-rider{}.pdf", holder.full_name, rider);
    Ok(pdf_response(pdf, &filename))
}

async fn get_certificate_pdf(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(rider): Path<u8>,
) -> Result<Response> {
    let rider = parse_rider(rider)?;
    let registration = my_registration(&state, &user).await?;
    let holder = registration
        .rider(rider)
        .ok_or_else(|| AppError::NotFound(format!("No rider {} on this registration", rider)))?;

    if !registration.certificate_granted || !registration.is_finished(rider) {
        return Err(AppError::Forbidden(
            "Certificate not available for this rider".to_string(),
        ));
    }

    let pdf = certificate_pdf(&state.config.event_name, &holder.full_name)?;
    let filename = format!("certificate-{}.pdf", holder.full_name);
    Ok(pdf_response(pdf, &filename))
}
