// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Organizer routes: registration review, ride completion, roles.
//!
//! Every handler here runs behind `require_operator` (or
//! `require_superadmin` for roles), which supplies the [`Operator`].

use crate::error::{AppError, Result};
use crate::models::{Operator, Registration, RegistrationStatus, RiderNumber, UserRole};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 500;

/// Operator routes. Auth and role middleware are applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/registrations", get(list_registrations))
        .route(
            "/api/admin/registrations/{id}/status",
            put(update_status),
        )
        .route("/api/admin/registrations/{id}/finish", post(mark_finished))
        .route(
            "/api/admin/registrations/{id}/certificate",
            post(grant_certificate),
        )
}

/// Superadmin-only routes.
pub fn role_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/users/{uid}/role", put(update_role))
}

async fn load(state: &AppState, id: &str) -> Result<Registration> {
    state
        .db
        .get_registration(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))
}

// ─── Registrations ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<RegistrationStatus>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegistrationListResponse {
    pub registrations: Vec<Registration>,
    pub count: usize,
}

async fn list_registrations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<RegistrationListResponse>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let registrations = state.db.list_registrations(params.status, limit).await?;

    Ok(Json(RegistrationListResponse {
        count: registrations.len(),
        registrations,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: RegistrationStatus,
}

/// Move a registration through its lifecycle. Re-applying the current
/// status is accepted and writes nothing.
async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Registration>> {
    let registration = load(&state, &id).await?;
    if registration.status == update.status {
        return Ok(Json(registration));
    }
    if !registration.status.can_transition_to(update.status) {
        return Err(AppError::Conflict(format!(
            "Cannot move registration from {} to {}",
            registration.status, update.status
        )));
    }

    state.db.set_registration_status(&id, update.status).await?;
    tracing::info!(
        registration_id = %id,
        from = %registration.status,
        to = %update.status,
        operator = %operator.uid(),
        "Registration status changed"
    );

    Ok(Json(load(&state, &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct FinishRequest {
    pub rider: RiderNumber,
}

/// Record that a checked-in rider completed the ride.
async fn mark_finished(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(id): Path<String>,
    Json(request): Json<FinishRequest>,
) -> Result<Json<Registration>> {
    let registration = load(&state, &id).await?;
    if registration.rider(request.rider).is_none() {
        return Err(AppError::NotFound(format!(
            "Rider {} is not on registration {}",
            request.rider, id
        )));
    }
    if !registration.is_checked_in(request.rider) {
        return Err(AppError::Conflict(format!(
            "Rider {} has not checked in",
            request.rider
        )));
    }

    if !registration.is_finished(request.rider) {
        state.db.mark_rider_finished(&id, request.rider).await?;
        tracing::info!(
            registration_id = %id,
            rider = %request.rider,
            operator = %operator.uid(),
            "Rider finished"
        );
    }

    Ok(Json(load(&state, &id).await?))
}

/// Allow riders of this registration to download finisher certificates.
async fn grant_certificate(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(id): Path<String>,
) -> Result<Json<Registration>> {
    let registration = load(&state, &id).await?;
    if registration.status != RegistrationStatus::Approved {
        return Err(AppError::Conflict(format!(
            "Registration is {}, not approved",
            registration.status
        )));
    }
    if !registration.rider1_finished && !registration.rider2_finished {
        return Err(AppError::Conflict(
            "No rider on this registration has finished".to_string(),
        ));
    }

    state.db.grant_certificate(&id).await?;
    tracing::info!(registration_id = %id, operator = %operator.uid(), "Certificate granted");

    Ok(Json(load(&state, &id).await?))
}

// ─── Roles ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: UserRole,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoleResponse {
    pub uid: String,
    pub role: UserRole,
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(uid): Path<String>,
    Json(update): Json<RoleUpdate>,
) -> Result<Json<RoleResponse>> {
    // Self-demotion is refused.
    if uid == operator.uid() && update.role != UserRole::Superadmin {
        return Err(AppError::BadRequest(
            "Superadmins cannot change their own role".to_string(),
        ));
    }

    state.db.set_user_role(&uid, update.role).await?;
    tracing::info!(uid = %uid, role = ?update.role, operator = %operator.uid(), "Role changed");

    Ok(Json(RoleResponse {
        uid,
        role: update.role,
    }))
}
