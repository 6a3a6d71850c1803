// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication and role gates.
//!
//! `require_auth` must run before `require_operator` / `require_superadmin`,
//! which read the [`AuthUser`] it leaves in the request extensions.

use crate::error::AppError;
use crate::models::Operator;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie set by the frontend after sign-in.
pub const SESSION_COOKIE: &str = "ride_token";

/// Sessions last one event weekend plus slack.
const SESSION_TTL_SECS: usize = 7 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity-provider uid)
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Cookie wins over the header
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => bearer_token(&request).ok_or(StatusCode::UNAUTHORIZED)?,
    };

    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);
    let token_data =
        decode::<Claims>(&token, &key, &validation).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(AuthUser {
        uid: token_data.claims.sub,
    });
    Ok(next.run(request).await)
}

/// The [`AuthUser`] left by `require_auth`, owned so no borrow of the
/// request is held across the profile lookup.
fn auth_user(request: &Request) -> Result<AuthUser, AppError> {
    request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AppError::Unauthorized)
}

/// Load the caller's stored role and turn it into an [`Operator`].
async fn load_operator(state: &AppState, user: AuthUser) -> Result<Operator, AppError> {
    let profile = state
        .db
        .get_user(&user.uid)
        .await?
        .ok_or_else(|| AppError::Forbidden("No user profile".to_string()))?;

    Operator::from_profile(&profile).ok_or_else(|| {
        tracing::warn!(uid = %user.uid, role = ?profile.role, "Non-operator hit admin route");
        AppError::Forbidden("Operator role required".to_string())
    })
}

/// Admin or superadmin only. Inserts the [`Operator`] for handlers.
pub async fn require_operator(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match auth_user(&request) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    match load_operator(&state, user).await {
        Ok(operator) => {
            request.extensions_mut().insert(operator);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Superadmin only.
pub async fn require_superadmin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match auth_user(&request) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    match load_operator(&state, user).await {
        Ok(operator) if operator.role().can_manage_roles() => {
            request.extensions_mut().insert(operator);
            next.run(request).await
        }
        Ok(operator) => {
            tracing::warn!(uid = %operator.uid(), role = ?operator.role(), "Role change refused");
            AppError::Forbidden("Superadmin role required".to_string()).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Create a JWT for a user session.
pub fn create_jwt(uid: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;
    let claims = Claims {
        sub: uid.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
