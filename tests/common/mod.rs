// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use ride_checkin::config::Config;
use ride_checkin::db::{DocumentStore, FirestoreDb, MemoryStore};
use ride_checkin::middleware::auth::create_jwt;
use ride_checkin::models::{
    NewRegistration, Registration, RegistrationStatus, RegistrationType, RiderDetails,
    UserProfile, UserRole,
};
use ride_checkin::routes::create_router;
use ride_checkin::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Arc::new(MemoryStore::new()))
}

/// Create a test app over the given store.
#[allow(dead_code)]
pub fn create_test_app_with(db: Arc<dyn DocumentStore>) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Config::test_default(), db));
    (create_router(state.clone()), state)
}

/// Create a test app whose store is the offline Firestore mock.
#[allow(dead_code)]
pub fn create_offline_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Arc::new(FirestoreDb::new_mock()))
}

#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, signing_key: &[u8]) -> String {
    create_jwt(uid, signing_key).expect("Failed to create JWT")
}

#[allow(dead_code)]
pub fn rider(name: &str) -> RiderDetails {
    RiderDetails {
        full_name: name.to_string(),
        age: 31,
        phone_number: "+63 917 555 0101".to_string(),
        photo_url: None,
    }
}

/// Store a duo registration owned by `id` with the given status.
#[allow(dead_code)]
pub async fn seed_registration(
    state: &AppState,
    id: &str,
    status: RegistrationStatus,
) -> Registration {
    let mut registration = Registration::new_pending(
        id,
        id,
        NewRegistration {
            registration_type: RegistrationType::Duo,
            rider1: rider("Ana Cruz"),
            rider2: Some(rider("Ben Cruz")),
        },
        "2026-03-01T08:00:00Z",
    );
    registration.status = status;
    state
        .db
        .create_registration(&registration)
        .await
        .expect("Failed to seed registration");
    registration
}

/// Store a user profile with the given role.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, uid: &str, role: UserRole) {
    state
        .db
        .upsert_user(&UserProfile {
            uid: uid.to_string(),
            email: Some(format!("{}@example.com", uid)),
            display_name: None,
            role,
            created_at: "2026-02-01T00:00:00Z".to_string(),
        })
        .await
        .expect("Failed to seed user");
}

/// Build an authenticated request with an optional JSON body.
#[allow(dead_code)]
pub fn authed_request(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}
