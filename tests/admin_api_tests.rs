// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Organizer API tests: listing, lifecycle, finish, certificates, roles.

use axum::http::StatusCode;
use ride_checkin::models::{RegistrationStatus, RiderNumber, UserRole};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{authed_request, body_json, create_test_app, seed_registration, seed_user};

#[tokio::test]
async fn test_list_filters_by_status() {
    let (app, state) = create_test_app();
    seed_user(&state, "admin", UserRole::Admin).await;
    let token = common::create_test_jwt("admin", &state.config.jwt_signing_key);

    seed_registration(&state, "a", RegistrationStatus::Approved).await;
    seed_registration(&state, "b", RegistrationStatus::Pending).await;
    seed_registration(&state, "c", RegistrationStatus::Approved).await;

    let response = app
        .clone()
        .oneshot(authed_request(
            "GET",
            "/api/admin/registrations?status=approved",
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 2);

    let response = app
        .clone()
        .oneshot(authed_request(
            "GET",
            "/api/admin/registrations?limit=1",
            &token,
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);

    let response = app
        .oneshot(authed_request(
            "GET",
            "/api/admin/registrations?status=lost",
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_transitions() {
    let (app, state) = create_test_app();
    seed_user(&state, "admin", UserRole::Admin).await;
    let token = common::create_test_jwt("admin", &state.config.jwt_signing_key);
    seed_registration(&state, "r1", RegistrationStatus::Pending).await;

    let set = |status: &str| {
        authed_request(
            "PUT",
            "/api/admin/registrations/r1/status",
            &token,
            Some(json!({ "status": status })),
        )
    };

    let response = app.clone().oneshot(set("approved")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "approved");

    // Same status again is a no-op
    let response = app.clone().oneshot(set("approved")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Approved cannot go back to pending
    let response = app.clone().oneshot(set("pending")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.clone().oneshot(set("cancelled")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Cancelled is terminal
    let response = app.oneshot(set("approved")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let stored = state.db.get_registration("r1").await.unwrap().unwrap();
    assert_eq!(stored.status, RegistrationStatus::Cancelled);
}

#[tokio::test]
async fn test_status_of_missing_registration() {
    let (app, state) = create_test_app();
    seed_user(&state, "admin", UserRole::Admin).await;
    let token = common::create_test_jwt("admin", &state.config.jwt_signing_key);

    let response = app
        .oneshot(authed_request(
            "PUT",
            "/api/admin/registrations/ghost/status",
            &token,
            Some(json!({ "status": "approved" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_finish_then_certificate() {
    let (app, state) = create_test_app();
    seed_user(&state, "admin", UserRole::Superadmin).await;
    let token = common::create_test_jwt("admin", &state.config.jwt_signing_key);
    seed_registration(&state, "r1", RegistrationStatus::Approved).await;

    let finish = || {
        authed_request(
            "POST",
            "/api/admin/registrations/r1/finish",
            &token,
            Some(json!({ "rider": 1 })),
        )
    };
    let certificate =
        || authed_request("POST", "/api/admin/registrations/r1/certificate", &token, None);

    // Not checked in yet
    let response = app.clone().oneshot(finish()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let response = app.clone().oneshot(certificate()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    state
        .db
        .mark_rider_checked_in("r1", RiderNumber::One)
        .await
        .unwrap();

    let response = app.clone().oneshot(finish()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let registration = body_json(response).await;
    assert_eq!(registration["rider1Finished"], true);
    assert_eq!(registration["rider2Finished"], false);

    let response = app.oneshot(certificate()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["certificateGranted"], true);
}

#[tokio::test]
async fn test_role_changes_need_superadmin() {
    let (app, state) = create_test_app();
    seed_user(&state, "root", UserRole::Superadmin).await;
    seed_user(&state, "admin", UserRole::Admin).await;
    seed_user(&state, "volunteer", UserRole::User).await;
    let root = common::create_test_jwt("root", &state.config.jwt_signing_key);
    let admin = common::create_test_jwt("admin", &state.config.jwt_signing_key);

    let promote = |token: &str, uid: &str, role: &str| {
        authed_request(
            "PUT",
            &format!("/api/admin/users/{}/role", uid),
            token,
            Some(json!({ "role": role })),
        )
    };

    let response = app
        .clone()
        .oneshot(promote(&admin, "volunteer", "admin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(promote(&root, "volunteer", "admin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = state.db.get_user("volunteer").await.unwrap().unwrap();
    assert_eq!(profile.role, UserRole::Admin);

    let response = app
        .clone()
        .oneshot(promote(&root, "root", "user"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(promote(&root, "nobody", "admin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
