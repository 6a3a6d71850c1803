// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Registrations (sign-ups, status, check-in and finish flags)
//! - Users (profiles and roles)
//!
//! Flag updates are written with an update mask naming exactly one field,
//! so no other field of the document is rewritten.

use crate::db::{checked, collections, ensure_can_check_in, DocumentStore};
use crate::error::AppError;
use crate::models::{
    Registration, RegistrationStatus, RegistrationType, RiderDetails, RiderNumber, UserProfile,
    UserRole,
};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Read a registration that must exist.
    async fn require_registration(&self, id: &str) -> Result<Registration, AppError> {
        self.get_registration(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))
    }

    /// Write the given fields of `registration`, leaving all others untouched.
    async fn write_registration_fields(
        &self,
        registration: &Registration,
        fields: &[&str],
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields.iter().copied())
            .in_col(collections::REGISTRATIONS)
            .document_id(&registration.id)
            .object(registration)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    // ─── Registration Operations ─────────────────────────────────

    async fn get_registration(&self, id: &str) -> Result<Option<Registration>, AppError> {
        let registration: Option<Registration> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REGISTRATIONS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        registration.map(checked).transpose()
    }

    async fn create_registration(&self, registration: &Registration) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REGISTRATIONS)
            .document_id(&registration.id)
            .object(registration)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_registrations(
        &self,
        status: Option<RegistrationStatus>,
        limit: u32,
    ) -> Result<Vec<Registration>, AppError> {
        let status = status.map(|s| s.as_str().to_string());

        let registrations: Vec<Registration> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REGISTRATIONS)
            .filter(move |q| {
                q.for_all([status
                    .as_ref()
                    .and_then(|s| q.field("status").eq(s.clone()))])
            })
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        registrations.into_iter().map(checked).collect()
    }

    async fn set_registration_status(
        &self,
        id: &str,
        status: RegistrationStatus,
    ) -> Result<(), AppError> {
        let mut registration = self.require_registration(id).await?;
        registration.status = status;
        self.write_registration_fields(&registration, &["status"])
            .await
    }

    async fn set_rider2(&self, id: &str, rider2: &RiderDetails) -> Result<(), AppError> {
        let mut registration = self.require_registration(id).await?;
        registration.registration_type = RegistrationType::Duo;
        registration.rider2 = Some(rider2.clone());
        self.write_registration_fields(&registration, &["registrationType", "rider2"])
            .await
    }

    async fn mark_rider_checked_in(&self, id: &str, rider: RiderNumber) -> Result<(), AppError> {
        // No transaction: concurrent writers to the same flag both set it to
        // true, and Firestore serializes single-document writes.
        let mut registration = self.require_registration(id).await?;
        ensure_can_check_in(&registration, rider)?;
        registration.set_checked_in(rider);

        self.write_registration_fields(&registration, &[rider.checked_in_field()])
            .await?;

        tracing::debug!(registration_id = id, rider = %rider, "Check-in flag written");
        Ok(())
    }

    async fn mark_rider_finished(&self, id: &str, rider: RiderNumber) -> Result<(), AppError> {
        let mut registration = self.require_registration(id).await?;
        registration.set_finished(rider);
        self.write_registration_fields(&registration, &[rider.finished_field()])
            .await
    }

    async fn grant_certificate(&self, id: &str) -> Result<(), AppError> {
        let mut registration = self.require_registration(id).await?;
        registration.certificate_granted = true;
        self.write_registration_fields(&registration, &["certificateGranted"])
            .await
    }

    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_user(&self, user: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn set_user_role(&self, uid: &str, role: UserRole) -> Result<(), AppError> {
        let mut user = self
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
        user.role = role;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["role"])
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
