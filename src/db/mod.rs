// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: the document store contract and its backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{
    Registration, RegistrationStatus, RiderDetails, RiderNumber, UserProfile, UserRole,
};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const REGISTRATIONS: &str = "registrations";
    pub const USERS: &str = "users";
}

/// Operations the service needs from the document store.
///
/// Every field mutation touches a single document, relying on the store's
/// single-document write atomicity. Mutating a missing document returns
/// `AppError::NotFound`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ─── Registrations ───────────────────────────────────────────

    async fn get_registration(&self, id: &str) -> Result<Option<Registration>, AppError>;

    async fn create_registration(&self, registration: &Registration) -> Result<(), AppError>;

    /// Newest first, optionally filtered by status.
    async fn list_registrations(
        &self,
        status: Option<RegistrationStatus>,
        limit: u32,
    ) -> Result<Vec<Registration>, AppError>;

    async fn set_registration_status(
        &self,
        id: &str,
        status: RegistrationStatus,
    ) -> Result<(), AppError>;

    /// Attach the second rider and mark the registration as duo.
    async fn set_rider2(&self, id: &str, rider2: &RiderDetails) -> Result<(), AppError>;

    /// Set one rider's check-in flag.
    ///
    /// Fails with `AppError::Conflict` unless the registration is approved
    /// and the flag is currently false. Writes only that flag.
    async fn mark_rider_checked_in(&self, id: &str, rider: RiderNumber) -> Result<(), AppError>;

    /// Set one rider's ride-completion flag. Writes only that flag.
    async fn mark_rider_finished(&self, id: &str, rider: RiderNumber) -> Result<(), AppError>;

    async fn grant_certificate(&self, id: &str) -> Result<(), AppError>;

    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;

    async fn upsert_user(&self, user: &UserProfile) -> Result<(), AppError>;

    async fn set_user_role(&self, uid: &str, role: UserRole) -> Result<(), AppError>;
}

/// Reject registration documents that deserialize but are structurally wrong.
pub(crate) fn checked(registration: Registration) -> Result<Registration, AppError> {
    registration.check_shape().map_err(|e| {
        AppError::Database(format!(
            "Malformed registration {}: {}",
            registration.id, e
        ))
    })?;
    Ok(registration)
}

/// Shared precondition for check-in writes.
pub(crate) fn ensure_can_check_in(
    registration: &Registration,
    rider: RiderNumber,
) -> Result<(), AppError> {
    if registration.status != RegistrationStatus::Approved {
        return Err(AppError::Conflict(format!(
            "Registration {} is {}, not approved",
            registration.id, registration.status
        )));
    }
    if registration.rider(rider).is_none() {
        return Err(AppError::NotFound(format!(
            "Rider {} is not on registration {}",
            rider, registration.id
        )));
    }
    if registration.is_checked_in(rider) {
        return Err(AppError::Conflict(format!(
            "Rider {} of registration {} is already checked in",
            rider, registration.id
        )));
    }
    Ok(())
}
