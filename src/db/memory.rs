// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Used for local development (`STORE_BACKEND=memory`) and tests. Each
//! mutation holds the map shard lock for its document, which gives the same
//! single-document atomicity the Firestore backend relies on.

use crate::db::{checked, ensure_can_check_in, DocumentStore};
use crate::error::AppError;
use crate::models::{
    Registration, RegistrationStatus, RegistrationType, RiderDetails, RiderNumber, UserProfile,
    UserRole,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Dashmap-backed store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    registrations: Arc<DashMap<String, Registration>>,
    users: Arc<DashMap<String, UserProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `update` to an existing registration under its entry lock.
    fn update_registration<F>(&self, id: &str, update: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Registration) -> Result<(), AppError>,
    {
        let mut entry = self
            .registrations
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))?;
        update(entry.value_mut())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_registration(&self, id: &str) -> Result<Option<Registration>, AppError> {
        self.registrations
            .get(id)
            .map(|entry| checked(entry.value().clone()))
            .transpose()
    }

    async fn create_registration(&self, registration: &Registration) -> Result<(), AppError> {
        self.registrations
            .insert(registration.id.clone(), registration.clone());
        Ok(())
    }

    async fn list_registrations(
        &self,
        status: Option<RegistrationStatus>,
        limit: u32,
    ) -> Result<Vec<Registration>, AppError> {
        let mut registrations: Vec<Registration> = self
            .registrations
            .iter()
            .filter(|entry| status.map_or(true, |s| entry.status == s))
            .map(|entry| entry.value().clone())
            .collect();

        registrations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        registrations.truncate(limit as usize);
        Ok(registrations)
    }

    async fn set_registration_status(
        &self,
        id: &str,
        status: RegistrationStatus,
    ) -> Result<(), AppError> {
        self.update_registration(id, |registration| {
            registration.status = status;
            Ok(())
        })
    }

    async fn set_rider2(&self, id: &str, rider2: &RiderDetails) -> Result<(), AppError> {
        self.update_registration(id, |registration| {
            registration.registration_type = RegistrationType::Duo;
            registration.rider2 = Some(rider2.clone());
            Ok(())
        })
    }

    async fn mark_rider_checked_in(&self, id: &str, rider: RiderNumber) -> Result<(), AppError> {
        self.update_registration(id, |registration| {
            ensure_can_check_in(registration, rider)?;
            registration.set_checked_in(rider);
            Ok(())
        })
    }

    async fn mark_rider_finished(&self, id: &str, rider: RiderNumber) -> Result<(), AppError> {
        self.update_registration(id, |registration| {
            registration.set_finished(rider);
            Ok(())
        })
    }

    async fn grant_certificate(&self, id: &str) -> Result<(), AppError> {
        self.update_registration(id, |registration| {
            registration.certificate_granted = true;
            Ok(())
        })
    }

    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.users.get(uid).map(|entry| entry.value().clone()))
    }

    async fn upsert_user(&self, user: &UserProfile) -> Result<(), AppError> {
        self.users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn set_user_role(&self, uid: &str, role: UserRole) -> Result<(), AppError> {
        let mut entry = self
            .users
            .get_mut(uid)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
        entry.role = role;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRegistration;

    fn rider(name: &str) -> RiderDetails {
        RiderDetails {
            full_name: name.to_string(),
            age: 25,
            phone_number: "0917 555 0101".to_string(),
            photo_url: None,
        }
    }

    fn registration(id: &str, status: RegistrationStatus, created_at: &str) -> Registration {
        let mut reg = Registration::new_pending(
            id,
            id,
            NewRegistration {
                registration_type: RegistrationType::Duo,
                rider1: rider("Ana Cruz"),
                rider2: Some(rider("Ben Cruz")),
            },
            created_at,
        );
        reg.status = status;
        reg
    }

    #[tokio::test]
    async fn test_check_in_writes_only_one_flag() {
        let store = MemoryStore::new();
        let before = registration("r1", RegistrationStatus::Approved, "2026-03-01T08:00:00Z");
        store.create_registration(&before).await.unwrap();

        store
            .mark_rider_checked_in("r1", RiderNumber::Two)
            .await
            .unwrap();

        let after = store.get_registration("r1").await.unwrap().unwrap();
        let mut expected = before.clone();
        expected.rider2_checked_in = true;
        assert_eq!(after, expected);
    }

    #[tokio::test]
    async fn test_check_in_preconditions() {
        let store = MemoryStore::new();
        store
            .create_registration(&registration(
                "pending",
                RegistrationStatus::Pending,
                "2026-03-01T08:00:00Z",
            ))
            .await
            .unwrap();
        store
            .create_registration(&registration(
                "approved",
                RegistrationStatus::Approved,
                "2026-03-01T08:00:00Z",
            ))
            .await
            .unwrap();

        let err = store
            .mark_rider_checked_in("pending", RiderNumber::One)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        store
            .mark_rider_checked_in("approved", RiderNumber::One)
            .await
            .unwrap();
        let err = store
            .mark_rider_checked_in("approved", RiderNumber::One)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = store
            .mark_rider_checked_in("missing", RiderNumber::One)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_newest_first() {
        let store = MemoryStore::new();
        for (id, status, at) in [
            ("a", RegistrationStatus::Approved, "2026-03-01T08:00:00Z"),
            ("b", RegistrationStatus::Pending, "2026-03-02T08:00:00Z"),
            ("c", RegistrationStatus::Approved, "2026-03-03T08:00:00Z"),
        ] {
            store
                .create_registration(&registration(id, status, at))
                .await
                .unwrap();
        }

        let approved = store
            .list_registrations(Some(RegistrationStatus::Approved), 10)
            .await
            .unwrap();
        let ids: Vec<&str> = approved.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);

        let limited = store.list_registrations(None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "c");
    }
}
