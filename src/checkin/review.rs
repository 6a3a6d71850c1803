// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration lookup by QR payload and the confirm operation.

use super::CheckInError;
use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{
    Operator, QrPayload, Registration, RegistrationStatus, RiderDetails, RiderNumber,
};
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Why the confirm action is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    AlreadyCheckedIn,
    NotApproved(RegistrationStatus),
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligible::AlreadyCheckedIn => f.write_str("already checked in"),
            Ineligible::NotApproved(status) => {
                write!(f, "registration is {}, not approved", status)
            }
        }
    }
}

/// What the operator sees before confirming: one rider of one registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub registration_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub rider: RiderNumber,
    #[serde(flatten)]
    pub details: RiderDetails,
    pub status: RegistrationStatus,
    pub checked_in: bool,
}

impl Review {
    pub fn from_registration(
        registration: &Registration,
        rider: RiderNumber,
    ) -> Result<Self, CheckInError> {
        let details = registration
            .rider(rider)
            .ok_or_else(|| CheckInError::UnknownRider {
                registration_id: registration.id.clone(),
                rider,
            })?;

        Ok(Self {
            registration_id: registration.id.clone(),
            rider,
            details: details.clone(),
            status: registration.status,
            checked_in: registration.is_checked_in(rider),
        })
    }

    /// `None` when the confirm action is available.
    ///
    /// An existing check-in is reported first since it is the more useful
    /// message at the desk; either way confirm stays disabled.
    pub fn ineligibility(&self) -> Option<Ineligible> {
        if self.checked_in {
            Some(Ineligible::AlreadyCheckedIn)
        } else if self.status != RegistrationStatus::Approved {
            Some(Ineligible::NotApproved(self.status))
        } else {
            None
        }
    }

    pub fn can_confirm(&self) -> bool {
        self.ineligibility().is_none()
    }

    /// Short reason shown next to a disabled confirm button.
    pub fn blocked_reason(&self) -> Option<&'static str> {
        self.ineligibility().map(|reason| match reason {
            Ineligible::AlreadyCheckedIn => "already checked in",
            Ineligible::NotApproved(_) => "registration is not approved",
        })
    }

    /// Label for the confirm button.
    pub fn confirm_label(&self) -> &'static str {
        if self.checked_in {
            "Checked In"
        } else {
            "Check In"
        }
    }

    pub fn payload(&self) -> QrPayload {
        QrPayload::new(self.registration_id.clone(), self.rider)
    }
}

/// Result of a successful check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReceipt {
    pub registration_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub rider: RiderNumber,
    pub full_name: String,
    pub checked_in_by: String,
    pub checked_in_at: String,
    pub message: String,
}

/// Fetch the registration a payload points at and build the review.
pub async fn lookup(
    store: &dyn DocumentStore,
    payload: &QrPayload,
) -> Result<Review, CheckInError> {
    let registration = store
        .get_registration(&payload.registration_id)
        .await
        .map_err(|e| CheckInError::LookupFailed(e.to_string()))?
        .ok_or_else(|| CheckInError::NotFound(payload.registration_id.clone()))?;

    Review::from_registration(&registration, payload.rider)
}

/// Parse decoded QR text, then look it up. Payload errors never reach the store.
pub async fn lookup_text(store: &dyn DocumentStore, text: &str) -> Result<Review, CheckInError> {
    let payload = QrPayload::parse(text)?;
    lookup(store, &payload).await
}

/// Check the rider in.
///
/// Re-reads the record and enforces the precondition here, so a stale review
/// cannot check in a rider whose registration changed since it was shown.
/// Only the rider's check-in flag is written.
pub async fn confirm(
    store: &dyn DocumentStore,
    operator: &Operator,
    payload: &QrPayload,
) -> Result<CheckInReceipt, CheckInError> {
    let review = lookup(store, payload).await?;
    if let Some(reason) = review.ineligibility() {
        return Err(CheckInError::NotEligible {
            rider: payload.rider,
            reason,
        });
    }

    store
        .mark_rider_checked_in(&payload.registration_id, payload.rider)
        .await
        .map_err(|e| match e {
            AppError::Conflict(detail) => CheckInError::Mutation(format!(
                "registration changed during check-in: {}",
                detail
            )),
            other => CheckInError::Mutation(other.to_string()),
        })?;

    tracing::info!(
        registration_id = %payload.registration_id,
        rider = %payload.rider,
        operator = %operator.uid(),
        "Rider checked in"
    );

    Ok(CheckInReceipt {
        registration_id: payload.registration_id.clone(),
        rider: payload.rider,
        message: format!("{} checked in.", review.details.full_name),
        full_name: review.details.full_name,
        checked_in_by: operator.uid().to_string(),
        checked_in_at: now_rfc3339(),
    })
}
