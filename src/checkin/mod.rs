// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rider check-in: QR payload lookup, review, and the one-way check-in write.
//!
//! [`lookup`] and [`confirm`] are the stateless operations used by the HTTP
//! handlers. [`CheckInFlow`] drives the same operations from a live camera
//! for the desk websocket.

pub mod flow;
pub mod review;

pub use flow::{CheckInFlow, CheckInState};
pub use review::{confirm, lookup, lookup_text, CheckInReceipt, Ineligible, Review};

use crate::error::AppError;
use crate::models::{PayloadError, RiderNumber};
use crate::scanner::CaptureError;

/// Everything that can end a check-in attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckInError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("invalid ticket payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("registration {0} not found")]
    NotFound(String),

    #[error("rider {rider} is not on registration {registration_id}")]
    UnknownRider {
        registration_id: String,
        rider: RiderNumber,
    },

    #[error("lookup failed: {0}")]
    LookupFailed(String),

    #[error("rider {rider} cannot be checked in: {reason}")]
    NotEligible {
        rider: RiderNumber,
        reason: Ineligible,
    },

    #[error("check-in write failed: {0}")]
    Mutation(String),

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

impl CheckInError {
    /// Message shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            CheckInError::Capture(CaptureError::PermissionDenied) => {
                "Camera unavailable: permission denied.".to_string()
            }
            CheckInError::Capture(err) => format!("Camera unavailable: {}.", err),
            CheckInError::Payload(_) => "This QR code is not a valid ride ticket.".to_string(),
            CheckInError::NotFound(_) => "No registration found for this ticket.".to_string(),
            CheckInError::UnknownRider { rider, .. } => {
                format!("Rider {} is not on this registration.", rider)
            }
            CheckInError::LookupFailed(_) => {
                "Could not load the registration. Please scan again.".to_string()
            }
            CheckInError::NotEligible {
                reason: Ineligible::AlreadyCheckedIn,
                ..
            } => "Rider is already checked in.".to_string(),
            CheckInError::NotEligible {
                reason: Ineligible::NotApproved(status),
                ..
            } => format!("Registration is {}, not approved.", status),
            CheckInError::Mutation(_) => "Check-in failed. Please try again.".to_string(),
            CheckInError::InvalidState { action, state } => {
                format!("Cannot {} while {}.", action, state)
            }
        }
    }
}

impl From<CheckInError> for AppError {
    fn from(err: CheckInError) -> Self {
        let message = err.user_message();
        match err {
            CheckInError::Capture(_) | CheckInError::Payload(_) => AppError::BadRequest(message),
            CheckInError::NotFound(_) | CheckInError::UnknownRider { .. } => {
                AppError::NotFound(message)
            }
            CheckInError::NotEligible { .. } | CheckInError::InvalidState { .. } => {
                AppError::Conflict(message)
            }
            CheckInError::LookupFailed(detail) | CheckInError::Mutation(detail) => {
                AppError::Database(detail)
            }
        }
    }
}
