// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QR payload carried on rider tickets.
//!
//! The payload is a UTF-8 JSON object `{"registrationId": string, "rider": 1 | 2}`.
//! It has no version field, so the shape must never change once tickets
//! have been issued.

use crate::models::RiderNumber;
use serde::Serialize;

/// Decoded ticket payload: the only handle the scanner has into a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub registration_id: String,
    pub rider: RiderNumber,
}

/// Why a decoded QR string is not a ticket payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("QR content is not valid JSON")]
    NotJson,

    #[error("QR content is not a JSON object")]
    NotAnObject,

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field 'registrationId' must be a string")]
    RegistrationIdNotString,

    #[error("field 'registrationId' is empty")]
    EmptyRegistrationId,

    #[error("field 'rider' must be 1 or 2")]
    InvalidRider,
}

impl QrPayload {
    pub fn new(registration_id: impl Into<String>, rider: RiderNumber) -> Self {
        Self {
            registration_id: registration_id.into(),
            rider,
        }
    }

    /// Parse decoded QR text. Unknown extra fields are ignored.
    pub fn parse(text: &str) -> Result<Self, PayloadError> {
        let value: serde_json::Value =
            serde_json::from_str(text.trim()).map_err(|_| PayloadError::NotJson)?;
        let object = value.as_object().ok_or(PayloadError::NotAnObject)?;

        let registration_id = object
            .get("registrationId")
            .ok_or(PayloadError::MissingField("registrationId"))?
            .as_str()
            .ok_or(PayloadError::RegistrationIdNotString)?;
        if registration_id.trim().is_empty() {
            return Err(PayloadError::EmptyRegistrationId);
        }

        let rider = object
            .get("rider")
            .ok_or(PayloadError::MissingField("rider"))?
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(|n| RiderNumber::try_from(n).ok())
            .ok_or(PayloadError::InvalidRider)?;

        Ok(Self {
            registration_id: registration_id.to_string(),
            rider,
        })
    }

    /// Canonical JSON text embedded in the ticket QR code.
    pub fn encode(&self) -> String {
        serde_json::json!({
            "registrationId": self.registration_id,
            "rider": u8::from(self.rider),
        })
        .to_string()
    }
}
