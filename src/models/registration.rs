// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride registration model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Solo registrations cover one rider; duo registrations cover two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationType {
    Solo,
    Duo,
}

/// Lifecycle status. Gates every rider-facing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    CancellationRequested,
}

impl RegistrationStatus {
    /// Value stored in the `status` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::CancellationRequested => "cancellation_requested",
        }
    }

    /// Whether a registration may move from `self` to `next`.
    ///
    /// Re-applying the current status is always allowed (no-op).
    /// `Cancelled` is terminal.
    pub fn can_transition_to(self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (
                Pending,
                Approved | Rejected | Cancelled | CancellationRequested
            ) | (Approved, CancellationRequested | Cancelled)
                | (CancellationRequested, Cancelled | Approved)
                | (Rejected, Pending)
        )
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rider of a registration a ticket belongs to.
///
/// Serialized as the bare integers `1` and `2`, matching the QR payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RiderNumber {
    One,
    Two,
}

/// Rejected rider number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rider must be 1 or 2, got {0}")]
pub struct InvalidRiderNumber(pub u8);

impl TryFrom<u8> for RiderNumber {
    type Error = InvalidRiderNumber;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RiderNumber::One),
            2 => Ok(RiderNumber::Two),
            other => Err(InvalidRiderNumber(other)),
        }
    }
}

impl From<RiderNumber> for u8 {
    fn from(rider: RiderNumber) -> u8 {
        match rider {
            RiderNumber::One => 1,
            RiderNumber::Two => 2,
        }
    }
}

impl fmt::Display for RiderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

impl RiderNumber {
    /// Store field holding this rider's check-in flag.
    pub fn checked_in_field(self) -> &'static str {
        match self {
            RiderNumber::One => "rider1CheckedIn",
            RiderNumber::Two => "rider2CheckedIn",
        }
    }

    /// Store field holding this rider's ride-completion flag.
    pub fn finished_field(self) -> &'static str {
        match self {
            RiderNumber::One => "rider1Finished",
            RiderNumber::Two => "rider2Finished",
        }
    }
}

/// Personal details for one rider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RiderDetails {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub full_name: String,
    #[validate(range(min = 18, max = 120))]
    pub age: u8,
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub photo_url: Option<String>,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Loose phone check: 7-20 characters of digits and common separators,
/// with at least 7 digits.
fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();

    if !allowed || !(7..=20).contains(&phone.len()) || digits < 7 {
        return Err(ValidationError::new("phone_number"));
    }
    Ok(())
}

/// Sign-up request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    pub registration_type: RegistrationType,
    #[validate(nested)]
    pub rider1: RiderDetails,
    #[serde(default)]
    #[validate(nested)]
    pub rider2: Option<RiderDetails>,
}

/// Registration document stored in Firestore.
///
/// Document ID equals `id`, which is the owning user's uid for
/// self-service sign-ups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    /// Owner's identity-provider uid
    pub user_id: String,
    pub registration_type: RegistrationType,
    pub status: RegistrationStatus,
    pub rider1: RiderDetails,
    /// Second rider; may stay empty on a duo until the upgrade is completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider2: Option<RiderDetails>,
    #[serde(default)]
    pub rider1_checked_in: bool,
    #[serde(default)]
    pub rider2_checked_in: bool,
    #[serde(default)]
    pub rider1_finished: bool,
    #[serde(default)]
    pub rider2_finished: bool,
    #[serde(default)]
    pub certificate_granted: bool,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
}

/// Structural problems with a registration record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationShapeError {
    #[error("solo registration carries a second rider")]
    SoloWithSecondRider,
    #[error("invalid rider details: {0}")]
    InvalidRider(String),
}

impl Registration {
    /// Build a fresh pending registration from a sign-up request.
    pub fn new_pending(id: &str, user_id: &str, request: NewRegistration, now: &str) -> Self {
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            registration_type: request.registration_type,
            status: RegistrationStatus::Pending,
            rider1: request.rider1,
            rider2: request.rider2,
            rider1_checked_in: false,
            rider2_checked_in: false,
            rider1_finished: false,
            rider2_finished: false,
            certificate_granted: false,
            created_at: now.to_string(),
        }
    }

    /// Details for the given rider, if that rider is on this registration.
    pub fn rider(&self, rider: RiderNumber) -> Option<&RiderDetails> {
        match rider {
            RiderNumber::One => Some(&self.rider1),
            RiderNumber::Two => self.rider2.as_ref(),
        }
    }

    pub fn is_checked_in(&self, rider: RiderNumber) -> bool {
        match rider {
            RiderNumber::One => self.rider1_checked_in,
            RiderNumber::Two => self.rider2_checked_in,
        }
    }

    pub fn is_finished(&self, rider: RiderNumber) -> bool {
        match rider {
            RiderNumber::One => self.rider1_finished,
            RiderNumber::Two => self.rider2_finished,
        }
    }

    /// Set a rider's check-in flag. Check-in is one-way; there is no reset.
    pub fn set_checked_in(&mut self, rider: RiderNumber) {
        match rider {
            RiderNumber::One => self.rider1_checked_in = true,
            RiderNumber::Two => self.rider2_checked_in = true,
        }
    }

    pub fn set_finished(&mut self, rider: RiderNumber) {
        match rider {
            RiderNumber::One => self.rider1_finished = true,
            RiderNumber::Two => self.rider2_finished = true,
        }
    }

    /// Validate the record as a whole: riders must pass field validation and
    /// a solo registration cannot carry a second rider.
    pub fn check_shape(&self) -> Result<(), RegistrationShapeError> {
        if self.registration_type == RegistrationType::Solo && self.rider2.is_some() {
            return Err(RegistrationShapeError::SoloWithSecondRider);
        }

        self.rider1
            .validate()
            .map_err(|e| RegistrationShapeError::InvalidRider(e.to_string()))?;
        if let Some(rider2) = &self.rider2 {
            rider2
                .validate()
                .map_err(|e| RegistrationShapeError::InvalidRider(e.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rider(name: &str) -> RiderDetails {
        RiderDetails {
            full_name: name.to_string(),
            age: 30,
            phone_number: "+63 917 555 0101".to_string(),
            photo_url: None,
        }
    }

    fn registration() -> Registration {
        Registration::new_pending(
            "abc123",
            "abc123",
            NewRegistration {
                registration_type: RegistrationType::Duo,
                rider1: rider("Ana Cruz"),
                rider2: Some(rider("Ben Cruz")),
            },
            "2026-03-01T08:00:00Z",
        )
    }

    #[test]
    fn test_status_transitions() {
        use RegistrationStatus::*;

        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(CancellationRequested));
        assert!(CancellationRequested.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Approved));
        assert!(!Cancelled.can_transition_to(Approved));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&RegistrationStatus::CancellationRequested).unwrap();
        assert_eq!(json, "\"cancellation_requested\"");

        let parsed: RegistrationStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(parsed, RegistrationStatus::Approved);
    }

    #[test]
    fn test_rider_number_is_integer_on_the_wire() {
        assert_eq!(serde_json::to_string(&RiderNumber::Two).unwrap(), "2");
        assert_eq!(
            serde_json::from_str::<RiderNumber>("1").unwrap(),
            RiderNumber::One
        );
        assert!(serde_json::from_str::<RiderNumber>("3").is_err());
        assert!(serde_json::from_str::<RiderNumber>("\"1\"").is_err());
    }

    #[test]
    fn test_flag_field_names_match_document_fields() {
        let value = serde_json::to_value(registration()).unwrap();
        let object = value.as_object().unwrap();

        for rider in [RiderNumber::One, RiderNumber::Two] {
            assert!(object.contains_key(rider.checked_in_field()));
            assert!(object.contains_key(rider.finished_field()));
        }
        assert!(object.contains_key("registrationType"));
        assert!(object.contains_key("certificateGranted"));
    }

    #[test]
    fn test_missing_flags_default_to_false() {
        let json = r#"{
            "id": "r1",
            "userId": "u1",
            "registrationType": "solo",
            "status": "approved",
            "rider1": {"fullName": "Ana Cruz", "age": 30, "phoneNumber": "09175550101"},
            "createdAt": "2026-03-01T08:00:00Z"
        }"#;
        let parsed: Registration = serde_json::from_str(json).unwrap();

        assert!(!parsed.rider1_checked_in);
        assert!(!parsed.rider2_checked_in);
        assert!(!parsed.certificate_granted);
        assert!(parsed.rider2.is_none());
    }

    #[test]
    fn test_set_checked_in_touches_one_rider() {
        let mut reg = registration();
        reg.set_checked_in(RiderNumber::Two);

        assert!(reg.is_checked_in(RiderNumber::Two));
        assert!(!reg.is_checked_in(RiderNumber::One));
    }

    #[test]
    fn test_rider_validation() {
        let mut underage = rider("Kid Rider");
        underage.age = 17;
        assert!(underage.validate().is_err());

        let mut bad_phone = rider("Ana Cruz");
        bad_phone.phone_number = "call me".to_string();
        assert!(bad_phone.validate().is_err());

        let mut blank = rider("   ");
        blank.age = 40;
        assert!(blank.validate().is_err());

        assert!(rider("Ana Cruz").validate().is_ok());
    }

    #[test]
    fn test_solo_with_second_rider_is_malformed() {
        let mut reg = registration();
        reg.registration_type = RegistrationType::Solo;
        assert_eq!(
            reg.check_shape(),
            Err(RegistrationShapeError::SoloWithSecondRider)
        );

        reg.rider2 = None;
        assert!(reg.check_shape().is_ok());
    }
}
