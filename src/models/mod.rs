// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod payload;
pub mod registration;
pub mod user;

pub use payload::{PayloadError, QrPayload};
pub use registration::{
    NewRegistration, Registration, RegistrationStatus, RegistrationType, RiderDetails,
    RiderNumber,
};
pub use user::{Operator, UserProfile, UserRole};
