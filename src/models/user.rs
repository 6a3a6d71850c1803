// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile and role model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Role stored on the user profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    Superadmin,
}

impl UserRole {
    /// Admins and superadmins may run the check-in desk and manage registrations.
    pub fn is_operator(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Superadmin)
    }

    /// Only superadmins may change other users' roles.
    pub fn can_manage_roles(self) -> bool {
        self == UserRole::Superadmin
    }
}

/// User profile stored in Firestore (document ID = uid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity-provider uid
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    /// When the profile was created (ISO 8601)
    pub created_at: String,
}

/// Authenticated operator performing admin actions.
///
/// Only constructible from a profile with an operator role, so holding one
/// is proof of authorization for the check-in flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    uid: String,
    role: UserRole,
}

impl Operator {
    pub fn from_profile(profile: &UserProfile) -> Option<Self> {
        Self::new(&profile.uid, profile.role)
    }

    pub fn new(uid: &str, role: UserRole) -> Option<Self> {
        role.is_operator().then(|| Self {
            uid: uid.to_string(),
            role,
        })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn role(&self) -> UserRole {
        self.role
    }
}
