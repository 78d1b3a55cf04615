//! Domain types shared across the auth stack.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated principal as represented by the auth service.
///
/// Immutable from the client's perspective apart from metadata refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque identity id assigned by the auth service.
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Provider metadata (display name etc.).
    #[serde(default, rename = "user_metadata")]
    pub metadata: IdentityMetadata,
}

/// Provider-supplied metadata attached to an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Time-bounded credential pair bound to one identity.
///
/// Replaced wholesale on refresh or sign-in, never field-mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Identity,
}

impl Session {
    /// Whether the access credential has passed its absolute expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Role in a sponsor/sponsee relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Sponsor,
    Sponsee,
    Both,
}

/// Per-channel notification opt-ins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub tasks: bool,
    pub messages: bool,
    pub milestones: bool,
    pub daily: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            tasks: true,
            messages: true,
            milestones: true,
            daily: false,
        }
    }
}

/// Application-level user record, keyed by identity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_initial: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sobriety_date: Option<NaiveDate>,
    #[serde(default)]
    pub notification_preferences: NotificationPreferences,
}

impl Profile {
    /// Whole days elapsed since the recovery start date, if one is set.
    pub fn days_sober(&self, today: NaiveDate) -> Option<i64> {
        self.sobriety_date
            .map(|start| (today - start).num_days().max(0))
    }
}

/// Partial patch applied to a profile row (onboarding, settings).
///
/// Unset fields are omitted from the request body so existing columns are
/// left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sobriety_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_preferences: Option<NotificationPreferences>,
}
