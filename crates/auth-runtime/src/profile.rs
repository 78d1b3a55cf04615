//! Profile reconciliation for authenticated identities.
//!
//! Guarantees at most one profile row per identity without a server-side
//! trigger: fetch first, insert only when missing. The check-then-insert is
//! not atomic against concurrent duplicate triggers; a duplicate-key
//! failure from the store is treated as "profile already exists" followed
//! by a re-fetch.

use crate::{AuthError, AuthResult};
use std::sync::Arc;
use supabase_backend::{
    BackendError, BackendResult, Identity, NotificationPreferences, Profile, ProfileStore,
};
use tracing::{debug, error};

/// Fallback first name when provider metadata carries no display name.
const FALLBACK_FIRST_NAME: &str = "User";

/// Fallback last initial when provider metadata carries no display name.
const FALLBACK_LAST_INITIAL: &str = "U";

/// Derive `{first_name, last_initial}` from a provider display name.
///
/// The display name is split on whitespace; the first token becomes the
/// first name and the uppercased first character of the last token becomes
/// the last initial.
fn derive_name(full_name: Option<&str>) -> (String, String) {
    let first_name = full_name
        .and_then(|name| name.split_whitespace().next())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FIRST_NAME.to_string());

    let last_initial = full_name
        .and_then(|name| name.split_whitespace().last())
        .and_then(|token| token.chars().next())
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| FALLBACK_LAST_INITIAL.to_string());

    (first_name, last_initial)
}

/// Creates and fetches profile rows for authenticated identities.
pub struct ProfileBootstrapper {
    store: Arc<dyn ProfileStore>,
}

impl ProfileBootstrapper {
    /// Create a new bootstrapper over the given profile store.
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Fetch the profile for an identity, creating it first when missing.
    ///
    /// Fetch and insert errors during this passive reconciliation are logged
    /// and reported as "no profile" so the navigation gate always has a
    /// defined state to act on.
    pub async fn ensure_profile(&self, identity: &Identity) -> Option<Profile> {
        match self.try_ensure(identity).await {
            Ok(profile) => profile,
            Err(err) => {
                error!(
                    user_id = %identity.id,
                    error = %err,
                    "Profile reconciliation failed"
                );
                None
            }
        }
    }

    async fn try_ensure(&self, identity: &Identity) -> BackendResult<Option<Profile>> {
        if let Some(existing) = self.store.fetch(&identity.id).await? {
            return Ok(Some(existing));
        }

        let (first_name, last_initial) = derive_name(identity.metadata.full_name.as_deref());
        let profile = Profile {
            id: identity.id.clone(),
            email: identity.email.clone().unwrap_or_default(),
            first_name,
            last_initial,
            role: None,
            sobriety_date: None,
            notification_preferences: NotificationPreferences::default(),
        };

        match self.store.insert(&profile).await {
            Ok(()) => {
                debug!(user_id = %identity.id, "Created profile for new identity");
            }
            Err(BackendError::Duplicate(_)) => {
                // A concurrent reconciliation won the insert; the row exists.
                debug!(user_id = %identity.id, "Profile already created concurrently");
            }
            Err(err) => return Err(err),
        }

        self.store.fetch(&identity.id).await
    }

    /// Re-fetch a profile without creating one; used after profile-mutating
    /// actions elsewhere in the app.
    pub async fn refresh_profile(&self, identity_id: &str) -> Option<Profile> {
        match self.store.fetch(identity_id).await {
            Ok(profile) => profile,
            Err(err) => {
                error!(user_id = %identity_id, error = %err, "Profile fetch failed");
                None
            }
        }
    }

    /// Insert the profile for a brand-new sign-up, unconditionally.
    ///
    /// This path assumes a freshly created identity, so there is no
    /// existence check. Store failures are rethrown: sign-up without a
    /// profile is an inconsistent state the caller must handle.
    pub async fn insert_for_sign_up(
        &self,
        identity: &Identity,
        email: &str,
        first_name: &str,
        last_initial: &str,
    ) -> AuthResult<Profile> {
        let profile = Profile {
            id: identity.id.clone(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_initial: last_initial.to_uppercase(),
            role: None,
            sobriety_date: None,
            notification_preferences: NotificationPreferences::default(),
        };

        self.store.insert(&profile).await.map_err(AuthError::from)?;

        debug!(user_id = %identity.id, "Created profile for sign-up");
        Ok(profile)
    }

    /// The underlying store, for profile-mutating callers.
    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_identity, test_identity_with_name, FakeProfileStore};

    fn bootstrapper(store: Arc<FakeProfileStore>) -> ProfileBootstrapper {
        ProfileBootstrapper::new(store)
    }

    #[test]
    fn test_derive_name_from_full_name() {
        assert_eq!(derive_name(Some("Jane Doe")), ("Jane".to_string(), "D".to_string()));
    }

    #[test]
    fn test_derive_name_without_metadata() {
        assert_eq!(derive_name(None), ("User".to_string(), "U".to_string()));
    }

    #[test]
    fn test_derive_name_single_token() {
        assert_eq!(derive_name(Some("Jane")), ("Jane".to_string(), "J".to_string()));
    }

    #[test]
    fn test_derive_name_blank_string() {
        assert_eq!(derive_name(Some("   ")), ("User".to_string(), "U".to_string()));
    }

    #[test]
    fn test_derive_name_preserves_case_of_first_token() {
        assert_eq!(
            derive_name(Some("mary anne smith")),
            ("mary".to_string(), "S".to_string())
        );
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_missing_row() {
        let store = Arc::new(FakeProfileStore::new());
        let identity = test_identity_with_name("user-1", "Jane Doe");

        let profile = bootstrapper(store.clone())
            .ensure_profile(&identity)
            .await
            .unwrap();

        assert_eq!(profile.id, "user-1");
        assert_eq!(profile.first_name, "Jane");
        assert_eq!(profile.last_initial, "D");
        assert!(profile.notification_preferences.tasks);
        assert!(!profile.notification_preferences.daily);
        assert_eq!(store.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_is_idempotent() {
        let store = Arc::new(FakeProfileStore::new());
        let bootstrapper = bootstrapper(store.clone());
        let identity = test_identity_with_name("user-1", "Jane Doe");

        let first = bootstrapper.ensure_profile(&identity).await.unwrap();
        let second = bootstrapper.ensure_profile(&identity).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_returns_existing_row_unchanged() {
        let store = Arc::new(FakeProfileStore::new());
        let existing = Profile {
            id: "user-1".to_string(),
            email: "existing@example.com".to_string(),
            first_name: "Existing".to_string(),
            last_initial: "E".to_string(),
            role: None,
            sobriety_date: None,
            notification_preferences: NotificationPreferences::default(),
        };
        store.put(existing.clone());

        let profile = bootstrapper(store.clone())
            .ensure_profile(&test_identity("user-1"))
            .await
            .unwrap();

        assert_eq!(profile, existing);
        assert_eq!(store.insert_count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_profile_duplicate_insert_re_fetches() {
        let store = Arc::new(FakeProfileStore::new());
        store.fail_next_insert_with_duplicate();

        let profile = bootstrapper(store.clone())
            .ensure_profile(&test_identity("user-1"))
            .await
            .unwrap();

        // The concurrent winner's row comes back instead of a hard failure.
        assert_eq!(profile.id, "user-1");
        assert_eq!(profile.first_name, "Concurrent");
    }

    #[tokio::test]
    async fn test_ensure_profile_fetch_error_yields_none() {
        let store = Arc::new(FakeProfileStore::new());
        store.fail_fetches();

        let profile = bootstrapper(store).ensure_profile(&test_identity("user-1")).await;
        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn test_refresh_profile_never_creates() {
        let store = Arc::new(FakeProfileStore::new());

        let profile = bootstrapper(store.clone()).refresh_profile("user-1").await;

        assert!(profile.is_none());
        assert_eq!(store.insert_count(), 0);
    }

    #[tokio::test]
    async fn test_insert_for_sign_up_uppercases_last_initial() {
        let store = Arc::new(FakeProfileStore::new());

        let profile = bootstrapper(store.clone())
            .insert_for_sign_up(&test_identity("user-1"), "jane@example.com", "Jane", "d")
            .await
            .unwrap();

        assert_eq!(profile.last_initial, "D");
        assert_eq!(store.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_insert_for_sign_up_rethrows_store_error() {
        let store = Arc::new(FakeProfileStore::new());
        store.fail_inserts_with_message("profiles table unavailable");

        let err = bootstrapper(store)
            .insert_for_sign_up(&test_identity("user-1"), "jane@example.com", "Jane", "D")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "profiles table unavailable");
    }
}
