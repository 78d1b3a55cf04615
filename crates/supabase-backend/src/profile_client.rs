//! Supabase REST client for the profiles table.

use crate::api::ProfileStore;
use crate::error::error_from_body;
use crate::{BackendResult, Profile, ProfileUpdate, Session, SessionStorage};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Profile table client over the Supabase REST API.
pub struct SupabaseProfiles {
    http_client: reqwest::Client,
    base_url: String,
    publishable_key: String,
    storage: Arc<dyn SessionStorage>,
}

impl SupabaseProfiles {
    /// Create a new profile store client.
    ///
    /// Shares the session storage with the auth client so requests carry the
    /// current user's access token (row-level security needs it).
    pub fn new(
        base_url: impl Into<String>,
        publishable_key: impl Into<String>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            publishable_key: publishable_key.into(),
            storage,
        }
    }

    /// Build the REST API URL for a table.
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Bearer token for requests: the current access token when a session is
    /// persisted, otherwise the publishable key.
    fn bearer_token(&self) -> BackendResult<String> {
        let token = self
            .storage
            .load()?
            .and_then(|json| serde_json::from_str::<Session>(&json).ok())
            .map(|session| session.access_token)
            .unwrap_or_else(|| self.publishable_key.clone());
        Ok(token)
    }
}

#[async_trait]
impl ProfileStore for SupabaseProfiles {
    async fn fetch(&self, id: &str) -> BackendResult<Option<Profile>> {
        let url = format!("{}?id=eq.{}&select=*&limit=1", self.rest_url("profiles"), id);

        debug!(user_id = %id, "Fetching profile");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", self.bearer_token()?))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &body));
        }

        let profiles: Vec<Profile> = response.json().await?;
        Ok(profiles.into_iter().next())
    }

    async fn insert(&self, profile: &Profile) -> BackendResult<()> {
        let url = self.rest_url("profiles");

        debug!(user_id = %profile.id, "Inserting profile");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", self.bearer_token()?))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(profile)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &body));
        }

        Ok(())
    }

    async fn update(&self, id: &str, changes: &ProfileUpdate) -> BackendResult<()> {
        let url = format!("{}?id=eq.{}", self.rest_url("profiles"), id);

        debug!(user_id = %id, "Updating profile");

        let response = self
            .http_client
            .patch(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", self.bearer_token()?))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(changes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &body));
        }

        Ok(())
    }
}
