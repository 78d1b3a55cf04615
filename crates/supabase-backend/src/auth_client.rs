//! Supabase Auth API client.
//!
//! Talks to the GoTrue REST endpoints under `/auth/v1/` and owns session
//! persistence: every successful grant stores the new session and publishes
//! a change event, so dependents observe sign-in, refresh and sign-out in
//! the order they happen.

use crate::api::{AuthApi, AuthEvent, OAuthProvider, OAuthRequest};
use crate::error::error_from_body;
use crate::{BackendError, BackendResult, Identity, Session, SessionStorage};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Supabase token grant request (password grant).
#[derive(Debug, Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Supabase token grant request (refresh grant).
#[derive(Debug, Serialize)]
struct RefreshGrantRequest<'a> {
    refresh_token: &'a str,
}

/// Supabase token grant request (id-token grant).
#[derive(Debug, Serialize)]
struct IdTokenGrantRequest<'a> {
    provider: &'a str,
    id_token: &'a str,
}

/// Supabase token grant response.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: Identity,
}

impl AccessTokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            user: self.user,
        }
    }
}

/// Supabase Auth client.
pub struct SupabaseAuth {
    http_client: reqwest::Client,
    base_url: String,
    publishable_key: String,
    storage: Arc<dyn SessionStorage>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseAuth {
    /// Create a new auth client.
    ///
    /// # Arguments
    /// * `base_url` - The Supabase project URL (e.g. `https://xyz.supabase.co`)
    /// * `publishable_key` - The Supabase publishable API key
    /// * `storage` - Session persistence backend supplied by the host
    pub fn new(
        base_url: impl Into<String>,
        publishable_key: impl Into<String>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            publishable_key: publishable_key.into(),
            storage,
            events,
        }
    }

    /// Build an auth endpoint URL.
    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Persist a session and publish the matching change event.
    fn commit_session(&self, session: &Session, event: AuthEvent) -> BackendResult<()> {
        let json = serde_json::to_string(session)?;
        self.storage.store(&json)?;
        // No receivers is fine; the channel only carries best-effort pushes.
        let _ = self.events.send(event);
        Ok(())
    }

    /// POST a token-grant request and parse the resulting session.
    async fn token_grant<B: Serialize>(&self, grant_type: &str, body: &B) -> BackendResult<Session> {
        let url = format!("{}?grant_type={}", self.auth_url("token"), grant_type);

        debug!(url = %url, "Requesting token grant");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, grant_type = %grant_type, "Token grant failed");
            return Err(error_from_body(status, &body));
        }

        let data: AccessTokenResponse = response.json().await?;
        Ok(data.into_session())
    }

    /// Exchange a refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> BackendResult<Session> {
        self.token_grant("refresh_token", &RefreshGrantRequest { refresh_token })
            .await
    }

    fn load_persisted_session(&self) -> BackendResult<Option<Session>> {
        let Some(json) = self.storage.load()? else {
            return Ok(None);
        };

        match serde_json::from_str(&json) {
            Ok(session) => Ok(Some(session)),
            Err(error) => {
                warn!(error = %error, "Persisted session is unreadable, clearing it");
                self.storage.clear()?;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl AuthApi for SupabaseAuth {
    async fn get_session(&self) -> BackendResult<Option<Session>> {
        let Some(session) = self.load_persisted_session()? else {
            return Ok(None);
        };

        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        debug!(user_id = %session.user.id, "Persisted session expired, refreshing");

        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                self.commit_session(&refreshed, AuthEvent::TokenRefreshed(refreshed.clone()))?;
                Ok(Some(refreshed))
            }
            Err(error @ BackendError::Http(_)) => Err(error),
            Err(error) => {
                // Rejected refresh token: the stored session is dead.
                warn!(error = %error, "Session refresh rejected, clearing session");
                self.storage.clear()?;
                Ok(None)
            }
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        let session = self
            .token_grant("password", &PasswordGrantRequest { email, password })
            .await?;
        self.commit_session(&session, AuthEvent::SignedIn(session.clone()))?;

        debug!(user_id = %session.user.id, "Password sign in successful");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<Session> {
        let url = self.auth_url("signup");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&PasswordGrantRequest { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Sign up failed");
            return Err(error_from_body(status, &body));
        }

        // With auto-confirm the session fields come back at the top level;
        // some deployments nest them under `session`.
        let value: serde_json::Value = response.json().await?;
        let data: AccessTokenResponse = if value.get("access_token").is_some() {
            serde_json::from_value(value)?
        } else if let Some(session) = value.get("session").filter(|s| !s.is_null()) {
            serde_json::from_value(session.clone())?
        } else {
            return Err(BackendError::Api(
                "Email confirmation required before a session is issued".to_string(),
            ));
        };

        let session = data.into_session();
        self.commit_session(&session, AuthEvent::SignedIn(session.clone()))?;

        debug!(user_id = %session.user.id, "Sign up successful");
        Ok(session)
    }

    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> BackendResult<Url> {
        let mut url = Url::parse(&self.auth_url("authorize"))?;
        url.query_pairs_mut()
            .append_pair("provider", request.provider.as_str())
            .append_pair("redirect_to", &request.redirect_to);
        if let Some(scopes) = &request.scopes {
            url.query_pairs_mut().append_pair("scopes", scopes);
        }

        debug!(provider = %request.provider.as_str(), "Built authorize URL");
        Ok(url)
    }

    async fn sign_in_with_id_token(
        &self,
        provider: OAuthProvider,
        token: &str,
    ) -> BackendResult<Session> {
        let session = self
            .token_grant(
                "id_token",
                &IdTokenGrantRequest {
                    provider: provider.as_str(),
                    id_token: token,
                },
            )
            .await?;
        self.commit_session(&session, AuthEvent::SignedIn(session.clone()))?;

        debug!(
            user_id = %session.user.id,
            provider = %provider.as_str(),
            "Id-token sign in successful"
        );
        Ok(session)
    }

    async fn set_session(
        &self,
        _access_token: &str,
        refresh_token: &str,
    ) -> BackendResult<Session> {
        // The refresh grant re-issues a canonical credential pair together
        // with the identity, so the callback-supplied access token never has
        // to be trusted as-is.
        let session = self.refresh(refresh_token).await?;
        self.commit_session(&session, AuthEvent::SignedIn(session.clone()))?;

        debug!(user_id = %session.user.id, "Session established from OAuth callback");
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        if let Some(session) = self.load_persisted_session()? {
            let url = self.auth_url("logout");

            let response = self
                .http_client
                .post(&url)
                .header("apikey", &self.publishable_key)
                .header("Authorization", format!("Bearer {}", session.access_token))
                .send()
                .await?;

            // Local state stays untouched on backend failure so the client
            // remains consistent with actual auth state.
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, "Sign out failed");
                return Err(error_from_body(status, &body));
            }
        }

        self.storage.clear()?;
        let _ = self.events.send(AuthEvent::SignedOut);

        debug!("Signed out");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
