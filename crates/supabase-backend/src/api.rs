//! Collaborator contracts consumed by the auth core.

use crate::{BackendResult, Profile, ProfileUpdate, Session};
use async_trait::async_trait;
use tokio::sync::broadcast;
use url::Url;

/// Third-party identity providers supported by the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    /// Provider tag used on the wire (authorize URL, id-token grant).
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Facebook => "facebook",
        }
    }

    /// Human-readable provider name for error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "Google",
            OAuthProvider::Facebook => "Facebook",
        }
    }
}

/// Options for starting an OAuth authorization flow.
#[derive(Debug, Clone)]
pub struct OAuthRequest {
    pub provider: OAuthProvider,
    /// Where the provider should send the user after authorization.
    pub redirect_to: String,
    /// When true the client opens the authorize URL itself instead of
    /// letting the page navigate (native in-app browser flow).
    pub skip_browser_redirect: bool,
    /// Space-separated provider scopes, when the default set is not enough.
    pub scopes: Option<String>,
}

/// Session change pushed by the auth backend.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

impl AuthEvent {
    /// The session carried by this event, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => Some(session),
            AuthEvent::SignedOut => None,
        }
    }
}

/// Auth backend contract.
///
/// Implementations persist the current session themselves and publish every
/// session change on the event channel returned by [`subscribe`], in the
/// order the changes happen.
///
/// [`subscribe`]: AuthApi::subscribe
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Return the persisted session, refreshing it first when expired.
    async fn get_session(&self) -> BackendResult<Option<Session>>;

    /// Password-grant sign in for an existing account.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session>;

    /// Create a new identity with email/password credentials.
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<Session>;

    /// Build the provider authorization URL for an OAuth flow.
    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> BackendResult<Url>;

    /// Exchange a provider-SDK-issued token for a session.
    async fn sign_in_with_id_token(
        &self,
        provider: OAuthProvider,
        token: &str,
    ) -> BackendResult<Session>;

    /// Establish a session from a credential pair handed back by an OAuth
    /// callback.
    async fn set_session(&self, access_token: &str, refresh_token: &str)
        -> BackendResult<Session>;

    /// Invalidate the current session server-side and clear it locally.
    async fn sign_out(&self) -> BackendResult<()>;

    /// Subscribe to session change events. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Profile table contract, keyed by identity id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile by identity id. `Ok(None)` when no row exists.
    async fn fetch(&self, id: &str) -> BackendResult<Option<Profile>>;

    /// Insert a new profile row. Fails with `BackendError::Duplicate` when
    /// the row already exists.
    async fn insert(&self, profile: &Profile) -> BackendResult<()>;

    /// Patch an existing profile row.
    async fn update(&self, id: &str, changes: &ProfileUpdate) -> BackendResult<()>;
}
