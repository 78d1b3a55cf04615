//! OAuth handshake strategies.
//!
//! Three execution models produce a session from a third-party identity
//! provider, selected once at construction time by platform — web builds
//! use [`OAuthHandshake::web`], native builds [`OAuthHandshake::native`].
//! Strategies are never re-selected per call.

use crate::{AuthError, AuthResult, ProfileBootstrapper};
use async_trait::async_trait;
use std::sync::Arc;
use supabase_backend::{AuthApi, OAuthProvider, OAuthRequest};
use tracing::{debug, info};
use url::Url;

/// Read permissions requested from the provider SDK.
const SDK_READ_PERMISSIONS: [&str; 2] = ["public_profile", "email"];

/// Provider scopes requested for the Facebook web flow.
const FACEBOOK_WEB_SCOPES: &str = "email public_profile";

/// Full-page navigation collaborator for web builds.
pub trait WebRedirector: Send + Sync {
    /// Navigate the page to the given URL. The page reloads already
    /// authenticated once the backend completes the exchange.
    fn redirect(&self, url: &Url);
}

/// Outcome of an ephemeral in-app browser auth session.
#[derive(Debug, Clone)]
pub enum BrowserResult {
    /// The flow completed and the browser landed on the return URL.
    Success { url: String },
    /// The user dismissed the browser.
    Cancelled,
}

/// Ephemeral in-app browser collaborator for native builds.
#[async_trait]
pub trait InAppBrowser: Send + Sync {
    /// Open an auth session on the given URL and resolve when it redirects
    /// to `return_url` or the user dismisses it.
    async fn open_auth_session(&self, url: &Url, return_url: &str) -> BrowserResult;
}

/// Outcome of a provider-SDK login attempt.
#[derive(Debug, Clone)]
pub enum SdkLoginResult {
    Success { token: String },
    Cancelled,
    Failed,
}

/// Native provider SDK collaborator (e.g. the Facebook SDK).
#[async_trait]
pub trait ProviderSdk: Send + Sync {
    /// Initialize the SDK with the configured app id.
    async fn initialize(&self, app_id: &str);

    /// Request a login with the given read permissions.
    async fn log_in_with_read_permissions(&self, permissions: &[&str]) -> SdkLoginResult;
}

/// One execution model for producing a session from an identity provider.
#[async_trait]
pub trait OAuthStrategy: Send + Sync {
    async fn sign_in(&self) -> AuthResult<()>;
}

/// Extract the credential pair from an OAuth callback deep link.
///
/// Both parameters are required; an incomplete callback yields `None` and
/// the flow is abandoned without error.
fn tokens_from_callback(callback_url: &str) -> Option<(String, String)> {
    let url = Url::parse(callback_url).ok()?;

    let mut access_token = None;
    let mut refresh_token = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "access_token" => access_token = Some(value.into_owned()),
            "refresh_token" => refresh_token = Some(value.into_owned()),
            _ => {}
        }
    }

    Some((access_token?, refresh_token?))
}

/// Web flow: full-page redirect to the provider; the backend completes the
/// exchange server-side and the page reloads already authenticated, so the
/// client never touches tokens.
pub struct WebRedirectStrategy {
    api: Arc<dyn AuthApi>,
    redirector: Arc<dyn WebRedirector>,
    provider: OAuthProvider,
    origin: String,
    scopes: Option<String>,
}

impl WebRedirectStrategy {
    pub fn new(
        api: Arc<dyn AuthApi>,
        redirector: Arc<dyn WebRedirector>,
        provider: OAuthProvider,
        origin: impl Into<String>,
        scopes: Option<String>,
    ) -> Self {
        Self {
            api,
            redirector,
            provider,
            origin: origin.into(),
            scopes,
        }
    }
}

#[async_trait]
impl OAuthStrategy for WebRedirectStrategy {
    async fn sign_in(&self) -> AuthResult<()> {
        let url = self
            .api
            .sign_in_with_oauth(&OAuthRequest {
                provider: self.provider,
                redirect_to: self.origin.clone(),
                skip_browser_redirect: false,
                scopes: self.scopes.clone(),
            })
            .await?;

        debug!(provider = %self.provider.as_str(), "Redirecting to provider");
        self.redirector.redirect(&url);
        Ok(())
    }
}

/// Native flow through an ephemeral in-app browser: the callback deep link
/// carries the credential pair, which is exchanged for a session explicitly.
pub struct NativeBrowserStrategy {
    api: Arc<dyn AuthApi>,
    browser: Arc<dyn InAppBrowser>,
    profiles: Arc<ProfileBootstrapper>,
    provider: OAuthProvider,
    redirect_uri: String,
}

impl NativeBrowserStrategy {
    pub fn new(
        api: Arc<dyn AuthApi>,
        browser: Arc<dyn InAppBrowser>,
        profiles: Arc<ProfileBootstrapper>,
        provider: OAuthProvider,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            api,
            browser,
            profiles,
            provider,
            redirect_uri: redirect_uri.into(),
        }
    }
}

#[async_trait]
impl OAuthStrategy for NativeBrowserStrategy {
    async fn sign_in(&self) -> AuthResult<()> {
        let authorize_url = self
            .api
            .sign_in_with_oauth(&OAuthRequest {
                provider: self.provider,
                redirect_to: self.redirect_uri.clone(),
                skip_browser_redirect: true,
                scopes: None,
            })
            .await?;

        match self
            .browser
            .open_auth_session(&authorize_url, &self.redirect_uri)
            .await
        {
            BrowserResult::Cancelled => {
                debug!(provider = %self.provider.as_str(), "In-app browser dismissed");
                Ok(())
            }
            BrowserResult::Success { url } => {
                let Some((access_token, refresh_token)) = tokens_from_callback(&url) else {
                    debug!(
                        provider = %self.provider.as_str(),
                        "Callback missing tokens, no session established"
                    );
                    return Ok(());
                };

                let session = self.api.set_session(&access_token, &refresh_token).await?;
                self.profiles.ensure_profile(&session.user).await;

                info!(
                    provider = %self.provider.as_str(),
                    user_id = %session.user.id,
                    "OAuth browser sign in complete"
                );
                Ok(())
            }
        }
    }
}

/// Native flow through the provider's own SDK: the SDK-issued token is
/// exchanged for a session via the id-token grant.
pub struct SdkTokenStrategy {
    api: Arc<dyn AuthApi>,
    sdk: Arc<dyn ProviderSdk>,
    profiles: Arc<ProfileBootstrapper>,
    provider: OAuthProvider,
    app_id: Option<String>,
}

impl SdkTokenStrategy {
    pub fn new(
        api: Arc<dyn AuthApi>,
        sdk: Arc<dyn ProviderSdk>,
        profiles: Arc<ProfileBootstrapper>,
        provider: OAuthProvider,
        app_id: Option<String>,
    ) -> Self {
        Self {
            api,
            sdk,
            profiles,
            provider,
            app_id,
        }
    }
}

#[async_trait]
impl OAuthStrategy for SdkTokenStrategy {
    async fn sign_in(&self) -> AuthResult<()> {
        let app_id = self.app_id.as_deref().ok_or_else(|| {
            AuthError::Config(format!(
                "{} app id not configured",
                self.provider.display_name()
            ))
        })?;

        self.sdk.initialize(app_id).await;

        match self
            .sdk
            .log_in_with_read_permissions(&SDK_READ_PERMISSIONS)
            .await
        {
            SdkLoginResult::Cancelled => {
                debug!(provider = %self.provider.as_str(), "SDK login cancelled");
                Ok(())
            }
            SdkLoginResult::Failed => Err(AuthError::ProviderLoginFailed {
                provider: self.provider.display_name(),
            }),
            SdkLoginResult::Success { token } => {
                let session = self
                    .api
                    .sign_in_with_id_token(self.provider, &token)
                    .await?;
                self.profiles.ensure_profile(&session.user).await;

                info!(
                    provider = %self.provider.as_str(),
                    user_id = %session.user.id,
                    "SDK token sign in complete"
                );
                Ok(())
            }
        }
    }
}

/// Settings for the native strategies.
#[derive(Debug, Clone)]
pub struct NativeOAuthConfig {
    /// App-scheme deep link the in-app browser flow returns to.
    pub redirect_uri: String,
    /// Facebook app id for the SDK strategy. Absence is a configuration
    /// error for that strategy only.
    pub facebook_app_id: Option<String>,
}

impl NativeOAuthConfig {
    /// Build from the client configuration.
    pub fn from_config(config: &client_config::Config) -> Self {
        Self {
            redirect_uri: config.redirect_uri(),
            facebook_app_id: config.facebook_app_id.clone(),
        }
    }
}

/// The three supported external-identity flows behind one capability
/// interface, with one strategy per provider.
pub struct OAuthHandshake {
    google: Box<dyn OAuthStrategy>,
    facebook: Box<dyn OAuthStrategy>,
}

impl OAuthHandshake {
    /// Strategies for web builds: both providers ride the full-page
    /// redirect. No profile bootstrapper is needed here — the exchange
    /// completes server-side and reconciliation happens on the resulting
    /// change event.
    pub fn web(
        api: Arc<dyn AuthApi>,
        redirector: Arc<dyn WebRedirector>,
        origin: impl Into<String>,
    ) -> Self {
        let origin = origin.into();
        Self {
            google: Box::new(WebRedirectStrategy::new(
                api.clone(),
                redirector.clone(),
                OAuthProvider::Google,
                origin.clone(),
                None,
            )),
            facebook: Box::new(WebRedirectStrategy::new(
                api,
                redirector,
                OAuthProvider::Facebook,
                origin,
                Some(FACEBOOK_WEB_SCOPES.to_string()),
            )),
        }
    }

    /// Strategies for native builds: Google through the in-app browser,
    /// Facebook through its SDK.
    pub fn native(
        api: Arc<dyn AuthApi>,
        profiles: Arc<ProfileBootstrapper>,
        browser: Arc<dyn InAppBrowser>,
        sdk: Arc<dyn ProviderSdk>,
        config: NativeOAuthConfig,
    ) -> Self {
        Self {
            google: Box::new(NativeBrowserStrategy::new(
                api.clone(),
                browser,
                profiles.clone(),
                OAuthProvider::Google,
                config.redirect_uri,
            )),
            facebook: Box::new(SdkTokenStrategy::new(
                api,
                sdk,
                profiles,
                OAuthProvider::Facebook,
                config.facebook_app_id,
            )),
        }
    }

    /// Run the configured strategy for a provider.
    pub async fn sign_in(&self, provider: OAuthProvider) -> AuthResult<()> {
        match provider {
            OAuthProvider::Google => self.google.sign_in().await,
            OAuthProvider::Facebook => self.facebook.sign_in().await,
        }
    }
}
