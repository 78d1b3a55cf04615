//! Authentication runtime for the Steptrack client.
//!
//! This crate provides:
//! - Session bootstrap and change-event consumption (`SessionStore`)
//! - Exactly-once profile creation for fresh identities
//!   (`ProfileBootstrapper`)
//! - The OAuth handshake strategies for web and native builds
//!   (`OAuthHandshake`)
//! - The public session API and the atomically published view state
//!   (`AuthCoordinator`, `AuthViewState`)

mod coordinator;
mod error;
mod oauth;
mod profile;
mod session_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{AuthCoordinator, AuthViewState};
pub use error::{AuthError, AuthResult};
pub use oauth::{
    BrowserResult, InAppBrowser, NativeBrowserStrategy, NativeOAuthConfig, OAuthHandshake,
    OAuthStrategy, ProviderSdk, SdkLoginResult, SdkTokenStrategy, WebRedirectStrategy,
    WebRedirector,
};
pub use profile::ProfileBootstrapper;
pub use session_store::SessionStore;
