//! Configuration for the client auth core.

use crate::ConfigResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default Supabase URL (can be overridden at compile time via SUPABASE_URL env var).
pub const DEFAULT_SUPABASE_URL: &str = match option_env!("SUPABASE_URL") {
    Some(url) => url,
    None => "https://steptrack.supabase.co",
};

/// Default Supabase publishable key (can be overridden at compile time via
/// SUPABASE_PUBLISHABLE_KEY env var).
pub const DEFAULT_SUPABASE_PUBLISHABLE_KEY: &str = match option_env!("SUPABASE_PUBLISHABLE_KEY") {
    Some(key) => key,
    None => "steptrack-publishable-key",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Deep-link scheme registered by the mobile app.
pub const DEFAULT_REDIRECT_SCHEME: &str = "steptrack";

/// Deep-link path the OAuth callback lands on.
pub const DEFAULT_REDIRECT_PATH: &str = "auth/callback";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Supabase project URL.
    #[serde(default = "default_supabase_url")]
    pub supabase_url: String,
    /// Supabase publishable API key (public, safe to expose).
    #[serde(default = "default_supabase_publishable_key")]
    pub supabase_publishable_key: String,
    /// Deep-link scheme used for native OAuth callbacks.
    #[serde(default = "default_redirect_scheme")]
    pub redirect_scheme: String,
    /// Deep-link path used for native OAuth callbacks.
    #[serde(default = "default_redirect_path")]
    pub redirect_path: String,
    /// Web origin used as the OAuth redirect target on web builds.
    #[serde(default)]
    pub web_origin: Option<String>,
    /// Facebook app id for the native SDK login strategy.
    #[serde(default)]
    pub facebook_app_id: Option<String>,
}

fn default_supabase_url() -> String {
    DEFAULT_SUPABASE_URL.to_string()
}

fn default_supabase_publishable_key() -> String {
    DEFAULT_SUPABASE_PUBLISHABLE_KEY.to_string()
}

fn default_redirect_scheme() -> String {
    DEFAULT_REDIRECT_SCHEME.to_string()
}

fn default_redirect_path() -> String {
    DEFAULT_REDIRECT_PATH.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            supabase_url: DEFAULT_SUPABASE_URL.to_string(),
            supabase_publishable_key: DEFAULT_SUPABASE_PUBLISHABLE_KEY.to_string(),
            redirect_scheme: DEFAULT_REDIRECT_SCHEME.to_string(),
            redirect_path: DEFAULT_REDIRECT_PATH.to_string(),
            web_origin: None,
            facebook_app_id: None,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from a file, falling back to defaults.
    ///
    /// Note: supabase_url and supabase_publishable_key are compile-time only
    /// and always use the built-in defaults, regardless of what's in the file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };

        // Force compile-time values (never from config file)
        config.supabase_url = DEFAULT_SUPABASE_URL.to_string();
        config.supabase_publishable_key = DEFAULT_SUPABASE_PUBLISHABLE_KEY.to_string();

        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Override settings from environment variables.
    pub fn load_from_env(&mut self) {
        if let Some(level) = non_empty_env("STEPTRACK_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(app_id) = non_empty_env("STEPTRACK_FACEBOOK_APP_ID") {
            self.facebook_app_id = Some(app_id);
        }
        if let Some(origin) = non_empty_env("STEPTRACK_WEB_ORIGIN") {
            self.web_origin = Some(origin);
        }
    }

    /// The app-scheme deep link the native OAuth flow redirects back to.
    pub fn redirect_uri(&self) -> String {
        format!("{}://{}", self.redirect_scheme, self.redirect_path)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
