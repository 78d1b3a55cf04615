//! Configuration and logging bootstrap for the Steptrack client core.
//!
//! This crate provides:
//! - Compile-time Supabase project settings with runtime overrides
//! - OAuth client settings (deep-link scheme, Facebook app id)
//! - Tracing initialization shared by all host binaries

mod config;
mod error;
mod logging;

pub use config::{
    Config, DEFAULT_LOG_LEVEL, DEFAULT_REDIRECT_PATH, DEFAULT_REDIRECT_SCHEME,
    DEFAULT_SUPABASE_PUBLISHABLE_KEY, DEFAULT_SUPABASE_URL,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::init_logging;
