//! Supabase backend collaborators for the Steptrack client core.
//!
//! This crate provides:
//! - Domain types shared across the auth stack (identity, session, profile)
//! - The collaborator contracts the core depends on (`AuthApi`,
//!   `ProfileStore`, `SessionStorage`)
//! - Supabase REST implementations of those contracts

mod api;
mod auth_client;
mod error;
mod profile_client;
mod storage;
mod types;

pub use api::{AuthApi, AuthEvent, OAuthProvider, OAuthRequest, ProfileStore};
pub use auth_client::SupabaseAuth;
pub use error::{BackendError, BackendResult};
pub use profile_client::SupabaseProfiles;
pub use storage::{MemorySessionStorage, SessionStorage};
pub use types::{
    Identity, IdentityMetadata, NotificationPreferences, Profile, ProfileUpdate, Session, UserRole,
};
