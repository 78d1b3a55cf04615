//! Session persistence seam.
//!
//! Host applications provide the platform implementation (keychain, secure
//! store, browser storage). The backend client only needs opaque string
//! round-tripping of the serialized session.

use crate::BackendResult;
use std::sync::Mutex;

/// Trait for session persistence backends.
pub trait SessionStorage: Send + Sync {
    /// Persist the serialized session, replacing any previous value.
    fn store(&self, session_json: &str) -> BackendResult<()>;

    /// Retrieve the serialized session.
    fn load(&self) -> BackendResult<Option<String>>;

    /// Delete the persisted session.
    fn clear(&self) -> BackendResult<()>;
}

/// In-memory session storage.
///
/// The default for hosts without durable secure storage (web builds keep the
/// session inside the page's lifetime); also the storage used in tests.
#[derive(Default)]
pub struct MemorySessionStorage {
    value: Mutex<Option<String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn store(&self, session_json: &str) -> BackendResult<()> {
        *self.value.lock().unwrap() = Some(session_json.to_string());
        Ok(())
    }

    fn load(&self) -> BackendResult<Option<String>> {
        Ok(self.value.lock().unwrap().clone())
    }

    fn clear(&self) -> BackendResult<()> {
        *self.value.lock().unwrap() = None;
        Ok(())
    }
}
