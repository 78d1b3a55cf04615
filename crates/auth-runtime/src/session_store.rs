//! In-memory source of truth for the current session.

use std::sync::{Arc, Mutex};
use supabase_backend::{AuthApi, AuthEvent, Session};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Holds the session the client currently acts as.
///
/// The held value is only ever replaced wholesale; field-level mutation is
/// not possible from outside. The coordinator applies bootstrap results and
/// change events through [`replace`] under its own serialization, so readers
/// never observe a half-applied transition.
///
/// [`replace`]: SessionStore::replace
pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    current: Mutex<Option<Session>>,
}

impl SessionStore {
    /// Create an empty store backed by the given auth service.
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self {
            api,
            current: Mutex::new(None),
        }
    }

    /// Fetch any persisted session from the backend on cold start.
    ///
    /// A bootstrap failure (network, storage) is logged and reported as "no
    /// session": authentication simply starts unauthenticated and the user
    /// lands on the login screen. The result is not applied here; the caller
    /// decides whether it still wins against concurrently arriving change
    /// events.
    pub async fn bootstrap(&self) -> Option<Session> {
        match self.api.get_session().await {
            Ok(Some(session)) => {
                debug!(user_id = %session.user.id, "Bootstrap found a persisted session");
                Some(session)
            }
            Ok(None) => {
                debug!("Bootstrap found no persisted session");
                None
            }
            Err(error) => {
                warn!(error = %error, "Session bootstrap failed, starting unauthenticated");
                None
            }
        }
    }

    /// Subscribe to the backend's session change stream.
    ///
    /// Events arrive in backend emission order. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.api.subscribe()
    }

    /// Replace the current session wholesale.
    pub fn replace(&self, session: Option<Session>) {
        *self.current.lock().unwrap() = session;
    }

    /// The current session, if any.
    pub fn current(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }

    /// The identity id of the current session, if any.
    ///
    /// Used to discard async work that completes after the identity it was
    /// started for has been superseded.
    pub fn current_identity_id(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|session| session.user.id.clone())
    }
}
