//! Shared test doubles for the auth runtime.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use supabase_backend::{
    AuthApi, AuthEvent, BackendError, BackendResult, Identity, IdentityMetadata, OAuthProvider,
    OAuthRequest, Profile, ProfileStore, ProfileUpdate, Session,
};
use tokio::sync::{broadcast, Notify};
use url::Url;

pub(crate) fn test_identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: Some(format!("{}@example.com", id)),
        metadata: IdentityMetadata::default(),
    }
}

pub(crate) fn test_identity_with_name(id: &str, full_name: &str) -> Identity {
    Identity {
        metadata: IdentityMetadata {
            full_name: Some(full_name.to_string()),
        },
        ..test_identity(id)
    }
}

pub(crate) fn test_session(id: &str) -> Session {
    Session {
        access_token: format!("access-{}", id),
        refresh_token: format!("refresh-{}", id),
        expires_at: Utc::now() + Duration::hours(1),
        user: test_identity(id),
    }
}

/// In-memory auth backend with scriptable failures.
pub(crate) struct FakeAuthApi {
    events: broadcast::Sender<AuthEvent>,
    persisted: Mutex<Option<Session>>,
    get_session_fails: AtomicBool,
    get_session_gate: Mutex<Option<Arc<Notify>>>,
    password_error: Mutex<Option<String>>,
    sign_up_error: Mutex<Option<String>>,
    sign_out_error: Mutex<Option<String>>,
    id_token_calls: AtomicUsize,
    set_session_calls: Mutex<Vec<(String, String)>>,
    oauth_requests: Mutex<Vec<OAuthRequest>>,
}

impl FakeAuthApi {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            persisted: Mutex::new(None),
            get_session_fails: AtomicBool::new(false),
            get_session_gate: Mutex::new(None),
            password_error: Mutex::new(None),
            sign_up_error: Mutex::new(None),
            sign_out_error: Mutex::new(None),
            id_token_calls: AtomicUsize::new(0),
            set_session_calls: Mutex::new(Vec::new()),
            oauth_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_persisted(&self, session: Option<Session>) {
        *self.persisted.lock().unwrap() = session;
    }

    pub fn fail_get_session(&self) {
        self.get_session_fails.store(true, Ordering::SeqCst);
    }

    /// Make `get_session` wait until the returned handle is notified.
    pub fn gate_get_session(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.get_session_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fail_password_sign_in(&self, message: &str) {
        *self.password_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_sign_up(&self, message: &str) {
        *self.sign_up_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_sign_out(&self, message: &str) {
        *self.sign_out_error.lock().unwrap() = Some(message.to_string());
    }

    /// Push a change event as the backend would.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    pub fn id_token_call_count(&self) -> usize {
        self.id_token_calls.load(Ordering::SeqCst)
    }

    pub fn set_session_calls(&self) -> Vec<(String, String)> {
        self.set_session_calls.lock().unwrap().clone()
    }

    pub fn oauth_requests(&self) -> Vec<OAuthRequest> {
        self.oauth_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn get_session(&self) -> BackendResult<Option<Session>> {
        let gate = self.get_session_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.get_session_fails.load(Ordering::SeqCst) {
            return Err(BackendError::Api("network unreachable".to_string()));
        }
        Ok(self.persisted.lock().unwrap().clone())
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> BackendResult<Session> {
        if let Some(message) = self.password_error.lock().unwrap().clone() {
            return Err(BackendError::Api(message));
        }

        let mut session = test_session("password-user");
        session.user.email = Some(email.to_string());
        self.set_persisted(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> BackendResult<Session> {
        if let Some(message) = self.sign_up_error.lock().unwrap().clone() {
            return Err(BackendError::Api(message));
        }

        let mut session = test_session(&format!("user-{}", uuid::Uuid::new_v4()));
        session.user.email = Some(email.to_string());
        self.set_persisted(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> BackendResult<Url> {
        self.oauth_requests.lock().unwrap().push(request.clone());

        let mut url = Url::parse("https://test.supabase.co/auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", request.provider.as_str())
            .append_pair("redirect_to", &request.redirect_to);
        Ok(url)
    }

    async fn sign_in_with_id_token(
        &self,
        _provider: OAuthProvider,
        _token: &str,
    ) -> BackendResult<Session> {
        self.id_token_calls.fetch_add(1, Ordering::SeqCst);

        let session = test_session("sdk-user");
        self.set_persisted(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> BackendResult<Session> {
        self.set_session_calls
            .lock()
            .unwrap()
            .push((access_token.to_string(), refresh_token.to_string()));

        let session = test_session("oauth-user");
        self.set_persisted(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        if let Some(message) = self.sign_out_error.lock().unwrap().clone() {
            return Err(BackendError::Api(message));
        }

        self.set_persisted(None);
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

enum InsertFailure {
    Duplicate,
    Message(String),
}

/// In-memory profile table with call counting.
pub(crate) struct FakeProfileStore {
    rows: Mutex<HashMap<String, Profile>>,
    insert_calls: AtomicUsize,
    update_calls: AtomicUsize,
    insert_failure: Mutex<Option<InsertFailure>>,
    fetch_fails: AtomicBool,
    fetch_delay: Mutex<Option<std::time::Duration>>,
}

impl FakeProfileStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            insert_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            insert_failure: Mutex::new(None),
            fetch_fails: AtomicBool::new(false),
            fetch_delay: Mutex::new(None),
        }
    }

    pub fn put(&self, profile: Profile) {
        self.rows.lock().unwrap().insert(profile.id.clone(), profile);
    }

    pub fn insert_count(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Fail the next insert with a duplicate-key conflict, materializing the
    /// row the concurrent winner would have written.
    pub fn fail_next_insert_with_duplicate(&self) {
        *self.insert_failure.lock().unwrap() = Some(InsertFailure::Duplicate);
    }

    /// Fail every insert from now on with the given message.
    pub fn fail_inserts_with_message(&self, message: &str) {
        *self.insert_failure.lock().unwrap() = Some(InsertFailure::Message(message.to_string()));
    }

    pub fn fail_fetches(&self) {
        self.fetch_fails.store(true, Ordering::SeqCst);
    }

    /// Delay every fetch, to exercise slow reconciliation pipelines.
    pub fn delay_fetches(&self, delay: std::time::Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn fetch(&self, id: &str) -> BackendResult<Option<Profile>> {
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fetch_fails.load(Ordering::SeqCst) {
            return Err(BackendError::Api("profile fetch failed".to_string()));
        }
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn insert(&self, profile: &Profile) -> BackendResult<()> {
        let failure = {
            let mut guard = self.insert_failure.lock().unwrap();
            match &*guard {
                // The duplicate conflict fires once, as a real race would.
                Some(InsertFailure::Duplicate) => guard.take(),
                Some(InsertFailure::Message(message)) => {
                    Some(InsertFailure::Message(message.clone()))
                }
                None => None,
            }
        };

        match failure {
            Some(InsertFailure::Duplicate) => {
                self.rows.lock().unwrap().insert(
                    profile.id.clone(),
                    Profile {
                        first_name: "Concurrent".to_string(),
                        ..profile.clone()
                    },
                );
                return Err(BackendError::Duplicate("profiles_pkey".to_string()));
            }
            Some(InsertFailure::Message(message)) => {
                return Err(BackendError::Api(message));
            }
            None => {}
        }

        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&profile.id) {
            return Err(BackendError::Duplicate("profiles_pkey".to_string()));
        }
        rows.insert(profile.id.clone(), profile.clone());
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, id: &str, changes: &ProfileUpdate) -> BackendResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(id) else {
            return Err(BackendError::Api("row not found".to_string()));
        };

        if let Some(first_name) = &changes.first_name {
            row.first_name = first_name.clone();
        }
        if let Some(role) = changes.role {
            row.role = Some(role);
        }
        if let Some(sobriety_date) = changes.sobriety_date {
            row.sobriety_date = Some(sobriety_date);
        }
        if let Some(preferences) = &changes.notification_preferences {
            row.notification_preferences = preferences.clone();
        }
        Ok(())
    }
}
