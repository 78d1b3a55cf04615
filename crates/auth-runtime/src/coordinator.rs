//! The public session API and its derived view state.
//!
//! `AuthCoordinator` composes the session store, the profile bootstrapper
//! and the OAuth handshake into one explicitly constructed, dependency-
//! injected authority. It owns two background pipelines: the cold-start
//! bootstrap and the change-event loop. Both funnel into a serialized apply
//! step so dependents always observe whole transitions in arrival order.

use crate::{AuthError, AuthResult, OAuthHandshake, ProfileBootstrapper, SessionStore};
use std::sync::{Arc, Mutex as StdMutex};
use supabase_backend::{
    AuthApi, AuthEvent, Identity, OAuthProvider, Profile, ProfileUpdate, Session,
};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Derived authentication state, published atomically on every transition.
///
/// Consumers never observe a torn read across the three fields: a new value
/// replaces the old one wholesale through the watch channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthViewState {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    /// True until the first of {bootstrap, change event} has been fully
    /// processed, including profile reconciliation.
    pub loading: bool,
}

impl AuthViewState {
    /// The state before any session information has arrived.
    pub fn initial() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
        }
    }

    /// Whether an authenticated identity is present.
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl Default for AuthViewState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Where a session change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeSource {
    Bootstrap,
    Event,
}

/// Gate state shared by the bootstrap and event pipelines.
struct ApplyGate {
    change_event_applied: bool,
}

/// The public session API.
pub struct AuthCoordinator {
    api: Arc<dyn AuthApi>,
    sessions: SessionStore,
    profiles: Arc<ProfileBootstrapper>,
    oauth: OAuthHandshake,
    state: watch::Sender<AuthViewState>,
    apply_gate: Mutex<ApplyGate>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl AuthCoordinator {
    /// Construct the coordinator and start its background pipelines.
    ///
    /// The change-event subscription is taken before the bootstrap starts so
    /// no event emitted in between can be missed. Call [`shutdown`] on
    /// teardown to release the subscription.
    ///
    /// [`shutdown`]: AuthCoordinator::shutdown
    pub fn start(
        api: Arc<dyn AuthApi>,
        profiles: Arc<ProfileBootstrapper>,
        oauth: OAuthHandshake,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(AuthViewState::initial());

        let coordinator = Arc::new(Self {
            sessions: SessionStore::new(api.clone()),
            api,
            profiles,
            oauth,
            state,
            apply_gate: Mutex::new(ApplyGate {
                change_event_applied: false,
            }),
            tasks: StdMutex::new(Vec::new()),
        });

        let events = coordinator.sessions.subscribe();

        let event_task = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.run_event_loop(events).await }
        });
        let bootstrap_task = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.run_bootstrap().await }
        });

        coordinator
            .tasks
            .lock()
            .unwrap()
            .extend([event_task, bootstrap_task]);

        coordinator
    }

    /// Abort the background pipelines and release the event subscription.
    ///
    /// Any OAuth browser session still in flight is left to the OS; its
    /// resolution after this point only touches dropped channels.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        debug!("Auth coordinator shut down");
    }

    /// Subscribe to the derived view state.
    pub fn view_state(&self) -> watch::Receiver<AuthViewState> {
        self.state.subscribe()
    }

    /// The current view state value.
    pub fn current_state(&self) -> AuthViewState {
        self.state.borrow().clone()
    }

    /// Sign in an existing user with email/password credentials.
    ///
    /// The backend's error is thrown verbatim; no profile is created on
    /// this path.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<()> {
        self.api.sign_in_with_password(email, password).await?;

        info!(email = %email, "Password sign in accepted");
        Ok(())
    }

    /// Create a new account and its profile row.
    ///
    /// The profile insert is unconditional (the identity is brand new); a
    /// failure of either step is rethrown, and a profile-insert failure
    /// surfaces as the insert error itself.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_initial: &str,
    ) -> AuthResult<()> {
        let session = self.api.sign_up(email, password).await?;

        self.profiles
            .insert_for_sign_up(&session.user, email, first_name, last_initial)
            .await?;

        info!(user_id = %session.user.id, "Sign up complete");
        Ok(())
    }

    /// Sign in with Google through the platform-selected strategy.
    pub async fn sign_in_with_google(&self) -> AuthResult<()> {
        self.oauth.sign_in(OAuthProvider::Google).await
    }

    /// Sign in with Facebook through the platform-selected strategy.
    pub async fn sign_in_with_facebook(&self) -> AuthResult<()> {
        self.oauth.sign_in(OAuthProvider::Facebook).await
    }

    /// Invalidate the session server-side, then clear local profile state.
    ///
    /// On backend failure local state stays untouched, so the UI remains
    /// consistent with actual auth state.
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.api.sign_out().await?;

        self.state.send_modify(|state| state.profile = None);

        info!("Signed out");
        Ok(())
    }

    /// Re-fetch the current identity's profile, without creating one.
    ///
    /// No-op when unauthenticated. The result is dropped when the identity
    /// changes while the fetch is in flight.
    pub async fn refresh_profile(&self) {
        let Some(id) = self.sessions.current_identity_id() else {
            return;
        };

        let profile = self.profiles.refresh_profile(&id).await;

        if self.sessions.current_identity_id().as_deref() == Some(id.as_str()) {
            self.state.send_modify(|state| state.profile = profile);
        } else {
            debug!(user_id = %id, "Discarding refreshed profile for superseded identity");
        }
    }

    /// Patch the current identity's profile row, then refresh it.
    pub async fn update_profile(&self, changes: &ProfileUpdate) -> AuthResult<()> {
        let id = self
            .sessions
            .current_identity_id()
            .ok_or(AuthError::NotLoggedIn)?;

        self.profiles.store().update(&id, changes).await?;
        self.refresh_profile().await;
        Ok(())
    }

    async fn run_bootstrap(&self) {
        let session = self.sessions.bootstrap().await;
        self.apply_change(session, ChangeSource::Bootstrap).await;
    }

    async fn run_event_loop(&self, mut events: broadcast::Receiver<AuthEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let session = event.session().cloned();
                    self.apply_change(session, ChangeSource::Event).await;
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Sessions are replaced wholesale, so skipped events
                    // collapse into the next one received.
                    warn!(missed, "Auth event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Apply one session change and publish the resulting view state.
    ///
    /// Serialized by the apply gate: change events apply in arrival order,
    /// and a bootstrap result that resolves after any change event has been
    /// applied is stale and discarded (last event wins).
    async fn apply_change(&self, session: Option<Session>, source: ChangeSource) {
        let mut gate = self.apply_gate.lock().await;

        match source {
            ChangeSource::Bootstrap if gate.change_event_applied => {
                debug!("Discarding bootstrap result: a change event was already applied");
                return;
            }
            ChangeSource::Event => gate.change_event_applied = true,
            ChangeSource::Bootstrap => {}
        }

        self.sessions.replace(session.clone());

        let next = match session {
            Some(session) => {
                // Cold start only re-fetches; change events also create the
                // profile when a fresh OAuth identity arrives without one.
                let profile = match source {
                    ChangeSource::Bootstrap => {
                        self.profiles.refresh_profile(&session.user.id).await
                    }
                    ChangeSource::Event => self.profiles.ensure_profile(&session.user).await,
                };

                // Reconciliation is keyed by the identity current at
                // completion time; a superseded identity's profile must not
                // resurface.
                if self.sessions.current_identity_id().as_deref() != Some(session.user.id.as_str())
                {
                    debug!(
                        user_id = %session.user.id,
                        "Discarding reconciliation result for superseded identity"
                    );
                    return;
                }

                AuthViewState {
                    identity: Some(session.user),
                    profile,
                    loading: false,
                }
            }
            None => AuthViewState {
                identity: None,
                profile: None,
                loading: false,
            },
        };

        self.state.send_replace(next);
    }
}
