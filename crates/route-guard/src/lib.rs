//! Post-authentication routing gate.
//!
//! Maps the derived auth state and the current route segment to a single
//! navigation decision. The decision function is pure; the surrounding
//! [`RouteGuard`] re-evaluates it on every state or segment change and
//! applies the result idempotently through the router collaborator.

use auth_runtime::AuthViewState;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Top-level path component the navigation system is currently rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Tabs,
    Onboarding,
    Login,
    Signup,
    Other,
}

impl Segment {
    /// Parse the leading segment of a route path.
    pub fn from_path(path: &str) -> Self {
        match path.trim_start_matches('/').split('/').next() {
            Some("(tabs)") => Segment::Tabs,
            Some("onboarding") => Segment::Onboarding,
            Some("login") => Segment::Login,
            Some("signup") => Segment::Signup,
            _ => Segment::Other,
        }
    }
}

/// Navigation target issued by the decision function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Login,
    Onboarding,
    Tabs,
}

impl RouteDecision {
    /// The path handed to the router.
    pub fn path(&self) -> &'static str {
        match self {
            RouteDecision::Login => "/login",
            RouteDecision::Onboarding => "/onboarding",
            RouteDecision::Tabs => "/(tabs)",
        }
    }
}

/// Decide where the user must be, given the auth state and where they are.
///
/// Pure function: rules are evaluated in order and the first match wins; no
/// match means no navigation. While the auth state is still loading no
/// decision is issued, so startup races cannot cause redirect thrashing.
pub fn decide(state: &AuthViewState, segment: Segment) -> Option<RouteDecision> {
    if state.loading {
        return None;
    }

    let in_tabs = segment == Segment::Tabs;
    let in_onboarding = segment == Segment::Onboarding;
    let in_auth_screen = matches!(segment, Segment::Login | Segment::Signup);

    match (&state.identity, &state.profile) {
        (None, _) if in_tabs => Some(RouteDecision::Login),
        (None, _) if !in_auth_screen => Some(RouteDecision::Login),
        (Some(_), Some(profile)) if profile.sobriety_date.is_some() => {
            (in_auth_screen || in_onboarding).then_some(RouteDecision::Tabs)
        }
        (Some(_), Some(_)) if !in_onboarding => Some(RouteDecision::Onboarding),
        (Some(_), None) if !in_onboarding => Some(RouteDecision::Onboarding),
        _ => None,
    }
}

/// Router collaborator applying navigation decisions.
pub trait Router: Send + Sync {
    /// Replace the current route with the given path.
    fn replace(&self, path: &str);
}

struct GuardState {
    segment: Segment,
    last_decision: Option<RouteDecision>,
}

/// Watches the auth view state and drives the router.
///
/// Re-evaluates the decision table on every auth state change and on every
/// segment change. A decision identical to the last one issued is
/// suppressed; the memo clears whenever evaluation yields no decision, so a
/// later user-initiated segment change can legitimately trigger the same
/// navigation again.
pub struct RouteGuard {
    router: Arc<dyn Router>,
    state_rx: watch::Receiver<AuthViewState>,
    guard_state: Mutex<GuardState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RouteGuard {
    /// Start watching the auth state, beginning in the given segment.
    pub fn start(
        state_rx: watch::Receiver<AuthViewState>,
        router: Arc<dyn Router>,
        initial_segment: Segment,
    ) -> Arc<Self> {
        let guard = Arc::new(Self {
            router,
            state_rx: state_rx.clone(),
            guard_state: Mutex::new(GuardState {
                segment: initial_segment,
                last_decision: None,
            }),
            task: Mutex::new(None),
        });

        let task = tokio::spawn({
            let guard = guard.clone();
            let mut state_rx = state_rx;
            async move {
                loop {
                    guard.evaluate();
                    if state_rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        });
        *guard.task.lock().unwrap() = Some(task);

        guard
    }

    /// Record a segment change (user navigation) and re-evaluate.
    pub fn set_segment(&self, segment: Segment) {
        self.guard_state.lock().unwrap().segment = segment;
        self.evaluate();
    }

    /// Stop watching the auth state.
    pub fn shutdown(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }

    fn evaluate(&self) {
        let state = self.state_rx.borrow().clone();
        let mut guard_state = self.guard_state.lock().unwrap();

        match decide(&state, guard_state.segment) {
            Some(decision) if guard_state.last_decision != Some(decision) => {
                debug!(?decision, segment = ?guard_state.segment, "Navigating");
                guard_state.last_decision = Some(decision);
                self.router.replace(decision.path());
            }
            Some(_) => {}
            None => guard_state.last_decision = None,
        }
    }
}
