//! Session-gated navigation.
//!
//! SYSTEM CONTEXT
//! ==============
//! The routing layer presents the authenticated stack when signed in, the
//! welcome stack when signed out, and only a wait indicator while the
//! session is loading. The guard task turns controller transitions into
//! `Navigator::replace` calls.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::session::{SessionState, TransitionFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Blocking wait indicator; no screen stack.
    Loading,
    /// Authenticated tab stack.
    Home,
    /// Pre-authentication stack (splash, onboarding, auth).
    Welcome,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Loading => "",
            Self::Home => "/(tabs)",
            Self::Welcome => "/splash",
        }
    }
}

#[must_use]
pub fn route_for(state: &SessionState) -> Route {
    match state {
        SessionState::Loading => Route::Loading,
        SessionState::SignedIn(_) => Route::Home,
        SessionState::SignedOut => Route::Welcome,
    }
}

/// Navigation sink implemented by the UI shell.
pub trait Navigator: Send + Sync {
    fn replace(&self, route: Route);
}

/// Yields a route only when it differs from the last one presented.
#[derive(Debug, Default)]
pub struct RouteDecider {
    last: Option<Route>,
}

impl RouteDecider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decide(&mut self, state: &SessionState) -> Option<Route> {
        match route_for(state) {
            Route::Loading => None,
            route => self.present(route),
        }
    }

    /// Presents `Welcome` after the loading wait gave up.
    pub fn loading_timed_out(&mut self) -> Option<Route> {
        self.present(Route::Welcome)
    }

    #[must_use]
    pub fn last(&self) -> Option<Route> {
        self.last
    }

    fn present(&mut self, route: Route) -> Option<Route> {
        if self.last == Some(route) {
            return None;
        }
        self.last = Some(route);
        Some(route)
    }
}

/// Spawn the guard task. It ends when the controller stops.
pub fn spawn_route_guard(
    feed: TransitionFeed,
    navigator: Arc<dyn Navigator>,
    loading_timeout: Option<Duration>,
) -> JoinHandle<()> {
    tokio::spawn(run_route_guard(feed, navigator, loading_timeout))
}

async fn run_route_guard(feed: TransitionFeed, navigator: Arc<dyn Navigator>, loading_timeout: Option<Duration>) {
    let TransitionFeed { initial, mut rx } = feed;
    let mut decider = RouteDecider::new();
    let navigate = |decider: &mut RouteDecider, state: &SessionState| {
        if let Some(route) = decider.decide(state) {
            info!(route = route.path(), "navigating");
            navigator.replace(route);
        }
    };

    navigate(&mut decider, &initial);

    if initial.is_loading() {
        if let Some(timeout) = loading_timeout {
            match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(transition)) => navigate(&mut decider, &transition.to),
                Ok(None) => return,
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs(), "session still loading; showing welcome");
                    if let Some(route) = decider.loading_timed_out() {
                        navigator.replace(route);
                    }
                }
            }
        }
    }

    while let Some(transition) = rx.recv().await {
        navigate(&mut decider, &transition.to);
    }
}

#[cfg(test)]
#[path = "routing_test.rs"]
mod tests;
