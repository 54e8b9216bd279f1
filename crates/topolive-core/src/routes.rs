use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical destinations the session can send the UI to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Logout,
    Topology,
    Conversation,
    Discovery,
    Preference,
}

impl Route {
    /// Where an authenticated session lands.
    pub const HOME: Route = Route::Topology;

    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Logout => "/logout",
            Self::Topology => "/topology",
            Self::Conversation => "/conversation",
            Self::Discovery => "/discovery",
            Self::Preference => "/preference",
        }
    }

    /// Unknown paths fall back to [`Route::HOME`].
    pub fn from_path(path: &str) -> Self {
        match path.split(['?', '#']).next().unwrap_or_default() {
            "/login" => Self::Login,
            "/logout" => Self::Logout,
            "/conversation" => Self::Conversation,
            "/discovery" => Self::Discovery,
            "/preference" => Self::Preference,
            _ => Self::HOME,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Proceed,
    Redirect(Route),
    /// Cancel the navigation and stay where we are.
    Stay,
}

/// Navigation guard: a logged-out session only sees the login page, and a
/// logged-in session never goes back to it.
pub fn guard(authenticated: Option<bool>, target: Route) -> RouteDecision {
    match (authenticated, target) {
        (Some(false), Route::Login) => RouteDecision::Proceed,
        (Some(false), _) => RouteDecision::Redirect(Route::Login),
        (Some(true), Route::Login) => RouteDecision::Stay,
        _ => RouteDecision::Proceed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_roundtrip() {
        for route in [
            Route::Login,
            Route::Logout,
            Route::Topology,
            Route::Conversation,
            Route::Discovery,
            Route::Preference,
        ] {
            assert_eq!(Route::from_path(route.path()), route);
        }
    }

    #[test]
    fn unknown_path_goes_home() {
        assert_eq!(Route::from_path("/nowhere"), Route::Topology);
        assert_eq!(Route::from_path("/discovery?x=1"), Route::Discovery);
    }

    #[test]
    fn guard_logged_out() {
        assert_eq!(guard(Some(false), Route::Topology), RouteDecision::Redirect(Route::Login));
        assert_eq!(guard(Some(false), Route::Login), RouteDecision::Proceed);
    }

    #[test]
    fn guard_logged_in() {
        assert_eq!(guard(Some(true), Route::Login), RouteDecision::Stay);
        assert_eq!(guard(Some(true), Route::Discovery), RouteDecision::Proceed);
    }

    #[test]
    fn guard_undetermined_lets_everything_through() {
        assert_eq!(guard(None, Route::Login), RouteDecision::Proceed);
        assert_eq!(guard(None, Route::Topology), RouteDecision::Proceed);
    }
}
