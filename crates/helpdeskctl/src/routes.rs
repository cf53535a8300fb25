//! Routes - which view a path opens, and who may open it
//!
//! `/` is the simplified public entry point and never consults the session.
//! The portal home and agent workspace routes go through the access guard.

use helpdesk_common::Role;
use std::fmt;

use crate::guard::{self, AccessDecision};
use crate::session::{Navigation, SessionContext};

const PORTAL_ROLES: &[Role] = &[Role::Customer, Role::Admin];
const AGENT_ROLES: &[Role] = &[Role::InternalAgent, Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/` - public portal, no guard
    Home,
    /// `/portal/home` - portal for signed-in customers
    PortalHome,
    /// `/agent/workspace` - live agent dashboard
    AgentWorkspace,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Home, Route::PortalHome, Route::AgentWorkspace];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::PortalHome => "/portal/home",
            Route::AgentWorkspace => "/agent/workspace",
        }
    }

    /// Resolve a path; unknown paths land on `/`
    pub fn from_path(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or("").trim();
        let path = path.trim_end_matches('/');
        Route::ALL
            .into_iter()
            .find(|route| route.path().trim_end_matches('/') == path)
            .unwrap_or(Route::Home)
    }

    /// Roles admitted by the guard; `None` means the route is unguarded
    pub fn guard(&self) -> Option<&'static [Role]> {
        match self {
            Route::Home => None,
            Route::PortalHome => Some(PORTAL_ROLES),
            Route::AgentWorkspace => Some(AGENT_ROLES),
        }
    }

    pub fn is_agent_view(&self) -> bool {
        matches!(self, Route::AgentWorkspace)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// What entering a route produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Show the route's view
    Render(Route),
    /// Leave for the login flow; nothing is rendered
    Navigate(Navigation),
    /// Show the fixed access-denied message
    Forbidden,
}

/// Enter `route` with the given session
pub fn enter(route: Route, session: &SessionContext) -> RouteOutcome {
    let Some(roles) = route.guard() else {
        return RouteOutcome::Render(route);
    };

    match guard::check(session.identity(), Some(roles), route.path()) {
        AccessDecision::Granted => RouteOutcome::Render(route),
        AccessDecision::DenyRedirect(target) => RouteOutcome::Navigate(session.login(&target)),
        AccessDecision::DenyForbidden => {
            tracing::info!("Access to {} denied", route);
            RouteOutcome::Forbidden
        }
    }
}
