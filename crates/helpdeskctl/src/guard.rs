//! Access guard - role-based gate in front of a view
//!
//! The guard only decides. Navigating to the login flow is the caller's job,
//! which keeps the decision pure and lets tests observe it directly.

use helpdesk_common::{Identity, Role};

/// Fixed message shown when a signed-in user lacks the required role
pub const ACCESS_DENIED_MESSAGE: &str = "You do not have permission to access this page!";

/// Outcome of checking an identity against a view's allowed roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    /// Nobody is signed in; log in and come back to `target`
    DenyRedirect(String),
    /// Signed in, but the role is not allowed here
    DenyForbidden,
}

/// Decide access for `identity` at `target`
///
/// `allowed == None` admits any signed-in identity.
pub fn check(identity: Option<&Identity>, allowed: Option<&[Role]>, target: &str) -> AccessDecision {
    let Some(identity) = identity else {
        return AccessDecision::DenyRedirect(target.to_string());
    };

    match allowed {
        Some(roles) if !roles.contains(&identity.role) => AccessDecision::DenyForbidden,
        _ => AccessDecision::Granted,
    }
}
