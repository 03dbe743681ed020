//! Navigation gate.
//!
//! A pure decision function over the current session state and a requested
//! path. It holds no state of its own and must be re-evaluated on every
//! navigation attempt and every session transition.

use crate::session::SessionState;

/// Path of the login view.
pub const LOGIN_PATH: &str = "/";
/// Path of the dashboard view.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Views reachable only with an authenticated identity.
pub const PROTECTED_PATHS: &[&str] = &[DASHBOARD_PATH];

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Render the requested view.
    Render,
    /// Navigate to another path instead.
    Redirect(&'static str),
    /// Bootstrap has not settled; render nothing yet.
    Hold,
}

/// Returns true if the path requires an authenticated identity.
pub fn is_protected(path: &str) -> bool {
    PROTECTED_PATHS.contains(&path)
}

/// Decides whether a requested path renders, redirects, or waits.
///
/// While the session is still bootstrapping the gate holds rather than
/// prematurely redirecting a protected route to login.
pub fn decide(state: &SessionState, path: &str) -> Decision {
    match state {
        SessionState::Bootstrapping => Decision::Hold,
        SessionState::Authenticated(_) if path == LOGIN_PATH => Decision::Redirect(DASHBOARD_PATH),
        SessionState::Authenticated(_) => Decision::Render,
        SessionState::Unauthenticated if is_protected(path) => Decision::Redirect(LOGIN_PATH),
        SessionState::Unauthenticated => Decision::Render,
    }
}
