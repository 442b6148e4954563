//! Route-guard decision logic.
//!
//! [`evaluate`] is a pure function of the session snapshot, whether a
//! token is sitting in storage, the required role and the requested
//! location. The client crate wraps it with the live auth context.

use crate::principal::Principal;
use crate::roles::Role;
use crate::session::SessionSnapshot;

/// Default login destination.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Where an access-denied view's back action leads when nothing else is known.
pub const DEFAULT_BACK_PATH: &str = "/";

/// Everything the guard looks at.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub session: &'a SessionSnapshot,
    pub has_persisted_token: bool,
    pub required: Role,
    /// The location the visitor asked for (path plus query).
    pub location: &'a str,
    pub login_path: &'a str,
}

/// A navigation the host router must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// The originally requested location, for the post-login return trip.
    pub from: String,
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

/// What the guard decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Session restoration is in progress: render a neutral placeholder.
    Loading,
    /// Not authenticated but a token is persisted: render a
    /// "refreshing session" placeholder instead of redirecting.
    RefreshingSession,
    /// Not authenticated and no token: go to the login page.
    Redirect(Redirect),
    /// Authenticated with too low a role. Rendered in place, never a redirect.
    AccessDenied {
        required: Role,
        actual: Role,
        back_to: String,
    },
    /// Render the protected subtree.
    Granted(Principal),
}

impl GuardOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, GuardOutcome::Granted(_))
    }
}

/// Decide what to render for a protected location.
pub fn evaluate(input: &GuardInput<'_>) -> GuardOutcome {
    let session = input.session;

    if session.is_loading() {
        return GuardOutcome::Loading;
    }

    let principal = match (session.is_authenticated(), session.user()) {
        (true, Some(principal)) => principal,
        _ if input.has_persisted_token => return GuardOutcome::RefreshingSession,
        _ => {
            return GuardOutcome::Redirect(Redirect {
                to: input.login_path.to_string(),
                from: input.location.to_string(),
                replace: true,
            })
        }
    };

    if principal.role.satisfies(input.required) {
        GuardOutcome::Granted(principal.clone())
    } else {
        GuardOutcome::AccessDenied {
            required: input.required,
            actual: principal.role,
            back_to: DEFAULT_BACK_PATH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: "7".into(),
            username: "umwanditsi".into(),
            email: "u@amakuru.rw".into(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            avatar_url: None,
        }
    }

    fn input<'a>(session: &'a SessionSnapshot, token: bool, required: Role) -> GuardInput<'a> {
        GuardInput {
            session,
            has_persisted_token: token,
            required,
            location: "/admin/articles?page=2",
            login_path: DEFAULT_LOGIN_PATH,
        }
    }

    #[test]
    fn restoring_renders_loading_even_with_token() {
        let s = SessionSnapshot::restoring();
        assert_eq!(evaluate(&input(&s, true, Role::User)), GuardOutcome::Loading);
        assert_eq!(evaluate(&input(&s, false, Role::User)), GuardOutcome::Loading);
    }

    #[test]
    fn unresolved_session_with_token_is_refreshing() {
        let s = SessionSnapshot::unknown();
        assert_eq!(
            evaluate(&input(&s, true, Role::Admin)),
            GuardOutcome::RefreshingSession
        );
    }

    #[test]
    fn anonymous_without_token_redirects_with_return_location() {
        let s = SessionSnapshot::anonymous(None);
        let outcome = evaluate(&input(&s, false, Role::User));
        assert_eq!(
            outcome,
            GuardOutcome::Redirect(Redirect {
                to: "/login".into(),
                from: "/admin/articles?page=2".into(),
                replace: true,
            })
        );
    }

    #[test]
    fn editor_is_denied_admin_area() {
        let s = SessionSnapshot::authenticated("t".into(), principal(Role::Editor));
        assert_matches!(
            evaluate(&input(&s, true, Role::Admin)),
            GuardOutcome::AccessDenied { required: Role::Admin, actual: Role::Editor, .. }
        );
    }

    #[test]
    fn grant_matrix_follows_rank() {
        for held in Role::ALL {
            let s = SessionSnapshot::authenticated("t".into(), principal(held));
            for required in Role::ALL {
                let granted = evaluate(&input(&s, true, required)).is_granted();
                assert_eq!(granted, held.rank() >= required.rank(), "{held} -> {required}");
            }
        }
    }
}
