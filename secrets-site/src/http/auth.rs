use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use tracing::{debug, warn};

use crate::session::{unix_now, SessionState, SessionToken};
use crate::users::User;

use super::error::AppError;
use super::state::{AppState, SessionSettings};

pub const SESSION_COOKIE: &str = "session";

/// Work out who is calling. Missing, unsigned, malformed or stale cookies and
/// ids that no longer resolve all come back as `Anonymous`.
pub async fn resolve_session(state: &AppState, jar: &SignedCookieJar) -> SessionState {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return SessionState::Anonymous;
    };

    let Some(token) = SessionToken::parse(cookie.value()) else {
        debug!("ignoring malformed session cookie");
        return SessionState::Anonymous;
    };

    if !state.session.policy.is_fresh(&token, unix_now()) {
        debug!(user_id = token.user_id, "ignoring expired session cookie");
        return SessionState::Anonymous;
    }

    match state.accounts.users().find_by_id(token.user_id).await {
        Ok(Some(user)) => SessionState::Authenticated(user),
        Ok(None) => {
            debug!(user_id = token.user_id, "session refers to a missing user");
            SessionState::Anonymous
        }
        Err(err) => {
            warn!(user_id = token.user_id, error = %err, "session lookup failed");
            SessionState::Anonymous
        }
    }
}

/// Access gate for protected routes.
pub async fn require_user(
    state: &AppState,
    jar: &SignedCookieJar,
    path: &str,
) -> Result<User, AppError> {
    match resolve_session(state, jar).await.into_user() {
        Some(user) => Ok(user),
        None => {
            debug!(path, "anonymous request to protected route");
            Err(AppError::Unauthenticated {
                next: String::from(path),
            })
        }
    }
}

/// Overwrites any existing session cookie.
pub fn start_session(state: &AppState, jar: SignedCookieJar, user: &User) -> SignedCookieJar {
    let token = SessionToken::issue(user.id);
    jar.add(session_cookie(&state.session, token.encode()))
}

pub fn end_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn session_cookie(settings: &SessionSettings, value: String) -> Cookie<'static> {
    let max_age = i64::try_from(settings.policy.ttl().as_secs()).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure_cookies)
        .max_age(cookie::time::Duration::seconds(max_age))
        .build()
}
