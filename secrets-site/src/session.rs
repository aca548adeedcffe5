//! Session tokens and the anonymous/authenticated state machine.
//!
//! Nothing is stored server-side. The client holds a signed cookie whose value
//! is a [`SessionToken`] (`"{user_id}:{issued_at}"`); every request parses it,
//! checks it against the [`SessionPolicy`] and then looks the user up again.
//! Anything that fails along the way resolves to [`SessionState::Anonymous`].

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::users::{User, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken {
    pub user_id: UserId,
    pub issued_at: u64,
}

impl SessionToken {
    pub fn new(user_id: UserId, issued_at: u64) -> Self {
        Self { user_id, issued_at }
    }

    pub fn issue(user_id: UserId) -> Self {
        Self::new(user_id, unix_now())
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (user_id, issued_at) = raw.split_once(':')?;
        let user_id = user_id.parse::<UserId>().ok()?;
        let issued_at = issued_at.parse::<u64>().ok()?;
        if user_id <= 0 {
            return None;
        }
        Some(Self { user_id, issued_at })
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.issued_at)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    ttl: Duration,
}

impl SessionPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A token is fresh if it was issued no later than `now` and less than
    /// `ttl` ago.
    pub fn is_fresh(&self, token: &SessionToken, now: u64) -> bool {
        if token.issued_at > now {
            return false;
        }
        now - token.issued_at < self.ttl.as_secs()
    }
}

/// Per-request principal. At most one user is ever attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(User),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn into_user(self) -> Option<User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            SessionState::Anonymous => None,
        }
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
