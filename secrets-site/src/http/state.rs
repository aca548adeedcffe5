use std::path::PathBuf;

use axum::extract::FromRef;
use cookie::{Key, KeyError};
use sha2::{Digest, Sha512};

use crate::accounts::Accounts;
use crate::config::SecretKey;
use crate::session::SessionPolicy;

/// Lifetime and `Secure` flag for the session cookie.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub policy: SessionPolicy,
    pub secure_cookies: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: Accounts,
    pub cookie_key: Key,
    pub session: SessionSettings,
    pub static_dir: PathBuf,
    pub download_file: PathBuf,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Stretch an arbitrary-length secret into the 64 bytes the signing key needs.
pub fn derive_cookie_key(secret: &SecretKey) -> Result<Key, KeyError> {
    let digest = Sha512::digest(secret.expose().as_bytes());
    Key::try_from(digest.as_slice())
}
