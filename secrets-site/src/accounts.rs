//! Registration and login flows over the user store and credential hashing.
//!
//! Hashing and verification are CPU-bound and run on the blocking pool.

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::credentials::{hash_password, verify_password, CredentialError};
use crate::users::{NewUser, StoreError, User, UserStore};

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("no account for that email")]
    UnknownAccount,
    #[error("password does not match")]
    BadCredentials,
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("password task failed: {0}")]
    Task(#[from] JoinError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AccountError::DuplicateEmail,
            other => AccountError::Store(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Accounts {
    users: UserStore,
}

impl Accounts {
    pub fn new(users: UserStore) -> Self {
        Self { users }
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    /// Create a new account. Does not log the caller in.
    pub async fn register(&self, registration: Registration) -> Result<User, AccountError> {
        let Registration {
            name,
            email,
            password,
        } = registration;

        // Fast path only; the unique constraint decides races.
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "registration rejected: email already present");
            return Err(AccountError::DuplicateEmail);
        }

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        let user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                name,
            })
            .await
            .inspect_err(|err| {
                if matches!(err, StoreError::DuplicateEmail) {
                    warn!("registration lost a race for the same email");
                }
            })?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!(email = %email, "login failed: unknown account");
            return Err(AccountError::UnknownAccount);
        };

        let digest = user.password_hash.clone();
        let password = password.to_owned();
        let matches =
            tokio::task::spawn_blocking(move || verify_password(&password, &digest)).await?;

        if !matches {
            warn!(user_id = user.id, "login failed: bad credentials");
            return Err(AccountError::BadCredentials);
        }

        info!(user_id = user.id, "login succeeded");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;
    use tempfile::{tempdir, TempDir};

    use super::{AccountError, Accounts, Registration};
    use crate::users::UserStore;

    async fn accounts() -> Result<(TempDir, Accounts)> {
        let dir = tempdir()?;
        let store = UserStore::open(&dir.path().join("users.db")).await?;
        Ok((dir, Accounts::new(store)))
    }

    fn registration(email: &str, password: &str, name: &str) -> Registration {
        Registration {
            name: String::from(name),
            email: String::from(email),
            password: String::from(password),
        }
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() -> Result<()> {
        let (_dir, accounts) = accounts().await?;

        let user = accounts
            .register(registration("a@x.com", "pw1", "Alice"))
            .await?;

        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.name, "Alice");
        assert_ne!(user.password_hash, "pw1");
        assert!(user.password_hash.starts_with("$argon2id$"));
        Ok(())
    }

    #[tokio::test]
    async fn second_registration_for_email_conflicts() -> Result<()> {
        let (_dir, accounts) = accounts().await?;

        accounts
            .register(registration("a@x.com", "pw1", "Alice"))
            .await?;
        let second = accounts
            .register(registration("a@x.com", "pw2", "Bob"))
            .await;

        assert!(matches!(second, Err(AccountError::DuplicateEmail)));
        assert_eq!(accounts.users().count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn authenticate_distinguishes_unknown_and_bad_password() -> Result<()> {
        let (_dir, accounts) = accounts().await?;
        let alice = accounts
            .register(registration("a@x.com", "pw1", "Alice"))
            .await?;

        let unknown = accounts.authenticate("b@x.com", "pw1").await;
        assert!(matches!(unknown, Err(AccountError::UnknownAccount)));

        let wrong = accounts.authenticate("a@x.com", "wrong").await;
        assert!(matches!(wrong, Err(AccountError::BadCredentials)));

        let ok = accounts.authenticate("a@x.com", "pw1").await?;
        assert_eq!(ok.id, alice.id);
        Ok(())
    }

    #[tokio::test]
    async fn email_lookup_is_exact() -> Result<()> {
        let (_dir, accounts) = accounts().await?;
        accounts
            .register(registration("a@x.com", "pw1", "Alice"))
            .await?;

        let result = accounts.authenticate("A@X.COM", "pw1").await;
        assert!(matches!(result, Err(AccountError::UnknownAccount)));
        Ok(())
    }
}
