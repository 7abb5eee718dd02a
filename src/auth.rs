use crate::error::AuthError;
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: String,
    pub email: Option<String>,
}

impl UserSession {
    pub fn new(user_id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email,
        }
    }
}

/// External identity provider (sign-up, sign-in, sign-out, current user).
///
/// The current user is published on a `watch` channel so the favorites
/// engine can follow sign-in and sign-out transitions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserSession, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Receiver that always holds the current session (`None` when signed out)
    fn subscribe(&self) -> watch::Receiver<Option<UserSession>>;

    fn current_user(&self) -> Option<UserSession> {
        let rx = self.subscribe();
        let user = rx.borrow().clone();
        user
    }
}

struct Account {
    user_id: String,
    password: String,
}

/// Identity provider that keeps accounts in memory.
///
/// Used for previews, tests, and the offline command-line front end.
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    session: watch::Sender<Option<UserSession>>,
    next_id: AtomicU64,
}

const MIN_PASSWORD_LEN: usize = 6;

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            session,
            next_id: AtomicU64::new(1),
        }
    }

    /// Provider that starts signed in as the preview user
    pub fn preview() -> Self {
        let provider = Self::new();
        provider.session.send_replace(Some(UserSession::new(
            "preview-user-id",
            Some("preview@example.com".to_string()),
        )));
        provider
    }

    fn validate(email: &str, password: &str) -> Result<(), AuthError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Provider(
                "The email address is badly formatted.".to_string(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Provider(
                "The password must be 6 characters long or more.".to_string(),
            ));
        }
        Ok(())
    }

    fn publish(&self, session: Option<UserSession>) {
        self.session.send_replace(session);
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        Self::validate(email, password)?;
        let email = email.trim().to_lowercase();

        let session = {
            let mut accounts = self
                .accounts
                .lock()
                .map_err(|_| AuthError::Provider("Account store is unavailable.".to_string()))?;
            if accounts.contains_key(&email) {
                warn!("Sign up error: account already exists");
                return Err(AuthError::Provider(
                    "The email address is already in use by another account.".to_string(),
                ));
            }
            let user_id = format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            accounts.insert(
                email.clone(),
                Account {
                    user_id: user_id.clone(),
                    password: password.to_string(),
                },
            );
            UserSession::new(user_id, Some(email))
        };

        debug!("Signed up {}", session.user_id);
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let email = email.trim().to_lowercase();
        let session = {
            let accounts = self
                .accounts
                .lock()
                .map_err(|_| AuthError::Provider("Account store is unavailable.".to_string()))?;
            match accounts.get(&email) {
                Some(account) if account.password == password => {
                    UserSession::new(account.user_id.clone(), Some(email.clone()))
                }
                Some(_) => {
                    return Err(AuthError::Provider(
                        "The password is invalid or the user does not have a password."
                            .to_string(),
                    ))
                }
                None => {
                    return Err(AuthError::Provider(
                        "There is no user record corresponding to this identifier.".to_string(),
                    ))
                }
            }
        };

        debug!("Signed in {}", session.user_id);
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<UserSession>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let provider = InMemoryIdentityProvider::new();
        assert!(provider.current_user().is_none());

        let created = provider.sign_up("Cook@Example.com", "secret1").await.unwrap();
        assert_eq!(created.email.as_deref(), Some("cook@example.com"));
        assert_eq!(provider.current_user(), Some(created.clone()));

        provider.sign_out().await.unwrap();
        assert!(provider.current_user().is_none());

        let again = provider.sign_in("cook@example.com", "secret1").await.unwrap();
        assert_eq!(again.user_id, created.user_id);
    }

    #[tokio::test]
    async fn test_errors_carry_provider_messages() {
        let provider = InMemoryIdentityProvider::new();

        let err = provider.sign_up("not-an-email", "secret1").await.unwrap_err();
        assert_eq!(err.to_string(), "The email address is badly formatted.");

        let err = provider.sign_up("a@b.c", "123").await.unwrap_err();
        assert_eq!(err.to_string(), "The password must be 6 characters long or more.");

        provider.sign_up("a@b.c", "secret1").await.unwrap();
        let err = provider.sign_up("a@b.c", "secret2").await.unwrap_err();
        assert!(err.to_string().contains("already in use"));

        let err = provider.sign_in("a@b.c", "wrong-pass").await.unwrap_err();
        assert!(err.to_string().contains("password is invalid"));
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let provider = InMemoryIdentityProvider::new();
        let mut rx = provider.subscribe();

        provider.sign_up("a@b.c", "secret1").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        provider.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn test_preview_provider_is_signed_in() {
        let provider = InMemoryIdentityProvider::preview();
        let user = provider.current_user().unwrap();
        assert_eq!(user.user_id, "preview-user-id");
        assert_eq!(user.email.as_deref(), Some("preview@example.com"));
    }
}
