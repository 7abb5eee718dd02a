use crate::auth::{IdentityProvider, UserSession};
use crate::error::AuthError;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::watch;

/// Sign-in state for the views, backed by an [`IdentityProvider`]
pub struct AuthViewModel {
    provider: Arc<dyn IdentityProvider>,
    error: watch::Sender<Option<String>>,
}

impl AuthViewModel {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (error, _) = watch::channel(None);
        Self { provider, error }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let result = self.provider.sign_up(email, password).await;
        self.record("Sign up", result)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let result = self.provider.sign_in(email, password).await;
        self.record("Sign in", result)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await.inspect_err(|e| {
            warn!("Sign out error: {}", e);
            self.error.send_replace(Some(e.to_string()));
        })
    }

    fn record(
        &self,
        action: &str,
        result: Result<UserSession, AuthError>,
    ) -> Result<UserSession, AuthError> {
        match &result {
            Ok(session) => {
                info!("{} succeeded for {}", action, session.user_id);
                self.error.send_replace(None);
            }
            Err(e) => {
                warn!("{} error: {}", action, e);
                self.error.send_replace(Some(e.to_string()));
            }
        }
        result
    }

    pub fn current_user(&self) -> Option<UserSession> {
        self.provider.current_user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn user_email(&self) -> Option<String> {
        self.current_user().and_then(|user| user.email)
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn subscribe_user(&self) -> watch::Receiver<Option<UserSession>> {
        self.provider.subscribe()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }
}
