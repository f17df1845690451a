use async_trait::async_trait;
use domain::value_objects::auth::AuthSession;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthProviderError {
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("email address not confirmed")]
    EmailNotConfirmed,
    #[error("user already registered")]
    UserAlreadyExists,
    #[error("password rejected by provider: {0}")]
    WeakPassword(String),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("invalid or expired auth code")]
    InvalidGrant,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignUpParams {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub email_redirect_to: String,
    pub code_challenge: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    /// Present when the project auto-confirms emails.
    pub session: Option<AuthSession>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, params: SignUpParams) -> Result<SignUpOutcome, AuthProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthProviderError>;

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthProviderError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), AuthProviderError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError>;
}
