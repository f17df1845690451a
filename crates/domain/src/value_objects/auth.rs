use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_NAME_CHARS: usize = 100;
pub const DEFAULT_REDIRECT_PATH: &str = "/chat";

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthValidationError {
    #[error("Vul een geldig e-mailadres in")]
    InvalidEmail,
    #[error("Het wachtwoord moet minimaal 8 tekens bevatten")]
    PasswordTooShort,
    #[error("Vul je naam in")]
    MissingName,
    #[error("Je naam mag maximaal 100 tekens bevatten")]
    NameTooLong,
    #[error("Vul je wachtwoord in")]
    MissingPassword,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<(), AuthValidationError> {
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthValidationError::PasswordTooShort);
        }
        let name = self.full_name.trim();
        if name.is_empty() {
            return Err(AuthValidationError::MissingName);
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(AuthValidationError::NameTooLong);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AuthValidationError> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AuthValidationError::MissingPassword);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
    pub error_description: Option<String>,
}

/// Session issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthUserDto {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SignUpResponse {
    pub user: Option<AuthUserDto>,
    pub email_confirmation_required: bool,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), AuthValidationError> {
    let email = email.trim();
    if email.is_empty() || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(AuthValidationError::InvalidEmail);
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or(AuthValidationError::InvalidEmail)?;
    if local.is_empty() || domain.contains('@') {
        return Err(AuthValidationError::InvalidEmail);
    }

    let valid_domain = domain
        .split_once('.')
        .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty() && !tail.ends_with('.'));
    if !valid_domain {
        return Err(AuthValidationError::InvalidEmail);
    }

    Ok(())
}

/// Only same-site relative paths are honored as post-login targets.
pub fn safe_redirect_path(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => DEFAULT_REDIRECT_PATH.to_string(),
    }
}
