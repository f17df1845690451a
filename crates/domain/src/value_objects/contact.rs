use serde::Deserialize;
use thiserror::Error;

use crate::value_objects::auth::validate_email;

pub const MAX_CONTACT_MESSAGE_CHARS: usize = 5_000;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ContactValidationError {
    #[error("Vul je naam in")]
    MissingName,
    #[error("Vul een geldig e-mailadres in")]
    InvalidEmail,
    #[error("Vul een bericht in")]
    MissingMessage,
    #[error("Je bericht mag maximaal 5000 tekens bevatten")]
    MessageTooLong,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactRequest {
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.name.trim().is_empty() {
            return Err(ContactValidationError::MissingName);
        }
        validate_email(&self.email).map_err(|_| ContactValidationError::InvalidEmail)?;
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ContactValidationError::MissingMessage);
        }
        if message.chars().count() > MAX_CONTACT_MESSAGE_CHARS {
            return Err(ContactValidationError::MessageTooLong);
        }
        Ok(())
    }
}
