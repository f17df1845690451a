use std::sync::OnceLock;

use application::usecases::{
    auth::AuthError, chat::ChatError, checkout::CheckoutError, contact::ContactError,
    discounts::DiscountError, subscriptions::SubscriptionError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub const GENERIC_ERROR_MESSAGE: &str = "Er is iets misgegaan. Probeer het later opnieuw.";

static EXPOSE_INTERNAL_DETAILS: OnceLock<bool> = OnceLock::new();

/// Appends internal error detail to 500 responses. Set once at startup for the local stage.
pub fn expose_internal_details(enabled: bool) {
    let _ = EXPOSE_INTERNAL_DETAILS.set(enabled);
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn unauthorized() -> Self {
        AppError::Unauthorized("Je bent niet ingelogd".to_string())
    }

    pub fn bad_request(err: impl ToString) -> Self {
        AppError::BadRequest(err.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Internal(err) => {
                error!(error = ?err, "http: request failed");
                if EXPOSE_INTERNAL_DETAILS.get().copied().unwrap_or(false) {
                    format!("{} ({:#})", GENERIC_ERROR_MESSAGE, err)
                } else {
                    GENERIC_ERROR_MESSAGE.to_string()
                }
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            error: message,
        });

        (status, body).into_response()
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidSelection(_)
            | CheckoutError::InvalidDiscount(_)
            | CheckoutError::ZeroAmount
            | CheckoutError::MissingEmail => AppError::bad_request(err),
            CheckoutError::PaymentNotFound => AppError::NotFound(err.to_string()),
            CheckoutError::Provider(inner) | CheckoutError::Internal(inner) => {
                AppError::Internal(inner)
            }
        }
    }
}

impl From<DiscountError> for AppError {
    fn from(err: DiscountError) -> Self {
        match err {
            DiscountError::InvalidSelection(_) => AppError::bad_request(err),
        }
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::NotFound => AppError::NotFound(err.to_string()),
            SubscriptionError::NotRecurring | SubscriptionError::AlreadyCanceled => {
                AppError::bad_request(err)
            }
            SubscriptionError::Provider(inner) | SubscriptionError::Internal(inner) => {
                AppError::Internal(inner)
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(_)
            | AuthError::UserAlreadyExists
            | AuthError::WeakPassword
            | AuthError::InvalidCallback => AppError::bad_request(err),
            AuthError::InvalidCredentials | AuthError::EmailNotConfirmed => {
                AppError::Unauthorized(err.to_string())
            }
            AuthError::RateLimited => AppError::TooManyRequests(err.to_string()),
            AuthError::Provider(inner) => AppError::Internal(inner),
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(_) | ChatError::PromptTooLarge => AppError::bad_request(err),
            ChatError::NoActiveSubscription => AppError::Forbidden(err.to_string()),
            ChatError::Model(inner) | ChatError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

impl From<ContactError> for AppError {
    fn from(err: ContactError) -> Self {
        match err {
            ContactError::Validation(_) => AppError::bad_request(err),
            ContactError::Delivery(inner) => AppError::Internal(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::value_objects::{
        auth::AuthValidationError, discounts::DiscountRejection,
    };

    #[test]
    fn validation_errors_keep_their_dutch_message() {
        let err = AppError::from(CheckoutError::InvalidDiscount(DiscountRejection::NotFound));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Deze kortingscode bestaat niet");

        let err = AppError::from(AuthError::Validation(AuthValidationError::PasswordTooShort));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Het wachtwoord moet minimaal 8 tekens bevatten");
    }

    #[test]
    fn use_case_errors_map_to_their_status() {
        let cases = [
            (AppError::from(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (AppError::from(AuthError::RateLimited), StatusCode::TOO_MANY_REQUESTS),
            (AppError::from(ChatError::NoActiveSubscription), StatusCode::FORBIDDEN),
            (AppError::from(ChatError::PromptTooLarge), StatusCode::BAD_REQUEST),
            (AppError::from(CheckoutError::PaymentNotFound), StatusCode::NOT_FOUND),
            (AppError::from(CheckoutError::ZeroAmount), StatusCode::BAD_REQUEST),
            (AppError::from(SubscriptionError::NotRecurring), StatusCode::BAD_REQUEST),
            (AppError::from(SubscriptionError::NotFound), StatusCode::NOT_FOUND),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err:?}");
        }
    }

    #[test]
    fn provider_failures_become_internal_errors() {
        let err = AppError::from(CheckoutError::Provider(anyhow::anyhow!("mollie 502")));
        assert!(matches!(err, AppError::Internal(_)));

        let err = AppError::from(ContactError::Delivery(anyhow::anyhow!("resend 401")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_response_hides_the_cause_by_default() {
        let response = AppError::Internal(anyhow::anyhow!("db password wrong")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
