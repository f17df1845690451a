use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use domain::value_objects::auth::{
    AuthSession, AuthUserDto, AuthValidationError, LoginRequest, ResetPasswordRequest,
    SignUpRequest, SignUpResponse, normalize_email, validate_email,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::interfaces::auth_provider::{AuthProvider, AuthProviderError, SignUpParams};

const PKCE_VERIFIER_BYTES: usize = 32;
const CALLBACK_PATH: &str = "/api/auth/callback";
const RESET_PASSWORD_PAGE: &str = "/reset-password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] AuthValidationError),
    #[error("Onjuist e-mailadres of wachtwoord")]
    InvalidCredentials,
    #[error("Bevestig eerst je e-mailadres via de link in je inbox")]
    EmailNotConfirmed,
    #[error("Er bestaat al een account met dit e-mailadres")]
    UserAlreadyExists,
    #[error("Kies een sterker wachtwoord")]
    WeakPassword,
    #[error("Te veel pogingen, probeer het over een paar minuten opnieuw")]
    RateLimited,
    #[error("De bevestigingslink is ongeldig of verlopen")]
    InvalidCallback,
    #[error("auth provider request failed")]
    Provider(#[source] anyhow::Error),
}

impl From<AuthProviderError> for AuthError {
    fn from(value: AuthProviderError) -> Self {
        match value {
            AuthProviderError::InvalidCredentials => AuthError::InvalidCredentials,
            AuthProviderError::EmailNotConfirmed => AuthError::EmailNotConfirmed,
            AuthProviderError::UserAlreadyExists => AuthError::UserAlreadyExists,
            AuthProviderError::WeakPassword(_) => AuthError::WeakPassword,
            AuthProviderError::RateLimited => AuthError::RateLimited,
            AuthProviderError::InvalidGrant => AuthError::InvalidCallback,
            AuthProviderError::Other(err) => AuthError::Provider(err),
        }
    }
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// PKCE pair for an email link flow. The verifier stays with the browser in a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let mut bytes = [0u8; PKCE_VERIFIER_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        let challenge = code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 challenge: unpadded base64url of the SHA-256 of the verifier.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub app_url: String,
}

#[derive(Debug, Clone)]
pub struct SignUpStarted {
    pub response: SignUpResponse,
    pub session: Option<AuthSession>,
    pub code_verifier: String,
}

pub struct AuthUseCase {
    auth_provider: Arc<dyn AuthProvider>,
    config: AuthConfig,
}

impl AuthUseCase {
    pub fn new(auth_provider: Arc<dyn AuthProvider>, config: AuthConfig) -> Self {
        Self {
            auth_provider,
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.app_url.trim_end_matches('/'), path)
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> AuthResult<SignUpStarted> {
        request.validate()?;
        let email = normalize_email(&request.email);
        let pkce = PkcePair::generate();

        let outcome = self
            .auth_provider
            .sign_up(SignUpParams {
                email: email.clone(),
                password: request.password,
                full_name: request.full_name.trim().to_string(),
                email_redirect_to: self.url(CALLBACK_PATH),
                code_challenge: pkce.challenge,
            })
            .await
            .map_err(|err| {
                warn!(%email, error = %err, "auth: sign up rejected");
                AuthError::from(err)
            })?;

        info!(
            user_id = ?outcome.user_id,
            confirmed = outcome.session.is_some(),
            "auth: user signed up"
        );

        Ok(SignUpStarted {
            response: SignUpResponse {
                user: outcome.user_id.map(|user_id| AuthUserDto {
                    user_id,
                    email: outcome.email.clone().or(Some(email)),
                }),
                email_confirmation_required: outcome.session.is_none(),
            },
            session: outcome.session,
            code_verifier: pkce.verifier,
        })
    }

    pub async fn login(&self, request: LoginRequest) -> AuthResult<AuthSession> {
        request.validate()?;
        let email = normalize_email(&request.email);

        let session = self
            .auth_provider
            .sign_in_with_password(&email, &request.password)
            .await
            .map_err(|err| {
                warn!(error = %err, "auth: login failed");
                AuthError::from(err)
            })?;

        info!(user_id = %session.user_id, "auth: user logged in");
        Ok(session)
    }

    /// Completes an email link by trading `auth_code` and the stored verifier for a session.
    pub async fn exchange_code(
        &self,
        auth_code: Option<&str>,
        code_verifier: Option<&str>,
    ) -> AuthResult<AuthSession> {
        let auth_code = auth_code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::InvalidCallback)?;
        let code_verifier = code_verifier.filter(|v| !v.is_empty()).ok_or_else(|| {
            warn!("auth: callback without pkce verifier cookie");
            AuthError::InvalidCallback
        })?;

        let session = self
            .auth_provider
            .exchange_code_for_session(auth_code, code_verifier)
            .await
            .map_err(|err| {
                warn!(error = %err, "auth: code exchange failed");
                AuthError::from(err)
            })?;

        info!(user_id = %session.user_id, "auth: email link completed");
        Ok(session)
    }

    /// Sends a reset link when the account exists. Provider failures are only logged so
    /// the response never reveals whether the address is registered. Returns the PKCE
    /// verifier for the callback.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> AuthResult<String> {
        validate_email(&request.email)?;
        let email = normalize_email(&request.email);
        let pkce = PkcePair::generate();
        let redirect_to = format!("{}?next={}", self.url(CALLBACK_PATH), RESET_PASSWORD_PAGE);

        match self
            .auth_provider
            .reset_password_for_email(&email, &redirect_to, &pkce.challenge)
            .await
        {
            Ok(()) => info!("auth: password reset requested"),
            Err(AuthProviderError::Other(err)) => {
                error!(error = ?err, "auth: password reset request failed")
            }
            Err(err) => warn!(error = %err, "auth: password reset rejected"),
        }

        Ok(pkce.verifier)
    }

    pub async fn logout(&self, access_token: Option<&str>) {
        let Some(token) = access_token.filter(|t| !t.is_empty()) else {
            return;
        };
        if let Err(err) = self.auth_provider.sign_out(token).await {
            warn!(error = %err, "auth: provider logout failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::auth_provider::{MockAuthProvider, SignUpOutcome};
    use uuid::Uuid;

    fn usecase(provider: MockAuthProvider) -> AuthUseCase {
        AuthUseCase::new(
            Arc::new(provider),
            AuthConfig {
                app_url: "https://app.example.nl/".to_string(),
            },
        )
    }

    fn session() -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 3_600,
            user_id: Uuid::new_v4(),
            email: Some("jan@voorbeeld.nl".to_string()),
        }
    }

    #[test]
    fn challenge_matches_rfc_7636_example() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn generated_pairs_are_unique_and_consistent() {
        let first = PkcePair::generate();
        let second = PkcePair::generate();
        assert_ne!(first.verifier, second.verifier);
        assert_eq!(first.verifier.len(), 43);
        assert_eq!(code_challenge(&first.verifier), first.challenge);
    }

    #[tokio::test]
    async fn sign_up_sends_a_challenge_for_the_returned_verifier() {
        let captured = Arc::new(std::sync::Mutex::new(None));
        let sink = captured.clone();

        let mut provider = MockAuthProvider::new();
        provider
            .expect_sign_up()
            .withf(|params| {
                params.email == "jan@voorbeeld.nl"
                    && params.full_name == "Jan Jansen"
                    && params.email_redirect_to == "https://app.example.nl/api/auth/callback"
            })
            .times(1)
            .returning(move |params| {
                *sink.lock().unwrap() = Some(params.code_challenge);
                Ok(SignUpOutcome {
                    user_id: Some(Uuid::new_v4()),
                    email: Some(params.email),
                    session: None,
                })
            });

        let started = usecase(provider)
            .sign_up(SignUpRequest {
                email: " Jan@Voorbeeld.nl ".to_string(),
                password: "lang-genoeg".to_string(),
                full_name: " Jan Jansen ".to_string(),
            })
            .await
            .unwrap();

        assert!(started.response.email_confirmation_required);
        assert_eq!(
            captured.lock().unwrap().clone(),
            Some(code_challenge(&started.code_verifier))
        );
    }

    #[tokio::test]
    async fn invalid_sign_up_never_reaches_the_provider() {
        let mut provider = MockAuthProvider::new();
        provider.expect_sign_up().never();

        let err = usecase(provider)
            .sign_up(SignUpRequest {
                email: "jan@voorbeeld.nl".to_string(),
                password: "kort".to_string(),
                full_name: "Jan".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation(AuthValidationError::PasswordTooShort)
        ));
    }

    #[tokio::test]
    async fn wrong_password_maps_to_invalid_credentials() {
        let mut provider = MockAuthProvider::new();
        provider
            .expect_sign_in_with_password()
            .returning(|_, _| Err(AuthProviderError::InvalidCredentials));

        let err = usecase(provider)
            .login(LoginRequest {
                email: "jan@voorbeeld.nl".to_string(),
                password: "fout".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "Onjuist e-mailadres of wachtwoord");
    }

    #[tokio::test]
    async fn login_returns_the_provider_session() {
        let expected = session();
        let returned = expected.clone();
        let mut provider = MockAuthProvider::new();
        provider
            .expect_sign_in_with_password()
            .withf(|email, password| email == "jan@voorbeeld.nl" && password == "geheim123")
            .returning(move |_, _| Ok(returned.clone()));

        let session = usecase(provider)
            .login(LoginRequest {
                email: "JAN@voorbeeld.nl".to_string(),
                password: "geheim123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session, expected);
    }

    #[tokio::test]
    async fn callback_without_verifier_is_rejected() {
        let mut provider = MockAuthProvider::new();
        provider.expect_exchange_code_for_session().never();

        let err = usecase(provider)
            .exchange_code(Some("code-123"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCallback));
    }

    #[tokio::test]
    async fn callback_exchanges_code_with_verifier() {
        let mut provider = MockAuthProvider::new();
        provider
            .expect_exchange_code_for_session()
            .withf(|code, verifier| code == "code-123" && verifier == "verifier-abc")
            .times(1)
            .returning(|_, _| Ok(session()));

        assert!(
            usecase(provider)
                .exchange_code(Some("code-123"), Some("verifier-abc"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn reset_password_hides_provider_failures() {
        let mut provider = MockAuthProvider::new();
        provider
            .expect_reset_password_for_email()
            .withf(|email, redirect, _| {
                email == "onbekend@voorbeeld.nl"
                    && redirect == "https://app.example.nl/api/auth/callback?next=/reset-password"
            })
            .returning(|_, _, _| Err(AuthProviderError::Other(anyhow::anyhow!("user not found"))));

        let verifier = usecase(provider)
            .reset_password(ResetPasswordRequest {
                email: "onbekend@voorbeeld.nl".to_string(),
            })
            .await
            .unwrap();
        assert!(!verifier.is_empty());
    }
}
