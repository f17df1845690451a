use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use application::interfaces::auth_provider::{
    AuthProvider, AuthProviderError, SignUpOutcome, SignUpParams,
};
use domain::value_objects::auth::AuthSession;

const CODE_CHALLENGE_METHOD: &str = "s256";

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: Uuid,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: GoTrueUser,
}

impl From<GoTrueSession> for AuthSession {
    fn from(value: GoTrueSession) -> Self {
        Self {
            access_token: value.access_token,
            refresh_token: value.refresh_token,
            expires_in: value.expires_in,
            user_id: value.user.id,
            email: value.user.email,
        }
    }
}

/// Signup answers with a session when email confirmation is off, else with the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session(GoTrueSession),
    User(GoTrueUser),
}

#[derive(Debug, Default, Deserialize)]
struct GoTrueErrorBody {
    error_code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
}

impl GoTrueErrorBody {
    fn message(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }
}

fn classify_error(status: StatusCode, body: &GoTrueErrorBody) -> AuthProviderError {
    let code = body
        .error_code
        .as_deref()
        .or(body.error.as_deref())
        .unwrap_or_default();
    let message = body.message();
    let lowered = message.to_lowercase();

    match code {
        "invalid_credentials" => AuthProviderError::InvalidCredentials,
        "email_not_confirmed" => AuthProviderError::EmailNotConfirmed,
        "user_already_exists" | "email_exists" => AuthProviderError::UserAlreadyExists,
        "weak_password" => AuthProviderError::WeakPassword(message),
        "over_request_rate_limit" | "over_email_send_rate_limit" => AuthProviderError::RateLimited,
        "flow_state_not_found" | "flow_state_expired" | "bad_code_verifier" | "otp_expired" => {
            AuthProviderError::InvalidGrant
        }
        // Older GoTrue releases only send `error: invalid_grant` with a description.
        "invalid_grant" if lowered.contains("invalid login credentials") => {
            AuthProviderError::InvalidCredentials
        }
        "invalid_grant" if lowered.contains("email not confirmed") => {
            AuthProviderError::EmailNotConfirmed
        }
        "invalid_grant" => AuthProviderError::InvalidGrant,
        _ if status == StatusCode::TOO_MANY_REQUESTS => AuthProviderError::RateLimited,
        _ if lowered.contains("already registered") => AuthProviderError::UserAlreadyExists,
        _ => AuthProviderError::Other(anyhow!(
            "supabase auth request failed (status {status}): {message}"
        )),
    }
}

/// Supabase Auth (GoTrue) over its REST API, authenticated with the project's anon key.
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuthClient {
    pub fn new(supabase_url: &str, anon_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key,
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, AuthProviderError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<GoTrueErrorBody>(&body).unwrap_or_default();
        let classified = classify_error(status, &parsed);

        match &classified {
            AuthProviderError::Other(_) => error!(
                %status,
                error_code = ?parsed.error_code,
                response_body = %body,
                %context,
                "supabase auth request failed"
            ),
            other => warn!(%status, reason = %other, %context, "supabase auth request rejected"),
        }

        Err(classified)
    }
}

fn transport(err: reqwest::Error) -> AuthProviderError {
    AuthProviderError::Other(anyhow::Error::new(err).context("supabase auth transport error"))
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    async fn sign_up(&self, params: SignUpParams) -> Result<SignUpOutcome, AuthProviderError> {
        let body = serde_json::json!({
            "email": params.email,
            "password": params.password,
            "data": { "full_name": params.full_name },
            "code_challenge": params.code_challenge,
            "code_challenge_method": CODE_CHALLENGE_METHOD,
        });

        let resp = self
            .request("/signup")
            .query(&[("redirect_to", params.email_redirect_to.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let resp = Self::ensure_success(resp, "sign up").await?;

        let outcome = match resp.json::<SignUpBody>().await.map_err(transport)? {
            SignUpBody::Session(session) => SignUpOutcome {
                user_id: Some(session.user.id),
                email: session.user.email.clone(),
                session: Some(session.into()),
            },
            SignUpBody::User(user) => SignUpOutcome {
                user_id: Some(user.id),
                email: user.email,
                session: None,
            },
        };
        Ok(outcome)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthProviderError> {
        let resp = self
            .request("/token")
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        let resp = Self::ensure_success(resp, "password sign in").await?;

        Ok(resp.json::<GoTrueSession>().await.map_err(transport)?.into())
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthProviderError> {
        let resp = self
            .request("/token")
            .query(&[("grant_type", "pkce")])
            .json(&serde_json::json!({ "auth_code": auth_code, "code_verifier": code_verifier }))
            .send()
            .await
            .map_err(transport)?;
        let resp = Self::ensure_success(resp, "pkce exchange").await?;

        Ok(resp.json::<GoTrueSession>().await.map_err(transport)?.into())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), AuthProviderError> {
        let resp = self
            .request("/recover")
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({
                "email": email,
                "code_challenge": code_challenge,
                "code_challenge_method": CODE_CHALLENGE_METHOD,
            }))
            .send()
            .await
            .map_err(transport)?;
        Self::ensure_success(resp, "password recovery").await?;

        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError> {
        let resp = self
            .request("/logout")
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(transport)?;
        Self::ensure_success(resp, "sign out").await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(raw: &str) -> GoTrueErrorBody {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn current_error_codes_are_classified() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            &body(r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#),
        );
        assert!(matches!(err, AuthProviderError::InvalidCredentials));

        let err = classify_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            &body(r#"{"code":422,"error_code":"weak_password","msg":"Password should contain a digit"}"#),
        );
        assert!(matches!(err, AuthProviderError::WeakPassword(ref msg) if msg.contains("digit")));
    }

    #[test]
    fn legacy_invalid_grant_descriptions_are_understood() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            &body(r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#),
        );
        assert!(matches!(err, AuthProviderError::EmailNotConfirmed));

        let err = classify_error(
            StatusCode::BAD_REQUEST,
            &body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
        );
        assert!(matches!(err, AuthProviderError::InvalidCredentials));
    }

    #[test]
    fn status_429_without_code_is_rate_limited() {
        let err = classify_error(StatusCode::TOO_MANY_REQUESTS, &GoTrueErrorBody::default());
        assert!(matches!(err, AuthProviderError::RateLimited));
    }

    #[test]
    fn unknown_failures_are_kept_as_other() {
        let err = classify_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &body(r#"{"msg":"database error saving new user"}"#),
        );
        assert!(matches!(err, AuthProviderError::Other(_)));
    }

    #[test]
    fn signup_response_without_session_is_a_bare_user() {
        let raw = r#"{"id":"7f0c1d2e-3b4a-4c5d-8e9f-0a1b2c3d4e5f","email":"jan@voorbeeld.nl","aud":"authenticated"}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpBody>(raw).unwrap(),
            SignUpBody::User(_)
        ));

        let raw = r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"token_type":"bearer",
                      "user":{"id":"7f0c1d2e-3b4a-4c5d-8e9f-0a1b2c3d4e5f","email":"jan@voorbeeld.nl"}}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpBody>(raw).unwrap(),
            SignUpBody::Session(_)
        ));
    }
}
