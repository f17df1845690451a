use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, header::AUTHORIZATION},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite, time::Duration};
use serde_json::json;
use tracing::warn;

use crate::{
    auth::{ACCESS_TOKEN_COOKIE, PKCE_VERIFIER_COOKIE, REFRESH_TOKEN_COOKIE},
    axum_http::error_responses::AppError,
    config::stage::Stage,
};
use application::usecases::auth::AuthUseCase;
use domain::value_objects::auth::{
    AuthCallbackQuery, AuthSession, AuthUserDto, LoginRequest, ResetPasswordRequest,
    SignUpRequest, SignUpResponse, safe_redirect_path,
};

const REFRESH_TOKEN_MAX_AGE_DAYS: i64 = 30;
const PKCE_VERIFIER_MAX_AGE_MINUTES: i64 = 60;

pub struct AuthState {
    pub auth_usecase: AuthUseCase,
    pub stage: Stage,
}

pub fn routes(auth_usecase: AuthUseCase, stage: Stage) -> Router {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/login", post(login))
        .route("/callback", get(callback))
        .route("/reset-password", post(reset_password))
        .route("/logout", post(logout))
        .with_state(Arc::new(AuthState {
            auth_usecase,
            stage,
        }))
}

fn cookie(name: &'static str, value: String, max_age: Duration, stage: Stage) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(!stage.is_local())
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

fn with_session(jar: CookieJar, session: &AuthSession, stage: Stage) -> CookieJar {
    jar.add(cookie(
        ACCESS_TOKEN_COOKIE,
        session.access_token.clone(),
        Duration::seconds(session.expires_in.max(0)),
        stage,
    ))
    .add(cookie(
        REFRESH_TOKEN_COOKIE,
        session.refresh_token.clone(),
        Duration::days(REFRESH_TOKEN_MAX_AGE_DAYS),
        stage,
    ))
}

fn with_verifier(jar: CookieJar, verifier: String, stage: Stage) -> CookieJar {
    jar.add(cookie(
        PKCE_VERIFIER_COOKIE,
        verifier,
        Duration::minutes(PKCE_VERIFIER_MAX_AGE_MINUTES),
        stage,
    ))
}

pub async fn sign_up(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(request): Json<SignUpRequest>,
) -> Result<(CookieJar, Json<SignUpResponse>), AppError> {
    let started = state.auth_usecase.sign_up(request).await?;

    let mut jar = with_verifier(jar, started.code_verifier, state.stage);
    if let Some(session) = &started.session {
        jar = with_session(jar, session, state.stage);
    }

    Ok((jar, Json(started.response)))
}

pub async fn login(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthUserDto>), AppError> {
    let session = state.auth_usecase.login(request).await?;

    let jar = with_session(jar, &session, state.stage);
    Ok((
        jar,
        Json(AuthUserDto {
            user_id: session.user_id,
            email: session.email,
        }),
    ))
}

/// Landing point of confirmation and reset links. Always redirects.
pub async fn callback(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Query(query): Query<AuthCallbackQuery>,
) -> Response {
    if let Some(description) = query.error_description.as_deref() {
        warn!(%description, "auth: provider reported callback error");
    }

    let verifier = jar
        .get(PKCE_VERIFIER_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let jar = jar.remove(removal(PKCE_VERIFIER_COOKIE));

    match state
        .auth_usecase
        .exchange_code(query.code.as_deref(), verifier.as_deref())
        .await
    {
        Ok(session) => {
            let jar = with_session(jar, &session, state.stage);
            let target = safe_redirect_path(query.next.as_deref());
            (jar, Redirect::to(&target)).into_response()
        }
        Err(err) => (jar, Redirect::to(&login_error_path(&err.to_string()))).into_response(),
    }
}

pub async fn reset_password(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let verifier = state.auth_usecase.reset_password(request).await?;

    Ok((
        with_verifier(jar, verifier, state.stage),
        Json(json!({
            "success": true,
            "message": "Als dit e-mailadres bij ons bekend is, ontvang je een link om je wachtwoord te herstellen."
        })),
    ))
}

pub async fn logout(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);
    let token = bearer.or_else(|| {
        jar.get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
    });

    state.auth_usecase.logout(token.as_deref()).await;

    let jar = jar
        .remove(removal(ACCESS_TOKEN_COOKIE))
        .remove(removal(REFRESH_TOKEN_COOKIE))
        .remove(removal(PKCE_VERIFIER_COOKIE));

    (jar, Json(json!({ "success": true })))
}

fn login_error_path(message: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    format!("/login?error={}", encoded)
}
