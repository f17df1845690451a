use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::Utc;

use crate::{auth::AuthUser, axum_http::error_responses::AppError};
use application::{
    interfaces::payment_gateway::PaymentGateway,
    usecases::checkout::{CheckoutConfig, CheckoutUseCase, CheckoutUser},
};
use domain::value_objects::checkout::{
    CheckoutStatusDto, CreateCheckoutRequest, CreateCheckoutResponse,
};
use infra::postgres::{
    postgres_connection::PgPoolSquad,
    repositories::{
        discount_codes::DiscountCodePostgres, payments::PaymentPostgres,
        profiles::ProfilePostgres,
    },
};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    payment_gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
) -> Router {
    let checkout_usecase = CheckoutUseCase::new(
        Arc::new(DiscountCodePostgres::new(Arc::clone(&db_pool))),
        Arc::new(ProfilePostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        payment_gateway,
        config,
    );

    Router::new()
        .route("/", post(create_checkout))
        .route("/status/:payment_id", get(checkout_status))
        .with_state(Arc::new(checkout_usecase))
}

pub async fn create_checkout(
    State(checkout_usecase): State<Arc<CheckoutUseCase>>,
    auth: AuthUser,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, AppError> {
    let user = CheckoutUser {
        user_id: auth.user_id,
        email: auth.email,
    };

    let response = checkout_usecase
        .create_checkout(user, request, Utc::now())
        .await?;

    Ok(Json(response))
}

pub async fn checkout_status(
    State(checkout_usecase): State<Arc<CheckoutUseCase>>,
    auth: AuthUser,
    Path(payment_id): Path<String>,
) -> Result<Json<CheckoutStatusDto>, AppError> {
    let status = checkout_usecase
        .checkout_status(auth.user_id, &payment_id, Utc::now())
        .await?;

    Ok(Json(status))
}
