use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;

use crate::{auth::AuthUser, axum_http::error_responses::AppError};
use application::{
    interfaces::payment_gateway::PaymentGateway, usecases::subscriptions::SubscriptionUseCase,
};
use domain::value_objects::subscriptions::{CancelSubscriptionResponse, SubscriptionOverviewDto};
use infra::postgres::{
    postgres_connection::PgPoolSquad,
    repositories::{profiles::ProfilePostgres, subscriptions::SubscriptionPostgres},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, payment_gateway: Arc<dyn PaymentGateway>) -> Router {
    let subscriptions_usecase = SubscriptionUseCase::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(ProfilePostgres::new(Arc::clone(&db_pool))),
        payment_gateway,
    );

    Router::new()
        .route("/", get(current_subscription))
        .route("/cancel", post(cancel_subscription))
        .with_state(Arc::new(subscriptions_usecase))
}

/// `null` when the user never subscribed.
pub async fn current_subscription(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase>>,
    auth: AuthUser,
) -> Result<Json<Option<SubscriptionOverviewDto>>, AppError> {
    let overview = subscriptions_usecase
        .current(auth.user_id, Utc::now())
        .await?;

    Ok(Json(overview))
}

pub async fn cancel_subscription(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase>>,
    auth: AuthUser,
) -> Result<Json<CancelSubscriptionResponse>, AppError> {
    let response = subscriptions_usecase
        .cancel(auth.user_id, Utc::now())
        .await?;

    Ok(Json(response))
}
