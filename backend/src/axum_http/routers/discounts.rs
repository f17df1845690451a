use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;

use crate::axum_http::error_responses::AppError;
use application::usecases::discounts::DiscountUseCase;
use domain::{
    repositories::discount_codes::DiscountCodeRepository,
    value_objects::discounts::{
        DiscountRejection, DiscountValidation, DiscountValidationDto, ValidateDiscountRequest,
    },
};
use infra::postgres::{
    postgres_connection::PgPoolSquad, repositories::discount_codes::DiscountCodePostgres,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let discount_repository = DiscountCodePostgres::new(Arc::clone(&db_pool));
    let discount_usecase = DiscountUseCase::new(Arc::new(discount_repository));

    Router::new()
        .route("/validate", post(validate::<DiscountCodePostgres>))
        .with_state(Arc::new(discount_usecase))
}

pub async fn validate<T>(
    State(discount_usecase): State<Arc<DiscountUseCase<T>>>,
    Json(request): Json<ValidateDiscountRequest>,
) -> Result<Response, AppError>
where
    T: DiscountCodeRepository + Send + Sync + 'static,
{
    let validation = discount_usecase.validate(request, Utc::now()).await?;

    let status = match &validation {
        DiscountValidation::Valid(_) => StatusCode::OK,
        DiscountValidation::Invalid(DiscountRejection::LookupFailed) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        DiscountValidation::Invalid(_) => StatusCode::BAD_REQUEST,
    };

    Ok((status, Json(DiscountValidationDto::from(validation))).into_response())
}
