use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use serde_json::{Value, json};

use crate::axum_http::error_responses::AppError;
use application::{interfaces::mailer::Mailer, usecases::contact::ContactUseCase};
use domain::value_objects::contact::ContactRequest;

pub fn routes(mailer: Arc<dyn Mailer>, support_address: String) -> Router {
    let contact_usecase = ContactUseCase::new(mailer, support_address);

    Router::new()
        .route("/", post(submit))
        .with_state(Arc::new(contact_usecase))
}

pub async fn submit(
    State(contact_usecase): State<Arc<ContactUseCase>>,
    Json(request): Json<ContactRequest>,
) -> Result<Json<Value>, AppError> {
    contact_usecase.submit(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Bedankt voor je bericht, we nemen zo snel mogelijk contact met je op."
    })))
}
