use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use application::usecases::mollie_webhook::MollieWebhookUseCase;

pub fn routes(mollie_webhook_usecase: Arc<MollieWebhookUseCase>) -> Router {
    Router::new()
        .route("/", post(mollie_webhook))
        .with_state(mollie_webhook_usecase)
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    id: Option<String>,
}

/// Mollie posts `id=tr_...` form-encoded; JSON bodies are accepted too. Always 200 so
/// Mollie does not retry; failures are logged by the use case.
pub async fn mollie_webhook(
    State(mollie_webhook_usecase): State<Arc<MollieWebhookUseCase>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let payment_id = payment_id_from_body(&headers, &body).unwrap_or_default();
    if payment_id.is_empty() {
        warn!(body_len = body.len(), "mollie_webhook: could not read payment id");
    }

    let outcome = mollie_webhook_usecase.handle(&payment_id, Utc::now()).await;
    info!(%payment_id, ?outcome, "mollie_webhook: delivery handled");

    StatusCode::OK
}

fn payment_id_from_body(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        return serde_json::from_slice::<WebhookPayload>(body)
            .ok()
            .and_then(|payload| payload.id);
    }

    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
}
