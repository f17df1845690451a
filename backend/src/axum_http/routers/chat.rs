use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::StreamExt;
use tracing::error;
use uuid::Uuid;

use crate::{auth::AuthUser, axum_http::error_responses::AppError};
use application::{
    interfaces::chat_model::ChatModel,
    usecases::chat::{ChatUseCase, list_categories},
};
use domain::value_objects::chat::{ChatCategoryDto, ChatRequest};
use infra::postgres::{postgres_connection::PgPoolSquad, repositories::profiles::ProfilePostgres};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    chat_model: Arc<dyn ChatModel>,
    token_budget: usize,
) -> Router {
    let chat_usecase = ChatUseCase::new(
        Arc::new(ProfilePostgres::new(Arc::clone(&db_pool))),
        chat_model,
        token_budget,
    );

    Router::new()
        .route("/", post(chat))
        .route("/categories", get(categories))
        .with_state(Arc::new(chat_usecase))
}

pub async fn categories() -> Json<Vec<ChatCategoryDto>> {
    Json(list_categories())
}

/// Streams the answer as chunked plain text. A model failure after the first chunk
/// aborts the body.
pub async fn chat(
    State(chat_usecase): State<Arc<ChatUseCase>>,
    auth: AuthUser,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let user_id: Uuid = auth.user_id;
    let stream = chat_usecase.stream(user_id, request).await?;

    let body = stream.map(move |part| {
        part.map_err(|err| {
            error!(%user_id, error = ?err, "chat: stream interrupted");
            err
        })
    });

    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
