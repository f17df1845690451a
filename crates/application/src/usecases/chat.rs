use std::sync::Arc;

use domain::{
    repositories::profiles::ProfileRepository,
    value_objects::{
        chat::{
            ChatCategory, ChatCategoryDto, ChatMessage, ChatRequest, ChatRole,
            ChatValidationError, estimate_conversation_tokens, trim_history,
        },
        enums::profile_subscription_statuses::ProfileSubscriptionStatus,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::interfaces::chat_model::{ChatModel, TextStream};

pub const DEFAULT_CONTEXT_TOKEN_BUDGET: usize = 8_000;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ChatValidationError),
    #[error("Je hebt een actief abonnement nodig om de chat te gebruiken")]
    NoActiveSubscription,
    #[error("Je bericht is te lang voor de chat, maak het korter")]
    PromptTooLarge,
    #[error("model request failed")]
    Model(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

pub fn list_categories() -> Vec<ChatCategoryDto> {
    ChatCategory::ALL.into_iter().map(ChatCategoryDto::from).collect()
}

pub struct ChatUseCase {
    profile_repo: Arc<dyn ProfileRepository + Send + Sync>,
    chat_model: Arc<dyn ChatModel>,
    token_budget: usize,
}

impl ChatUseCase {
    pub fn new(
        profile_repo: Arc<dyn ProfileRepository + Send + Sync>,
        chat_model: Arc<dyn ChatModel>,
        token_budget: usize,
    ) -> Self {
        Self {
            profile_repo,
            chat_model,
            token_budget,
        }
    }

    pub async fn stream(&self, user_id: Uuid, request: ChatRequest) -> ChatResult<TextStream> {
        request.validate()?;

        let profile = self.profile_repo.find_by_id(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "chat: failed to load profile");
            ChatError::Internal(err)
        })?;
        let status = profile
            .map(|p| ProfileSubscriptionStatus::from_str(&p.subscription_status))
            .unwrap_or_default();
        if status != ProfileSubscriptionStatus::Active {
            info!(%user_id, %status, "chat: rejected without active subscription");
            return Err(ChatError::NoActiveSubscription);
        }

        let category = request.category.unwrap_or_default();
        let received = request.messages.len();

        let mut conversation = Vec::with_capacity(received + 1);
        conversation.push(ChatMessage::system(category.system_prompt()));
        conversation.extend(request.messages);

        let trimmed = trim_history(conversation, self.token_budget);
        let estimated_tokens = estimate_conversation_tokens(&trimmed);

        let (system, history): (Vec<_>, Vec<_>) = trimmed
            .into_iter()
            .partition(|message| message.role == ChatRole::System);

        if history.last().is_none_or(|last| last.role != ChatRole::User) {
            warn!(%user_id, received, budget = self.token_budget, "chat: history trimmed to nothing");
            return Err(ChatError::PromptTooLarge);
        }

        let system_prompt = system
            .into_iter()
            .map(|message| message.content)
            .collect::<Vec<_>>()
            .join("\n\n");

        info!(
            %user_id,
            category = category.slug(),
            received,
            kept = history.len(),
            estimated_tokens,
            "chat: streaming answer"
        );

        self.chat_model
            .stream_chat(system_prompt, history)
            .await
            .map_err(|err| {
                error!(%user_id, error = ?err, "chat: model request failed");
                ChatError::Model(err)
            })
    }
}
