use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use domain::value_objects::chat::ChatMessage;
use futures_util::Stream;

/// Text fragments in the order the model produced them.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// `messages` must not contain system messages; they are passed as `system_prompt`.
    async fn stream_chat(&self, system_prompt: String, messages: Vec<ChatMessage>)
    -> Result<TextStream>;
}
