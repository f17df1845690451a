use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_MESSAGES: usize = 50;
pub const MAX_MESSAGE_CHARS: usize = 8_000;
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;
const LONG_WORD_CHARS: usize = 12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Rough token count: a quarter of the characters, plus one per very long word
/// and one per two punctuation marks. Never decreases as text is appended.
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    if chars == 0 {
        return 0;
    }

    let base = chars.div_ceil(4);
    let long_words = text
        .split_whitespace()
        .filter(|word| word.chars().count() > LONG_WORD_CHARS)
        .count();
    let punctuation = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    base + long_words + punctuation / 2
}

pub fn estimate_message_tokens(message: &ChatMessage) -> usize {
    estimate_tokens(&message.content) + MESSAGE_OVERHEAD_TOKENS
}

pub fn estimate_conversation_tokens(messages: &[ChatMessage]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Drops the oldest non-system messages until the conversation fits `budget`.
/// System messages always survive, even when they alone exceed the budget.
pub fn trim_history(messages: Vec<ChatMessage>, budget: usize) -> Vec<ChatMessage> {
    let mut total = estimate_conversation_tokens(&messages);
    if total <= budget {
        return messages;
    }

    let mut keep = vec![true; messages.len()];
    for (idx, message) in messages.iter().enumerate() {
        if total <= budget {
            break;
        }
        if message.role == ChatRole::System {
            continue;
        }
        keep[idx] = false;
        total -= estimate_message_tokens(message);
    }

    messages
        .into_iter()
        .zip(keep)
        .filter_map(|(message, kept)| kept.then_some(message))
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatCategory {
    #[default]
    Algemeen,
    Financieel,
    Juridisch,
    Marketing,
    Hr,
}

impl ChatCategory {
    pub const ALL: [ChatCategory; 5] = [
        ChatCategory::Algemeen,
        ChatCategory::Financieel,
        ChatCategory::Juridisch,
        ChatCategory::Marketing,
        ChatCategory::Hr,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ChatCategory::Algemeen => "algemeen",
            ChatCategory::Financieel => "financieel",
            ChatCategory::Juridisch => "juridisch",
            ChatCategory::Marketing => "marketing",
            ChatCategory::Hr => "hr",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChatCategory::Algemeen => "Algemeen advies",
            ChatCategory::Financieel => "Financiën & boekhouding",
            ChatCategory::Juridisch => "Juridische vragen",
            ChatCategory::Marketing => "Marketing & sales",
            ChatCategory::Hr => "Personeel & HR",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            ChatCategory::Algemeen => {
                "Je bent een ervaren bedrijfsadviseur voor Nederlandse ondernemers. \
                 Geef praktische, concrete antwoorden in helder Nederlands."
            }
            ChatCategory::Financieel => {
                "Je bent een financieel adviseur voor het MKB. Leg fiscale en \
                 boekhoudkundige onderwerpen begrijpelijk uit en verwijs bij twijfel \
                 naar een accountant."
            }
            ChatCategory::Juridisch => {
                "Je bent een juridisch adviseur voor ondernemers in Nederland. Geef \
                 algemene informatie, geen bindend juridisch advies, en benoem wanneer \
                 een advocaat nodig is."
            }
            ChatCategory::Marketing => {
                "Je bent een marketingstrateeg voor kleine bedrijven. Denk mee over \
                 positionering, campagnes en verkoop, met haalbare stappen."
            }
            ChatCategory::Hr => {
                "Je bent een HR-adviseur voor werkgevers in Nederland. Help met \
                 personeelsbeleid, contracten en arbeidsrecht in begrijpelijke taal."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCategoryDto {
    pub slug: &'static str,
    pub label: &'static str,
}

impl From<ChatCategory> for ChatCategoryDto {
    fn from(value: ChatCategory) -> Self {
        Self {
            slug: value.slug(),
            label: value.label(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub category: Option<ChatCategory>,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ChatValidationError {
    #[error("Stuur minimaal één bericht")]
    Empty,
    #[error("Het gesprek is te lang, begin een nieuw gesprek")]
    TooManyMessages,
    #[error("Een bericht mag maximaal 8000 tekens bevatten")]
    MessageTooLong,
    #[error("Een bericht mag niet leeg zijn")]
    BlankMessage,
    #[error("Het laatste bericht moet van de gebruiker komen")]
    LastMessageNotFromUser,
    #[error("Systeemberichten kunnen niet worden meegestuurd")]
    ClientSystemMessage,
}

impl ChatRequest {
    /// Client-supplied history must not carry system prompts; those come from the category.
    pub fn validate(&self) -> Result<(), ChatValidationError> {
        let last = self.messages.last().ok_or(ChatValidationError::Empty)?;
        if self.messages.len() > MAX_MESSAGES {
            return Err(ChatValidationError::TooManyMessages);
        }
        for message in &self.messages {
            if message.role == ChatRole::System {
                return Err(ChatValidationError::ClientSystemMessage);
            }
            if message.content.trim().is_empty() {
                return Err(ChatValidationError::BlankMessage);
            }
            if message.content.chars().count() > MAX_MESSAGE_CHARS {
                return Err(ChatValidationError::MessageTooLong);
            }
        }
        if last.role != ChatRole::User {
            return Err(ChatValidationError::LastMessageNotFromUser);
        }
        Ok(())
    }
}
