use std::collections::VecDeque;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream::BoxStream};
use serde::Serialize;
use tracing::{error, info};

use application::interfaces::chat_model::{ChatModel, TextStream};
use domain::value_objects::chat::{ChatMessage, ChatRole};

use super::sse::SseTextDecoder;

#[derive(Debug, Clone)]
pub struct VertexSettings {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

fn vertex_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::Assistant => "model",
        ChatRole::User | ChatRole::System => "user",
    }
}

fn request_body<'a>(
    system_prompt: &'a str,
    messages: &'a [ChatMessage],
    settings: &VertexSettings,
) -> GenerateContentBody<'a> {
    GenerateContentBody {
        system_instruction: Content {
            role: None,
            parts: vec![TextPart {
                text: system_prompt,
            }],
        },
        contents: messages
            .iter()
            .map(|message| Content {
                role: Some(vertex_role(message.role)),
                parts: vec![TextPart {
                    text: &message.content,
                }],
            })
            .collect(),
        generation_config: GenerationConfig {
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        },
    }
}

struct StreamState {
    bytes: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseTextDecoder,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

fn text_stream(bytes: BoxStream<'static, reqwest::Result<Bytes>>) -> TextStream {
    let state = StreamState {
        bytes,
        decoder: SseTextDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    let stream = futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => match state.decoder.push(&chunk) {
                    Ok(texts) => state.pending.extend(texts),
                    Err(err) => {
                        error!(error = ?err, "vertex: stream event too large");
                        state.finished = true;
                        state.pending.push_back(Err(err));
                    }
                },
                Some(Err(err)) => {
                    error!(error = ?err, "vertex: stream interrupted");
                    state.finished = true;
                    state.pending.push_back(Err(err.into()));
                }
                None => {
                    state.finished = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    });

    Box::pin(stream)
}

pub struct VertexClient {
    http: reqwest::Client,
    settings: VertexSettings,
}

impl VertexClient {
    pub fn new(settings: VertexSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn stream_url(&self) -> String {
        let VertexSettings {
            project_id,
            location,
            model,
            ..
        } = &self.settings;
        format!(
            "https://{location}-aiplatform.googleapis.com/v1/projects/{project_id}/locations/{location}/publishers/google/models/{model}:streamGenerateContent"
        )
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        error!(%status, response_body = %body, %context, "vertex api request failed");
        anyhow::bail!("Vertex AI request failed: {} (status {})", context, status);
    }
}

#[async_trait]
impl ChatModel for VertexClient {
    async fn stream_chat(
        &self,
        system_prompt: String,
        messages: Vec<ChatMessage>,
    ) -> Result<TextStream> {
        let body = request_body(&system_prompt, &messages, &self.settings);

        let resp = self
            .http
            .post(self.stream_url())
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "stream generate content").await?;

        info!(model = %self.settings.model, turns = messages.len(), "vertex: stream opened");
        Ok(text_stream(resp.bytes_stream().boxed()))
    }
}
