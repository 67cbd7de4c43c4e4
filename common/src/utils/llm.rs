use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use tracing::debug;

use crate::error::AppError;

/// A language model that turns a fully rendered prompt into text.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: String) -> Result<String, AppError>;
}

/// Chat-completions backed model; the prompt is sent as a single user message.
pub struct OpenAICompletion {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAICompletion {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAICompletion {
    async fn complete(&self, prompt: String) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessage::from(prompt).into()])
            .build()?;

        let response = self.client.chat().create(request).await?;

        debug!(model = %self.model, usage = ?response.usage, "Completion received");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AppError::LLMParsing(
                "No content found in LLM response".into(),
            ))
    }
}
