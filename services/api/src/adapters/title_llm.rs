//! services/api/src/adapters/title_llm.rs
//!
//! This module contains the adapter for the session-title LLM.
//! It implements the `TitleGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    error::OpenAIError,
    Client,
};
use async_trait::async_trait;
use mindhaven_core::domain::{ChatMessage, Sender};
use mindhaven_core::ports::{PortError, PortResult, TitleGenerationService};

pub struct OpenAiTitleAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiTitleAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn transcript_excerpt(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.sender {
                Sender::User => "user",
                Sender::Ai => "companion",
            };
            format!("{}: {}", speaker, m.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl TitleGenerationService for OpenAiTitleAdapter {
    async fn generate_title(&self, messages: &[ChatMessage]) -> PortResult<Option<String>> {
        if messages.len() < 2 {
            return Ok(None);
        }

        let request_messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content("You are a conversation-labeling assistant. Read the conversation and create a short, concise, evocative title (under 5 words) that captures its main theme or feeling. Respond with ONLY the title, no quotes, no explanation.")
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "Conversation:\n{}\n---\nTitle:",
                    transcript_excerpt(messages)
                ))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .max_tokens(60u32)
            .temperature(0.4)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let title = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        Ok(title)
    }
}
