//! services/api/src/adapters/insight_llm.rs
//!
//! This module contains the adapter for weekly insight report synthesis.
//! It implements the `InsightGenerationService` port from the `core` crate.
//!
//! Unlike mood inference, a malformed reply here is an error rather than a
//! silent skip: the eligibility gate has already passed, and the caller
//! decides whether to log and move on.

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
use mindhaven_core::domain::{ChatMessage, InsightDraft, Sender, WeeklyReport};
use mindhaven_core::ports::{InsightGenerationService, PortError, PortResult};
use serde::Deserialize;

use super::extract_json_block;

const REPORT_INSTRUCTIONS: &str = r#"You are a reflective writing assistant for a mood-journaling app. You will receive one week of a user's conversations with their companion. Synthesize a weekly insight report as a single JSON object with exactly these keys:

- "opening": a warm narrative paragraph (2-3 sentences) addressed to the user by name, summarizing the emotional arc of their week.
- "key_themes": an array of 2-4 objects, each {"theme": short name, "summary": one or two sentences}.
- "emotional_landscape": one paragraph describing how their feelings moved across the week.
- "observations": an object {"strength": something they did well, "pattern": a recurring pattern worth noticing}.
- "suggestions": an array of 1-3 objects {"text": the suggestion, "target": "chat" or "resources", "prompt": an optional conversation opener}.
- "image_prompts": an array of exactly 2 short, evocative visual-scene descriptions that capture the week's feeling (no people's names, no text in the image).

Be validating and gentle, never clinical. Return ONLY the JSON object."#;

#[derive(Clone)]
pub struct OpenAiInsightAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiInsightAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn week_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.sender {
                Sender::User => "User",
                Sender::Ai => "Companion",
            };
            format!("[{}] {}: {}", m.created_at.format("%a"), speaker, m.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wire shape: the report fields flattened next to the image prompts.
#[derive(Deserialize)]
struct DraftPayload {
    #[serde(flatten)]
    report: WeeklyReport,
    #[serde(default)]
    image_prompts: Vec<String>,
}

fn parse_draft(raw: &str) -> PortResult<InsightDraft> {
    let payload: DraftPayload = serde_json::from_str(extract_json_block(raw))
        .map_err(|e| PortError::Unexpected(format!("Malformed weekly report reply: {}", e)))?;
    Ok(InsightDraft {
        report: payload.report,
        image_prompts: payload.image_prompts,
    })
}

#[async_trait]
impl InsightGenerationService for OpenAiInsightAdapter {
    async fn generate_report(
        &self,
        messages: &[ChatMessage],
        user_name: &str,
    ) -> PortResult<InsightDraft> {
        let request_messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(REPORT_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "The user's name is {}.\n\nThis week's conversations:\n{}",
                    user_name,
                    week_transcript(messages)
                ))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Weekly report reply contained no text content.".to_string())
            })?;

        parse_draft(&content)
    }
}
