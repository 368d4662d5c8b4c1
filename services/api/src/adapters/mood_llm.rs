//! services/api/src/adapters/mood_llm.rs
//!
//! This module contains the adapter for conversation mood inference.
//! It implements the `MoodInferenceService` port from the `core` crate.
//!
//! The classification is constrained to the closed `Mood` enumeration; a
//! malformed response or an unknown label yields `Ok(None)` so callers can
//! skip the write silently rather than fail the wrap-up.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    error::OpenAIError,
    Client,
};
use async_trait::async_trait;
use mindhaven_core::domain::{ChatMessage, Mood, MoodInference, Sender};
use mindhaven_core::ports::{MoodInferenceService, PortError, PortResult};
use serde::Deserialize;
use tracing::warn;

use super::extract_json_block;

#[derive(Clone)]
pub struct OpenAiMoodAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiMoodAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn mood_labels() -> String {
    Mood::ALL
        .iter()
        .map(|m| m.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_prompt(messages: &[ChatMessage]) -> String {
    let conversation = messages
        .iter()
        .map(|m| {
            let speaker = match m.sender {
                Sender::User => "User",
                Sender::Ai => "Companion",
            };
            format!("{}: {}", speaker, m.text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on the final user messages in this conversation, analyze the user's predominant \
         mood. Consider the language, tone, and subject matter. Provide a one-word mood \
         classification from this list: {labels}. Also provide a brief, one-sentence rationale \
         for your choice, written as if you are summarizing the user's state.\n\n\
         Conversation:\n---\n{conversation}\n---\n\
         Return ONLY a JSON object with \"mood\" and \"notes\" keys.",
        labels = mood_labels(),
        conversation = conversation,
    )
}

/// The loosely-typed wire shape; validated into `MoodInference`.
#[derive(Deserialize)]
struct MoodPayload {
    mood: String,
    #[serde(default)]
    notes: String,
}

/// Defensive parse of the model's reply. Anything that does not resolve to
/// a known mood label is treated as "no classification".
fn parse_inference(raw: &str) -> Option<MoodInference> {
    let payload: MoodPayload = serde_json::from_str(extract_json_block(raw)).ok()?;
    let mood = Mood::parse_label(&payload.mood)?;
    Some(MoodInference {
        mood,
        notes: payload.notes.trim().to_string(),
    })
}

#[async_trait]
impl MoodInferenceService for OpenAiMoodAdapter {
    async fn infer_mood(&self, messages: &[ChatMessage]) -> PortResult<Option<MoodInference>> {
        let request_messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(messages))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into()];

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

        let Some(content) = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
        else {
            return Ok(None);
        };

        let inference = parse_inference(&content);
        if inference.is_none() {
            warn!("Mood inference reply did not contain a usable classification.");
        }
        Ok(inference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_payloads() {
        let parsed = parse_inference(r#"{"mood": "Good", "notes": "Upbeat about the new job."}"#)
            .expect("should parse");
        assert_eq!(parsed.mood, Mood::Good);
        assert_eq!(parsed.notes, "Upbeat about the new job.");
    }

    #[test]
    fn tolerates_fences_and_case() {
        let parsed =
            parse_inference("```json\n{\"mood\": \"awful\", \"notes\": \"Very low.\"}\n```")
                .expect("should parse");
        assert_eq!(parsed.mood, Mood::Awful);
    }

    #[test]
    fn unknown_labels_and_garbage_yield_none() {
        assert!(parse_inference(r#"{"mood": "Melancholic", "notes": "x"}"#).is_none());
        assert!(parse_inference("the user seems fine").is_none());
        assert!(parse_inference("").is_none());
    }

    #[test]
    fn missing_notes_defaults_to_empty() {
        let parsed = parse_inference(r#"{"mood": "Okay"}"#).expect("should parse");
        assert_eq!(parsed.notes, "");
    }

    #[test]
    fn prompt_lists_every_mood_label() {
        let prompt = build_prompt(&[]);
        for mood in Mood::ALL {
            assert!(prompt.contains(mood.label()));
        }
    }
}
