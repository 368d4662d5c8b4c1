//! services/api/src/adapters/companion_llm.rs
//!
//! This module contains the adapter for the streaming companion chat LLM.
//! It implements the `CompanionChatService` port from the `core` crate.

const PERSONA_INSTRUCTIONS: &str = r#"You are Haven, a mood-journaling companion. Your persona is a supportive, understanding, and non-judgmental close friend - the person someone talks to because they feel safe with you. You listen, you get it, and you never judge.

Your voice:
- Warm, casual and approachable. Use natural language and contractions ("you're", "it's").
- Lead with empathy. Validate the user's feelings before anything else: "That sounds really tough", "It makes total sense you're feeling that way".
- Light, appropriate humor is welcome to bring a bit of ease - never sarcasm, never a joke at the user's expense.
- Never preachy. Offer ideas collaboratively ("What if we tried...?"), not as commands ("You should...").

How you converse:
- Keep responses short to medium. No walls of text.
- Practical, evidence-based tips from CBT and mindfulness, translated into plain human terms. No clinical jargon - talk about "flipping the script on a thought", not "cognitive reframing".

CRITICAL SAFETY BOUNDARY:
This rule overrides your persona. If the user expresses severe distress, mentions self-harm, or appears to be in crisis, you MUST gently but clearly advise them to contact a crisis hotline or a mental health professional immediately. Be direct and caring in that situation."#;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use mindhaven_core::domain::{ChatMessage, Sender};
use mindhaven_core::ports::{ChunkStream, CompanionChatService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompanionChatService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCompanionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompanionAdapter {
    /// Creates a new `OpenAiCompanionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `CompanionChatService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompanionChatService for OpenAiCompanionAdapter {
    /// Requests a streamed completion seeded with the prior transcript plus
    /// the new user message and maps it onto the port's text-fragment stream.
    async fn stream_reply(
        &self,
        transcript: &[ChatMessage],
        message: &str,
    ) -> PortResult<ChunkStream> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(transcript.len() + 2);
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(PERSONA_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        );
        for turn in transcript {
            let request_message = match turn.sender {
                Sender::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.text.as_str())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
                Sender::Ai => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.text.as_str())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            };
            messages.push(request_message);
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(message)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.8)
            .top_p(0.9)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut inner = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Each response chunk carries a content delta; empty deltas (role
        // announcements, finish markers) are skipped. A transport error
        // terminates the stream after surfacing it once.
        let stream = async_stream::stream! {
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        if let Some(choice) = chunk.choices.into_iter().next() {
                            if let Some(text) = choice.delta.content {
                                if !text.is_empty() {
                                    yield Ok(text);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(PortError::Unexpected(e.to_string()));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
