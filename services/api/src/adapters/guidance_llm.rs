//! services/api/src/adapters/guidance_llm.rs
//!
//! This module contains the adapter for the remaining structured completion
//! operations: daily home-screen content, personalized tips, mood
//! reflections and the two self-help tools. It implements the
//! `GuidanceService` port from the `core` crate.
//!
//! Every operation here has a canned fallback. Transport failures and
//! malformed replies are logged and converted at this boundary, so callers
//! never see an error from these paths.

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
use mindhaven_core::domain::{
    DailyFocus, DailyQuote, HomeContent, Mood, MoodEntry, MoodReflection,
};
use mindhaven_core::ports::{GuidanceService, PortError, PortResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::error;

use super::extract_json_block;

#[derive(Clone)]
pub struct OpenAiGuidanceAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGuidanceAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Sends a single-prompt completion and parses the JSON document out of
    /// the reply.
    async fn request_json<T: DeserializeOwned>(&self, prompt: String) -> PortResult<T> {
        let request_messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
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

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Guidance reply contained no text content.".to_string())
            })?;

        serde_json::from_str(extract_json_block(&content))
            .map_err(|e| PortError::Unexpected(format!("Malformed guidance reply: {}", e)))
    }
}

/// Renders recent mood history into prompt lines, newest first.
fn mood_history_lines(moods: &[MoodEntry]) -> String {
    moods
        .iter()
        .take(14)
        .map(|entry| {
            let notes = entry.notes.as_deref().unwrap_or("-");
            format!(
                "{}: {} ({})",
                entry.created_at.format("%Y-%m-%d"),
                entry.mood.label(),
                notes
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_name(user_name: &str) -> &str {
    user_name.split_whitespace().next().unwrap_or("friend")
}

fn fallback_home_content(user_name: &str) -> HomeContent {
    HomeContent {
        daily_focus: DailyFocus {
            greeting: format!("Good morning, {}!", first_name(user_name)),
            focus_title: "A Moment for You".to_string(),
            focus_text: "Ready to check in with yourself? Taking a moment to pause is a great way to start.".to_string(),
            focus_action: None,
        },
        daily_quote: DailyQuote {
            quote: "The best way to capture moments is to pay attention. This is how we cultivate mindfulness.".to_string(),
            author: "Jon Kabat-Zinn".to_string(),
        },
        mood_insight: None,
    }
}

const FALLBACK_TIP: &str =
    "Remember to be kind to yourself today. Every small step forward is progress.";

const FIRST_STEP_TIP: &str = "Checking in with yourself is a great first step on any day.";

const FALLBACK_REFLECTION: &str =
    "Thank you for sharing how you feel. It's great that you're checking in with yourself.";

fn fallback_task_steps() -> Vec<String> {
    vec![
        "Take a deep breath.".to_string(),
        "Identify the very first, smallest thing you can do.".to_string(),
        "Do that one thing for just 5 minutes.".to_string(),
    ]
}

fn fallback_perspectives() -> Vec<String> {
    vec![
        "This feeling is temporary.".to_string(),
        "What is one small thing I can control in this situation?".to_string(),
        "It's okay to not be okay.".to_string(),
    ]
}

#[derive(Deserialize)]
struct TipPayload {
    tip: String,
}

#[derive(Deserialize)]
struct StepsPayload {
    steps: Vec<String>,
}

#[derive(Deserialize)]
struct PerspectivesPayload {
    perspectives: Vec<String>,
}

//=========================================================================================
// `GuidanceService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GuidanceService for OpenAiGuidanceAdapter {
    async fn home_content(&self, user_name: &str, moods: &[MoodEntry]) -> PortResult<HomeContent> {
        let prompt = format!(
            "You write the daily home screen for a mood-journaling app. The user's name is \
             {name}. Their recent mood history (newest first):\n{history}\n\n\
             Return ONLY a JSON object with these keys:\n\
             - \"daily_focus\": {{\"greeting\": a warm time-neutral greeting using their first \
             name, \"focus_title\": a short theme for today, \"focus_text\": 1-2 encouraging \
             sentences, \"focus_action\": optionally {{\"text\", \"target\" (\"chat\" or \
             \"resources\"), \"prompt\"}}}}\n\
             - \"daily_quote\": {{\"quote\", \"author\"}} - a real, attributed quote about \
             mindfulness or self-compassion\n\
             - \"mood_insight\": null if there are fewer than 3 mood entries, otherwise \
             {{\"title\", \"insight\"}} - one gentle observation about their recent pattern.",
            name = user_name,
            history = if moods.is_empty() {
                "(no entries yet)".to_string()
            } else {
                mood_history_lines(moods)
            },
        );

        match self.request_json::<HomeContent>(prompt).await {
            Ok(content) => Ok(content),
            Err(e) => {
                error!("Home content generation failed, serving fallback: {}", e);
                Ok(fallback_home_content(user_name))
            }
        }
    }

    async fn personalized_tip(&self, moods: &[MoodEntry]) -> PortResult<String> {
        if moods.is_empty() {
            return Ok(FIRST_STEP_TIP.to_string());
        }

        let prompt = format!(
            "A mood-journaling user has this recent history (newest first):\n{}\n\n\
             Write one short, personalized, actionable wellness tip (1-2 sentences) that fits \
             this pattern. Be warm, never clinical. Return ONLY a JSON object with a \"tip\" key.",
            mood_history_lines(moods),
        );

        match self.request_json::<TipPayload>(prompt).await {
            Ok(payload) => Ok(payload.tip),
            Err(e) => {
                error!("Personalized tip generation failed, serving fallback: {}", e);
                Ok(FALLBACK_TIP.to_string())
            }
        }
    }

    async fn mood_reflection(&self, mood: Mood, notes: &str) -> PortResult<MoodReflection> {
        let prompt = format!(
            "The user just logged their mood as \"{mood}\". Their notes are: \"{notes}\". \
             Write a brief, single-paragraph reflection (2-3 sentences max). It should be \
             validating and gentle. Then provide a single actionable suggestion targeting \
             either a 'chat' with a specific prompt, or navigating to 'resources'. Return ONLY \
             a JSON object shaped {{\"reflection\": \"...\", \"suggestion\": {{\"text\": \
             \"...\", \"target\": \"chat\", \"prompt\": \"...\"}}}}.",
            mood = mood.label(),
            notes = notes,
        );

        match self.request_json::<MoodReflection>(prompt).await {
            Ok(reflection) if !reflection.reflection.trim().is_empty() => Ok(reflection),
            Ok(_) | Err(_) => Ok(MoodReflection {
                reflection: FALLBACK_REFLECTION.to_string(),
                suggestion: None,
            }),
        }
    }

    async fn break_down_task(&self, task: &str) -> PortResult<Vec<String>> {
        let prompt = format!(
            "A user is overwhelmed by this task: \"{}\". Break it down into 3-5 very small, \
             actionable, encouraging first steps. Return ONLY a JSON object shaped \
             {{\"steps\": [\"First...\", \"Then...\"]}}.",
            task,
        );

        match self.request_json::<StepsPayload>(prompt).await {
            Ok(payload) if !payload.steps.is_empty() => Ok(payload.steps),
            Ok(_) => Ok(fallback_task_steps()),
            Err(e) => {
                error!("Task breakdown failed, serving fallback: {}", e);
                Ok(fallback_task_steps())
            }
        }
    }

    async fn reframe_thought(&self, thought: &str) -> PortResult<Vec<String>> {
        let prompt = format!(
            "A user is stuck on this negative thought: \"{}\". Offer 2-3 alternative, more \
             balanced or compassionate perspectives. Reframe the thought gently. Return ONLY a \
             JSON object shaped {{\"perspectives\": [\"It's possible that...\"]}}.",
            thought,
        );

        match self.request_json::<PerspectivesPayload>(prompt).await {
            Ok(payload) if !payload.perspectives.is_empty() => Ok(payload.perspectives),
            Ok(_) => Ok(fallback_perspectives()),
            Err(e) => {
                error!("Thought reframing failed, serving fallback: {}", e);
                Ok(fallback_perspectives())
            }
        }
    }
}
