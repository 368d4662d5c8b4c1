//! crates/mindhaven_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

use crate::domain::{
    ChatMessage, ChatSession, HomeContent, InsightDraft, Mood, MoodEntry, MoodInference,
    MoodReflection, Sender, User, UserCredentials, WeeklyInsight, WeeklyReport,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// An unbounded sequence of displayable text fragments from the completion
/// service, terminated by stream close.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, PortError>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Identity ---
    async fn create_user_with_email(
        &self,
        display_name: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn update_account(
        &self,
        user_id: Uuid,
        display_name: Option<&str>,
        hashed_password: Option<&str>,
    ) -> PortResult<()>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Chat Sessions ---
    async fn create_chat_session(&self, user_id: Uuid) -> PortResult<ChatSession>;

    async fn get_chat_session(&self, session_id: Uuid) -> PortResult<ChatSession>;

    /// All of a user's sessions, newest first.
    async fn list_chat_sessions(&self, user_id: Uuid) -> PortResult<Vec<ChatSession>>;

    async fn set_session_title(&self, session_id: Uuid, title: &str) -> PortResult<()>;

    /// Deletes a session and, at the store level, every message in it.
    async fn delete_chat_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()>;

    // --- Chat Messages ---
    async fn append_message(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        sender: Sender,
        text: &str,
    ) -> PortResult<ChatMessage>;

    /// A session's full transcript, ordered by `created_at` ascending.
    async fn messages_for_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Vec<ChatMessage>>;

    /// Every message of the user across sessions since `since`, ascending.
    async fn messages_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<ChatMessage>>;

    /// Number of distinct calendar days with at least one chat message
    /// since `since`. Computed in the store, not by fetching rows.
    async fn distinct_chat_days_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<i64>;

    // --- Mood Entries ---
    /// Inserts a mood entry. Returns `None` when the store rejected the
    /// insert because an entry for `(user_id, session_id)` already exists;
    /// callers treat that exactly like a prior existence-check hit.
    async fn insert_mood(
        &self,
        user_id: Uuid,
        mood: Mood,
        notes: Option<&str>,
        session_id: Option<Uuid>,
    ) -> PortResult<Option<MoodEntry>>;

    async fn update_mood(
        &self,
        mood_id: Uuid,
        mood: Mood,
        notes: Option<&str>,
    ) -> PortResult<MoodEntry>;

    async fn mood_for_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Option<MoodEntry>>;

    /// All of a user's mood entries, newest first.
    async fn list_moods(&self, user_id: Uuid) -> PortResult<Vec<MoodEntry>>;

    async fn count_moods(&self, user_id: Uuid) -> PortResult<i64>;

    // --- Weekly Insights ---
    /// Inserts a report. Returns `None` when one with the same
    /// `(user_id, start_date)` already exists (unique-index rejection).
    async fn insert_weekly_insight(
        &self,
        user_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        report: &WeeklyReport,
        image_prompts: &[String],
    ) -> PortResult<Option<WeeklyInsight>>;

    /// True if any report's window start falls on or after `window_start`.
    async fn insight_exists_since(
        &self,
        user_id: Uuid,
        window_start: NaiveDate,
    ) -> PortResult<bool>;

    /// All of a user's reports, newest first.
    async fn list_weekly_insights(&self, user_id: Uuid) -> PortResult<Vec<WeeklyInsight>>;

    async fn latest_weekly_insight(&self, user_id: Uuid) -> PortResult<Option<WeeklyInsight>>;
}

/// The conversational side of the completion service.
#[async_trait]
pub trait CompanionChatService: Send + Sync {
    /// Requests a streamed reply seeded with the prior transcript plus the
    /// new user message. Fragments arrive in order until stream close.
    async fn stream_reply(
        &self,
        transcript: &[ChatMessage],
        message: &str,
    ) -> PortResult<ChunkStream>;
}

#[async_trait]
pub trait TitleGenerationService: Send + Sync {
    /// Produces a short label for a conversation, or `None` when the model
    /// returns nothing usable.
    async fn generate_title(&self, messages: &[ChatMessage]) -> PortResult<Option<String>>;
}

#[async_trait]
pub trait MoodInferenceService: Send + Sync {
    /// Classifies the user's predominant mood from conversation tail.
    /// `None` means the service produced no usable classification; callers
    /// skip the write silently.
    async fn infer_mood(&self, messages: &[ChatMessage]) -> PortResult<Option<MoodInference>>;
}

#[async_trait]
pub trait InsightGenerationService: Send + Sync {
    /// Synthesizes the structured weekly report plus two illustrative
    /// image prompts from a week of transcript.
    async fn generate_report(
        &self,
        messages: &[ChatMessage],
        user_name: &str,
    ) -> PortResult<InsightDraft>;
}

/// The remaining structured completion operations: daily home-screen
/// content, tips, mood reflections and the self-help tools.
#[async_trait]
pub trait GuidanceService: Send + Sync {
    async fn home_content(&self, user_name: &str, moods: &[MoodEntry]) -> PortResult<HomeContent>;

    async fn personalized_tip(&self, moods: &[MoodEntry]) -> PortResult<String>;

    async fn mood_reflection(&self, mood: Mood, notes: &str) -> PortResult<MoodReflection>;

    async fn break_down_task(&self, task: &str) -> PortResult<Vec<String>>;

    async fn reframe_thought(&self, thought: &str) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Renders a themed prompt into a base64 data URL.
    async fn generate_artwork(&self, prompt: &str) -> PortResult<String>;
}
