//! crates/mindhaven_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP layer; the
//! structured report documents derive serde because the store persists
//! them as JSON and the API returns them verbatim.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Mood
//=========================================================================================

/// The five ordinal mood levels a user can log, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Awful,
    Bad,
    Okay,
    Good,
    Great,
}

impl Mood {
    /// All levels in ascending order, for prompt construction and charts.
    pub const ALL: [Mood; 5] = [Mood::Awful, Mood::Bad, Mood::Okay, Mood::Good, Mood::Great];

    /// The stable label used in storage, prompts and API payloads.
    pub fn label(&self) -> &'static str {
        match self {
            Mood::Awful => "Awful",
            Mood::Bad => "Bad",
            Mood::Okay => "Okay",
            Mood::Good => "Good",
            Mood::Great => "Great",
        }
    }

    /// Parses a label back into a level. Case-insensitive so that model
    /// output like "great" still resolves; anything else is `None`.
    pub fn parse_label(label: &str) -> Option<Mood> {
        Mood::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(label.trim()))
    }

    /// Numeric score 1..=5, used by mood history charts.
    pub fn score(&self) -> u8 {
        match self {
            Mood::Awful => 1,
            Mood::Bad => 2,
            Mood::Okay => 3,
            Mood::Good => 4,
            Mood::Great => 5,
        }
    }
}

/// Which side of the conversation produced a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }

    pub fn parse_label(label: &str) -> Option<Sender> {
        match label {
            "user" => Some(Sender::User),
            "ai" => Some(Sender::Ai),
            _ => None,
        }
    }
}

//=========================================================================================
// Conversation Entities
//=========================================================================================

/// One continuous chat conversation. The title is assigned at most once,
/// and only after the conversation holds at least two messages.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single message within a session. Append-only; ordered by `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Mood Journal Entities
//=========================================================================================

/// A logged mood, either entered directly by the user or inferred from a
/// finished chat session (in which case `session_id` links back to it).
#[derive(Debug, Clone, Serialize)]
pub struct MoodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood: Mood,
    pub notes: Option<String>,
    pub session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The outcome of parsing a conversation for the user's predominant mood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodInference {
    pub mood: Mood,
    pub notes: String,
}

//=========================================================================================
// Weekly Insight Entities
//=========================================================================================

/// Where a suggestion should take the user inside the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionTarget {
    Chat,
    Resources,
}

/// An actionable nudge attached to reports, reflections and the daily focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub target: SuggestionTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTheme {
    pub theme: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportObservations {
    pub strength: String,
    pub pattern: String,
}

/// The structured document at the heart of a weekly insight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub opening: String,
    pub key_themes: Vec<ReportTheme>,
    pub emotional_landscape: String,
    pub observations: ReportObservations,
    pub suggestions: Vec<Suggestion>,
}

/// A generated weekly digest. Immutable once created; at most one per
/// 7-day window start per user.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyInsight {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub report: WeeklyReport,
    pub image_prompts: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// What the completion service hands back before persistence: the report
/// document plus the illustrative image prompts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InsightDraft {
    pub report: WeeklyReport,
    pub image_prompts: Vec<String>,
}

//=========================================================================================
// Daily Guidance Documents
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFocus {
    pub greeting: String,
    pub focus_title: String,
    pub focus_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_action: Option<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuote {
    pub quote: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodInsight {
    pub title: String,
    pub insight: String,
}

/// Everything the home screen shows for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeContent {
    pub daily_focus: DailyFocus,
    pub daily_quote: DailyQuote,
    #[serde(default)]
    pub mood_insight: Option<MoodInsight>,
}

/// The short validating response returned after the user logs a mood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodReflection {
    pub reflection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
}

//=========================================================================================
// Identity
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_labels_round_trip() {
        for mood in Mood::ALL {
            assert_eq!(Mood::parse_label(mood.label()), Some(mood));
        }
        assert_eq!(Mood::parse_label("great"), Some(Mood::Great));
        assert_eq!(Mood::parse_label("  Okay "), Some(Mood::Okay));
        assert_eq!(Mood::parse_label("Ecstatic"), None);
    }

    #[test]
    fn mood_scores_are_ordinal() {
        let scores: Vec<u8> = Mood::ALL.iter().map(|m| m.score()).collect();
        assert_eq!(scores, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn weekly_report_round_trips_through_json() {
        let report = WeeklyReport {
            opening: "This week carried more weight than usual.".to_string(),
            key_themes: vec![ReportTheme {
                theme: "Work pressure".to_string(),
                summary: "Deadlines came up in most conversations.".to_string(),
            }],
            emotional_landscape: "Strained early in the week, settling later.".to_string(),
            observations: ReportObservations {
                strength: "You kept showing up.".to_string(),
                pattern: "Evenings were consistently calmer.".to_string(),
            },
            suggestions: vec![Suggestion {
                text: "Talk through the Friday deadline".to_string(),
                target: SuggestionTarget::Chat,
                prompt: Some("I want to talk about my deadline.".to_string()),
            }],
        };

        let json = serde_json::to_string(&report).unwrap();
        let back: WeeklyReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn suggestion_target_uses_lowercase_wire_labels() {
        let json = serde_json::to_string(&SuggestionTarget::Resources).unwrap();
        assert_eq!(json, "\"resources\"");
    }
}
