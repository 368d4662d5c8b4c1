//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.
//!
//! Identifiers are stored as canonical hyphenated UUID text and timestamps as
//! fixed-width RFC 3339 UTC text, so lexicographic comparisons in SQL agree
//! with chronological order and `substr(created_at, 1, 10)` yields the
//! calendar day.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use mindhaven_core::domain::{
    ChatMessage, ChatSession, Mood, MoodEntry, Sender, User, UserCredentials, WeeklyInsight,
    WeeklyReport,
};
use mindhaven_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// Text Encoding Helpers
//=========================================================================================

fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(text: &str) -> PortResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| PortError::Unexpected(format!("Bad timestamp '{}': {}", text, e)))
}

fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn decode_date(text: &str) -> PortResult<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| PortError::Unexpected(format!("Bad date '{}': {}", text, e)))
}

fn decode_id(text: &str) -> PortResult<Uuid> {
    Uuid::parse_str(text).map_err(|e| PortError::Unexpected(format!("Bad id '{}': {}", text, e)))
}

fn db_err(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRow {
    user_id: String,
    email: String,
    display_name: String,
}
impl UserRow {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            user_id: decode_id(&self.user_id)?,
            email: self.email,
            display_name: self.display_name,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRow {
    user_id: String,
    email: String,
    display_name: String,
    hashed_password: String,
}
impl CredentialsRow {
    fn to_domain(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            user_id: decode_id(&self.user_id)?,
            email: self.email,
            display_name: self.display_name,
            hashed_password: self.hashed_password,
        })
    }
}

#[derive(FromRow)]
struct AuthSessionRow {
    user_id: String,
    expires_at: String,
}

#[derive(FromRow)]
struct ChatSessionRow {
    id: String,
    user_id: String,
    title: Option<String>,
    created_at: String,
}
impl ChatSessionRow {
    fn to_domain(self) -> PortResult<ChatSession> {
        Ok(ChatSession {
            id: decode_id(&self.id)?,
            user_id: decode_id(&self.user_id)?,
            title: self.title,
            created_at: decode_ts(&self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct ChatMessageRow {
    id: String,
    session_id: String,
    user_id: String,
    sender: String,
    text: String,
    created_at: String,
}
impl ChatMessageRow {
    fn to_domain(self) -> PortResult<ChatMessage> {
        let sender = Sender::parse_label(&self.sender)
            .ok_or_else(|| PortError::Unexpected(format!("Bad sender '{}'", self.sender)))?;
        Ok(ChatMessage {
            id: decode_id(&self.id)?,
            session_id: decode_id(&self.session_id)?,
            user_id: decode_id(&self.user_id)?,
            sender,
            text: self.text,
            created_at: decode_ts(&self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct MoodRow {
    id: String,
    user_id: String,
    mood: String,
    notes: Option<String>,
    session_id: Option<String>,
    created_at: String,
}
impl MoodRow {
    fn to_domain(self) -> PortResult<MoodEntry> {
        let mood = Mood::parse_label(&self.mood)
            .ok_or_else(|| PortError::Unexpected(format!("Bad mood label '{}'", self.mood)))?;
        let session_id = match self.session_id {
            Some(text) => Some(decode_id(&text)?),
            None => None,
        };
        Ok(MoodEntry {
            id: decode_id(&self.id)?,
            user_id: decode_id(&self.user_id)?,
            mood,
            notes: self.notes,
            session_id,
            created_at: decode_ts(&self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct InsightRow {
    id: String,
    user_id: String,
    start_date: String,
    end_date: String,
    report_content: String,
    image_prompts: String,
    created_at: String,
}
impl InsightRow {
    fn to_domain(self) -> PortResult<WeeklyInsight> {
        let report: WeeklyReport = serde_json::from_str(&self.report_content)
            .map_err(|e| PortError::Unexpected(format!("Bad report document: {}", e)))?;
        let image_prompts: Vec<String> = serde_json::from_str(&self.image_prompts)
            .map_err(|e| PortError::Unexpected(format!("Bad image prompt list: {}", e)))?;
        Ok(WeeklyInsight {
            id: decode_id(&self.id)?,
            user_id: decode_id(&self.user_id)?,
            start_date: decode_date(&self.start_date)?,
            end_date: decode_date(&self.end_date)?,
            report,
            image_prompts,
            created_at: decode_ts(&self.created_at)?,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        display_name: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (user_id, email, display_name, hashed_password, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(user_id.to_string())
        .bind(email)
        .bind(display_name)
        .bind(hashed_password)
        .bind(encode_ts(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(User {
            user_id,
            email: email.to_string(),
            display_name: display_name.to_string(),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            "SELECT user_id, email, display_name, hashed_password FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => db_err(e),
        })?;
        row.to_domain()
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, email, display_name FROM users WHERE user_id = ?1",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => db_err(e),
        })?;
        row.to_domain()
    }

    async fn update_account(
        &self,
        user_id: Uuid,
        display_name: Option<&str>,
        hashed_password: Option<&str>,
    ) -> PortResult<()> {
        if let Some(name) = display_name {
            sqlx::query("UPDATE users SET display_name = ?1 WHERE user_id = ?2")
                .bind(name)
                .bind(user_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        if let Some(hash) = hashed_password {
            sqlx::query("UPDATE users SET hashed_password = ?1 WHERE user_id = ?2")
                .bind(hash)
                .bind(user_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)")
            .bind(session_id)
            .bind(user_id.to_string())
            .bind(encode_ts(expires_at))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row = sqlx::query_as::<_, AuthSessionRow>(
            "SELECT user_id, expires_at FROM auth_sessions WHERE id = ?1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(PortError::Unauthorized)?;

        if decode_ts(&row.expires_at)? < Utc::now() {
            return Err(PortError::Unauthorized);
        }
        decode_id(&row.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn create_chat_session(&self, user_id: Uuid) -> PortResult<ChatSession> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        sqlx::query("INSERT INTO chat_sessions (id, user_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .bind(encode_ts(created_at))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(ChatSession {
            id,
            user_id,
            title: None,
            created_at,
        })
    }

    async fn get_chat_session(&self, session_id: Uuid) -> PortResult<ChatSession> {
        let row = sqlx::query_as::<_, ChatSessionRow>(
            "SELECT id, user_id, title, created_at FROM chat_sessions WHERE id = ?1",
        )
        .bind(session_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Session {} not found", session_id))
            }
            _ => db_err(e),
        })?;
        row.to_domain()
    }

    async fn list_chat_sessions(&self, user_id: Uuid) -> PortResult<Vec<ChatSession>> {
        let rows = sqlx::query_as::<_, ChatSessionRow>(
            "SELECT id, user_id, title, created_at FROM chat_sessions \
             WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn set_session_title(&self, session_id: Uuid, title: &str) -> PortResult<()> {
        sqlx::query("UPDATE chat_sessions SET title = ?1 WHERE id = ?2")
            .bind(title)
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_chat_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = ?1 AND user_id = ?2")
            .bind(session_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        Ok(())
    }

    async fn append_message(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        sender: Sender,
        text: &str,
    ) -> PortResult<ChatMessage> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, user_id, sender, text, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(id.to_string())
        .bind(session_id.to_string())
        .bind(user_id.to_string())
        .bind(sender.label())
        .bind(text)
        .bind(encode_ts(created_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(ChatMessage {
            id,
            session_id,
            user_id,
            sender,
            text: text.to_string(),
            created_at,
        })
    }

    async fn messages_for_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            "SELECT id, session_id, user_id, sender, text, created_at FROM chat_messages \
             WHERE user_id = ?1 AND session_id = ?2 ORDER BY created_at ASC",
        )
        .bind(user_id.to_string())
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn messages_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            "SELECT id, session_id, user_id, sender, text, created_at FROM chat_messages \
             WHERE user_id = ?1 AND created_at >= ?2 ORDER BY created_at ASC",
        )
        .bind(user_id.to_string())
        .bind(encode_ts(since))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn distinct_chat_days_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT substr(created_at, 1, 10)) FROM chat_messages \
             WHERE user_id = ?1 AND created_at >= ?2",
        )
        .bind(user_id.to_string())
        .bind(encode_ts(since))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(count)
    }

    async fn insert_mood(
        &self,
        user_id: Uuid,
        mood: Mood,
        notes: Option<&str>,
        session_id: Option<Uuid>,
    ) -> PortResult<Option<MoodEntry>> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        // INSERT OR IGNORE turns a unique-index rejection (an entry for this
        // session already exists) into zero affected rows.
        let result = sqlx::query(
            "INSERT OR IGNORE INTO moods (id, user_id, mood, notes, session_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(mood.label())
        .bind(notes)
        .bind(session_id.map(|s| s.to_string()))
        .bind(encode_ts(created_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(MoodEntry {
            id,
            user_id,
            mood,
            notes: notes.map(|n| n.to_string()),
            session_id,
            created_at,
        }))
    }

    async fn update_mood(
        &self,
        mood_id: Uuid,
        mood: Mood,
        notes: Option<&str>,
    ) -> PortResult<MoodEntry> {
        sqlx::query("UPDATE moods SET mood = ?1, notes = ?2 WHERE id = ?3")
            .bind(mood.label())
            .bind(notes)
            .bind(mood_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let row = sqlx::query_as::<_, MoodRow>(
            "SELECT id, user_id, mood, notes, session_id, created_at FROM moods WHERE id = ?1",
        )
        .bind(mood_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Mood entry {} not found", mood_id))
            }
            _ => db_err(e),
        })?;
        row.to_domain()
    }

    async fn mood_for_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Option<MoodEntry>> {
        let row = sqlx::query_as::<_, MoodRow>(
            "SELECT id, user_id, mood, notes, session_id, created_at FROM moods \
             WHERE user_id = ?1 AND session_id = ?2",
        )
        .bind(user_id.to_string())
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| r.to_domain()).transpose()
    }

    async fn list_moods(&self, user_id: Uuid) -> PortResult<Vec<MoodEntry>> {
        let rows = sqlx::query_as::<_, MoodRow>(
            "SELECT id, user_id, mood, notes, session_id, created_at FROM moods \
             WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn count_moods(&self, user_id: Uuid) -> PortResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moods WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count)
    }

    async fn insert_weekly_insight(
        &self,
        user_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        report: &WeeklyReport,
        image_prompts: &[String],
    ) -> PortResult<Option<WeeklyInsight>> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let report_content = serde_json::to_string(report)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode report: {}", e)))?;
        let prompts = serde_json::to_string(image_prompts)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode prompts: {}", e)))?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO weekly_insights \
             (id, user_id, start_date, end_date, report_content, image_prompts, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(encode_date(start_date))
        .bind(encode_date(end_date))
        .bind(report_content)
        .bind(prompts)
        .bind(encode_ts(created_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(WeeklyInsight {
            id,
            user_id,
            start_date,
            end_date,
            report: report.clone(),
            image_prompts: image_prompts.to_vec(),
            created_at,
        }))
    }

    async fn insight_exists_since(
        &self,
        user_id: Uuid,
        window_start: NaiveDate,
    ) -> PortResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM weekly_insights WHERE user_id = ?1 AND start_date >= ?2",
        )
        .bind(user_id.to_string())
        .bind(encode_date(window_start))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn list_weekly_insights(&self, user_id: Uuid) -> PortResult<Vec<WeeklyInsight>> {
        let rows = sqlx::query_as::<_, InsightRow>(
            "SELECT id, user_id, start_date, end_date, report_content, image_prompts, created_at \
             FROM weekly_insights WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn latest_weekly_insight(&self, user_id: Uuid) -> PortResult<Option<WeeklyInsight>> {
        let row = sqlx::query_as::<_, InsightRow>(
            "SELECT id, user_id, start_date, end_date, report_content, image_prompts, created_at \
             FROM weekly_insights WHERE user_id = ?1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|r| r.to_domain()).transpose()
    }
}
