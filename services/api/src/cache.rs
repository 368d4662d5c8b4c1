//! services/api/src/cache.rs
//!
//! An explicit per-user daily cache for generated content that only needs
//! daily freshness (home-screen document, personalized tip). Injected via
//! `AppState` rather than read from ambient storage.
//!
//! An entry is fresh when its calendar date matches today and, if the entry
//! was stored with a mood count, the user's mood count is unchanged.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

struct CacheEntry<T> {
    value: T,
    date: NaiveDate,
    mood_count: Option<i64>,
}

/// A cache of one `T` per user, keyed by `(user_id, date)` with an optional
/// mood-count invalidation predicate.
pub struct DailyCache<T> {
    entries: Mutex<HashMap<Uuid, CacheEntry<T>>>,
}

impl<T: Clone> DailyCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value when it is still fresh for `today`.
    ///
    /// Passing `mood_count: Some(n)` additionally requires the entry to have
    /// been stored against the same count; `None` skips that predicate.
    pub fn get_fresh(&self, user_id: Uuid, today: NaiveDate, mood_count: Option<i64>) -> Option<T> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        let entry = entries.get(&user_id)?;
        if entry.date != today {
            return None;
        }
        if mood_count.is_some() && entry.mood_count != mood_count {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn store(&self, user_id: Uuid, today: NaiveDate, mood_count: Option<i64>, value: T) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            user_id,
            CacheEntry {
                value,
                date: today,
                mood_count,
            },
        );
    }
}

impl<T: Clone> Default for DailyCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
