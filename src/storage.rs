//! Per-message suppression windows and impression history.
//!
//! Both stores are process-local. The hidden action writes suppression
//! windows, the impression processor appends history, and evaluators read
//! both when deciding eligibility.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::user::Identifiers;

/// Suppression windows keyed by in-app message key.
pub trait HiddenStorage: Send + Sync {
    /// Suppress message `key` until `until`.
    fn put(&self, key: i64, until: DateTime<Utc>);

    /// Whether message `key` is suppressed at `now`.
    fn is_hidden(&self, key: i64, now: DateTime<Utc>) -> bool;
}

/// In-memory [`HiddenStorage`]; expired windows are dropped on read.
#[derive(Debug, Default)]
pub struct InMemoryHiddenStorage {
    entries: Mutex<HashMap<i64, DateTime<Utc>>>,
}

impl HiddenStorage for InMemoryHiddenStorage {
    fn put(&self, key: i64, until: DateTime<Utc>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, until);
    }

    fn is_hidden(&self, key: i64, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            Some(until) if *until > now => true,
            Some(_) => {
                entries.remove(&key);
                debug!(in_app_message_key = key, "suppression window expired");
                false
            }
            None => false,
        }
    }
}

/// One recorded impression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpressionRecord {
    /// Identifiers of the user who saw the message.
    pub identifiers: Identifiers,
    /// When it was shown.
    pub timestamp: DateTime<Utc>,
}

/// Impression history keyed by in-app message key.
pub trait ImpressionStorage: Send + Sync {
    /// Append an impression for message `key`.
    fn record(&self, key: i64, impression: ImpressionRecord);

    /// Impressions for message `key`, oldest first.
    fn get(&self, key: i64) -> Vec<ImpressionRecord>;
}

/// In-memory [`ImpressionStorage`] keeping the newest `max_records` per message.
#[derive(Debug)]
pub struct InMemoryImpressionStorage {
    max_records: usize,
    entries: Mutex<HashMap<i64, VecDeque<ImpressionRecord>>>,
}

impl InMemoryImpressionStorage {
    /// Storage that keeps at most `max_records` impressions per message.
    #[must_use]
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl ImpressionStorage for InMemoryImpressionStorage {
    fn record(&self, key: i64, impression: ImpressionRecord) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let history = entries.entry(key).or_default();
        history.push_back(impression);
        while history.len() > self.max_records {
            history.pop_front();
        }
    }

    fn get(&self, key: i64) -> Vec<ImpressionRecord> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }
}
