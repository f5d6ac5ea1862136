//! Analytics events flowing into and out of the in-app message pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::user::User;

/// A keyed event with properties; the shape handed to the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Event {
    /// Event key, e.g. `purchase` or `$in_app_impression`.
    pub key: String,
    /// Event properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Event {
    /// Construct an event without properties.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            properties: Map::new(),
        }
    }

    /// Add a property, replacing any previous value under `name`.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// A track event produced by the analytics pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TrackEvent {
    /// Unique id of this event occurrence.
    pub insert_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// User that produced the event.
    pub user: User,
    /// The tracked event.
    pub event: Event,
}

impl TrackEvent {
    /// Construct a track event with a fresh insert id.
    #[must_use]
    pub fn new(event: Event, user: User, timestamp: DateTime<Utc>) -> Self {
        Self {
            insert_id: Uuid::new_v4().to_string(),
            timestamp,
            user,
            event,
        }
    }
}

/// An experiment exposure produced by the analytics pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ExposureEvent {
    /// Unique id of this event occurrence.
    pub insert_id: String,
    /// When the exposure occurred.
    pub timestamp: DateTime<Utc>,
    /// Exposed user.
    pub user: User,
    /// Experiment key.
    pub experiment_key: i64,
    /// Assigned variation key.
    pub variation_key: String,
}

/// Any event the analytics pipeline forwards to listeners.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    /// A tracked custom event.
    Track(TrackEvent),
    /// An experiment exposure.
    Exposure(ExposureEvent),
}

impl UserEvent {
    /// Unique id of this event occurrence.
    #[must_use]
    pub fn insert_id(&self) -> &str {
        match self {
            Self::Track(e) => &e.insert_id,
            Self::Exposure(e) => &e.insert_id,
        }
    }

    /// User that produced the event.
    #[must_use]
    pub fn user(&self) -> &User {
        match self {
            Self::Track(e) => &e.user,
            Self::Exposure(e) => &e.user,
        }
    }
}
