//! User identity model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier key for the host application's user id.
pub const USER_ID: &str = "$userId";

/// Identifier key for the SDK-generated device id.
pub const DEVICE_ID: &str = "$deviceId";

/// Identifier type to value, ordered for stable comparison and logging.
pub type Identifiers = BTreeMap<String, String>;

/// The user an event or delivery is evaluated for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct User {
    /// Stable identifiers (`$userId`, `$deviceId`, custom types).
    #[serde(default)]
    pub identifiers: Identifiers,
    /// Free-form user properties consumed by targeting.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl User {
    /// Construct a user with only a device identifier.
    #[must_use]
    pub fn with_device_id(device_id: impl Into<String>) -> Self {
        let mut identifiers = Identifiers::new();
        identifiers.insert(DEVICE_ID.to_owned(), device_id.into());
        Self {
            identifiers,
            properties: Map::new(),
        }
    }

    /// Attach the host application's user id.
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.identifiers.insert(USER_ID.to_owned(), user_id.into());
        self
    }

    /// The `$userId` identifier, if present.
    #[must_use]
    pub fn get_user_id(&self) -> Option<&str> {
        self.identifiers.get(USER_ID).map(String::as_str)
    }

    /// The `$deviceId` identifier, if present.
    #[must_use]
    pub fn get_device_id(&self) -> Option<&str> {
        self.identifiers.get(DEVICE_ID).map(String::as_str)
    }
}
