//! Workspace snapshot holding all configured in-app messages.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::message::InAppMessage;
use crate::{AppError, Result};

/// Externally refreshed snapshot of configured in-app messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Workspace {
    /// Messages in declared (priority) order.
    #[serde(default)]
    pub in_app_messages: Vec<InAppMessage>,
}

impl Workspace {
    /// Look up a message by id.
    #[must_use]
    pub fn in_app_message(&self, id: i64) -> Option<&InAppMessage> {
        self.in_app_messages.iter().find(|message| message.id == id)
    }

    /// Parse a workspace snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the JSON does not describe a workspace.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load a workspace snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be read and
    /// `AppError::Config` if it is not a valid snapshot.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Io(format!("failed to read workspace: {err}")))?;
        Self::from_json_str(&raw)
    }
}
