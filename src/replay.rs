//! Replay of recorded event scripts through the pipeline.
//!
//! A script is JSON lines, one [`ReplayLine`] per line. Blank lines and
//! lines starting with `#` are skipped. The collaborators here stand in for
//! a host app: the screen is always in the foreground, views and links only
//! log, and the current user is whoever sent the latest track event.

use std::io::BufRead;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::app::InAppMessaging;
use crate::models::delivery::PresentationContext;
use crate::models::event::{Event, TrackEvent, UserEvent};
use crate::models::message::ActionArea;
use crate::models::user::User;
use crate::platform::{
    Activity, ActivityProvider, ActivityState, Tracker, UriOpener, UserManager,
};
use crate::presenter::ui::{InAppMessageView, ViewFactory};
use crate::{AppError, Result};

/// One scripted step.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayLine {
    /// Track `key` for `user` now.
    Track {
        /// Event key.
        key: String,
        /// Event properties.
        #[serde(default)]
        properties: Map<String, Value>,
        /// Acting user.
        user: User,
    },
    /// Click `area` of the visible message.
    Click {
        /// Clicked area.
        area: ActionArea,
        /// Button or image index.
        #[serde(default)]
        index: usize,
    },
    /// Pause the script.
    Wait {
        /// Pause length in milliseconds.
        millis: u64,
    },
}

/// Counts reported when a replay finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Track events fed to the listener.
    pub events: usize,
    /// Clicks routed to the UI.
    pub clicks: usize,
}

/// Feed `script` through `messaging`, updating `users` on each track event.
///
/// # Errors
///
/// Returns `AppError::Io` if the script cannot be read and
/// `AppError::Config` if a line is not a valid step.
pub async fn replay(
    messaging: &InAppMessaging,
    users: &SessionUserManager,
    script: impl BufRead,
) -> Result<ReplaySummary> {
    let listener = messaging.listener();
    let mut summary = ReplaySummary::default();

    for (number, line) in script.lines().enumerate() {
        let line = line.map_err(|err| AppError::Io(format!("failed to read script: {err}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let step: ReplayLine = serde_json::from_str(trimmed).map_err(|err| {
            AppError::Config(format!("invalid script line {}: {err}", number + 1))
        })?;

        match step {
            ReplayLine::Track {
                key,
                properties,
                user,
            } => {
                users.set(user.clone());
                let event = Event { key, properties };
                listener.on_event(&UserEvent::Track(TrackEvent::new(event, user, Utc::now())));
                summary.events += 1;
            }
            ReplayLine::Click { area, index } => {
                messaging.ui().click(area, index);
                summary.clicks += 1;
            }
            ReplayLine::Wait { millis } => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
            }
        }
    }

    Ok(summary)
}

/// A screen that is always in the foreground.
pub struct ForegroundActivity {
    activity: Activity,
}

impl ForegroundActivity {
    /// Foreground screen named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            activity: Activity::new(name),
        }
    }
}

impl ActivityProvider for ForegroundActivity {
    fn current_state(&self) -> ActivityState {
        ActivityState::Active
    }

    fn current_activity(&self) -> Option<Activity> {
        Some(self.activity.clone())
    }
}

/// The user of the most recent track event.
#[derive(Default)]
pub struct SessionUserManager {
    user: RwLock<User>,
}

impl SessionUserManager {
    /// Switch the current user.
    pub fn set(&self, user: User) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }
}

impl UserManager for SessionUserManager {
    fn resolve(&self) -> User {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Tracker that logs each event and remembers its key.
#[derive(Default)]
pub struct LogTracker {
    keys: Mutex<Vec<String>>,
}

impl LogTracker {
    /// Events tracked so far.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    /// Keys of the tracked events, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tracker for LogTracker {
    fn track(&self, event: Event, user: &User, timestamp: DateTime<Utc>) -> Result<()> {
        self.lock().push(event.key.clone());
        let properties = Value::Object(event.properties);
        info!(
            event_key = %event.key,
            %properties,
            user_id = user.get_user_id().unwrap_or_default(),
            %timestamp,
            "track"
        );
        Ok(())
    }
}

/// Link opener that only logs.
pub struct LogUriOpener;

impl UriOpener for LogUriOpener {
    fn open(&self, uri: &str) -> Result<()> {
        info!(uri, "open link");
        Ok(())
    }
}

/// Creates [`LogView`]s.
pub struct LogViewFactory;

impl ViewFactory for LogViewFactory {
    fn create(&self, context: &PresentationContext) -> Result<Arc<dyn InAppMessageView>> {
        Ok(Arc::new(LogView {
            dispatch_id: context.dispatch_id.clone(),
            title: context
                .message
                .text
                .as_ref()
                .map(|text| text.title.clone())
                .unwrap_or_default(),
        }))
    }
}

/// View that logs its lifecycle instead of rendering.
pub struct LogView {
    dispatch_id: String,
    title: String,
}

impl InAppMessageView for LogView {
    fn open(&self, activity: &Activity) -> Result<()> {
        info!(
            dispatch_id = %self.dispatch_id,
            title = %self.title,
            activity = %activity.name,
            "view opened"
        );
        Ok(())
    }

    fn close(&self) {
        debug!(dispatch_id = %self.dispatch_id, "view closed");
    }
}
