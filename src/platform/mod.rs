//! Host platform and SDK collaborator interfaces.
//!
//! The delivery pipeline never talks to the host app, the analytics queue,
//! or the workspace store directly. Each of those is reached through one of
//! the traits below so the pipeline can be wired to a real SDK, to the
//! replay runner, or to test fakes.

pub mod ui_thread;
pub mod workspace;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::event::Event;
use crate::models::user::User;
use crate::models::workspace::Workspace;
use crate::Result;

/// Source of the current workspace snapshot.
pub trait WorkspaceFetcher: Send + Sync {
    /// Latest snapshot, or `None` if none has been loaded yet.
    fn fetch(&self) -> Option<Arc<Workspace>>;
}

/// Whether the host app currently has a usable foreground screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    /// A screen is in the foreground.
    Active,
    /// Backgrounded, or no screen yet.
    Inactive,
}

/// Opaque handle to a foreground screen a view can attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// Screen name, used for logging.
    pub name: String,
}

impl Activity {
    /// Handle for the screen named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Foreground activity tracking.
pub trait ActivityProvider: Send + Sync {
    /// Current foreground state.
    fn current_state(&self) -> ActivityState;

    /// Current foreground screen, if any.
    fn current_activity(&self) -> Option<Activity>;
}

/// Resolves the user the SDK currently acts for.
pub trait UserManager: Send + Sync {
    /// Current user with up-to-date identifiers.
    fn resolve(&self) -> User;
}

/// Analytics emission.
pub trait Tracker: Send + Sync {
    /// Enqueue `event` for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Track` if the event cannot be enqueued. Callers
    /// log and drop the error.
    fn track(&self, event: Event, user: &User, timestamp: DateTime<Utc>) -> Result<()>;
}

/// Opens links outside the app.
pub trait UriOpener: Send + Sync {
    /// Open `uri` with the platform's default handler.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Present` if no handler accepts the link.
    fn open(&self, uri: &str) -> Result<()>;
}

/// Unit of work marshalled onto the UI thread.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs work on the UI-affinity thread.
pub trait UiDispatcher: Send + Sync {
    /// Queue `task` for execution on the UI thread.
    fn dispatch(&self, task: UiTask);
}
