//! Ingress of the in-app message pipeline.

use std::sync::Arc;

use chrono::Utc;
use tracing::error;

use crate::errors::catch_panic;
use crate::models::event::{TrackEvent, UserEvent};
use crate::models::schedule::ScheduleRequest;
use crate::schedule::processor::ScheduleProcessor;
use crate::trigger::TriggerMatcher;
use crate::Result;

/// Receives every event the analytics pipeline produces.
pub trait UserEventListener: Send + Sync {
    /// Handle `event`. Never panics; must not block on I/O.
    fn on_event(&self, event: &UserEvent);
}

/// Turns track events into triggered schedule requests.
pub struct InAppMessageManager {
    matcher: TriggerMatcher,
    processor: Arc<ScheduleProcessor>,
}

impl InAppMessageManager {
    /// Create the manager.
    #[must_use]
    pub fn new(matcher: TriggerMatcher, processor: Arc<ScheduleProcessor>) -> Self {
        Self { matcher, processor }
    }

    fn schedule(&self, track: &TrackEvent) -> Result<()> {
        let Some(trigger) = self.matcher.determine(track) else {
            return Ok(());
        };

        let schedule = trigger.schedule(track.timestamp);
        let request = ScheduleRequest::triggered(schedule, Utc::now());
        self.processor.process(&request).map(|_| ())
    }
}

impl UserEventListener for InAppMessageManager {
    fn on_event(&self, event: &UserEvent) {
        let UserEvent::Track(track) = event else {
            return;
        };

        if let Err(err) = catch_panic(|| self.schedule(track)) {
            error!(
                %err,
                insert_id = %track.insert_id,
                event_key = %track.event.key,
                "failed to schedule triggered in-app message"
            );
        }
    }
}
