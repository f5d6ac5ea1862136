//! Chooses DELIVER, DELAY, or IGNORE for a schedule request.

use std::time::Duration;

use chrono::TimeDelta;

use super::ScheduleAction;
use crate::models::schedule::ScheduleRequest;

/// Time-based action policy.
///
/// 1. Not yet due → [`ScheduleAction::Delay`].
/// 2. Due longer ago than the expiration threshold → [`ScheduleAction::Ignore`].
/// 3. Otherwise → [`ScheduleAction::Deliver`].
#[derive(Debug, Clone, Copy)]
pub struct ScheduleActionDeterminer {
    expiration_threshold: TimeDelta,
}

impl ScheduleActionDeterminer {
    /// Determiner that ignores requests overdue by more than `expiration_threshold`.
    #[must_use]
    pub fn new(expiration_threshold: Duration) -> Self {
        Self {
            expiration_threshold: TimeDelta::from_std(expiration_threshold)
                .unwrap_or(TimeDelta::MAX),
        }
    }

    /// Action for `request`.
    #[must_use]
    pub fn determine(&self, request: &ScheduleRequest) -> ScheduleAction {
        let remaining = request.remaining();
        if remaining > TimeDelta::zero() {
            return ScheduleAction::Delay;
        }
        if -remaining > self.expiration_threshold {
            return ScheduleAction::Ignore;
        }
        ScheduleAction::Deliver
    }
}
