//! Schedule, schedule request, and delay models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::Event;
use super::message::InAppMessage;
use super::user::Identifiers;

/// Origin of a schedule request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    /// Created directly from a matched trigger.
    Triggered,
    /// Re-submitted after a registered delay fired.
    Delayed,
}

impl ScheduleType {
    /// Log name of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Triggered => "TRIGGERED",
            Self::Delayed => "DELAYED",
        }
    }
}

/// Trigger and deliver instants of a schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScheduleTime {
    /// When the trigger fired.
    pub started_at: DateTime<Utc>,
    /// Earliest instant delivery may happen.
    pub deliver_at: DateTime<Utc>,
}

/// The event a schedule was created from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct EventBasedContext {
    /// Insert id of the originating track event.
    pub insert_id: String,
    /// The originating event.
    pub event: Event,
}

/// One attempt to deliver a specific in-app message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Schedule {
    /// Idempotency key of this delivery attempt.
    pub dispatch_id: String,
    /// Target message id.
    pub in_app_message_id: i64,
    /// Target message key.
    pub in_app_message_key: i64,
    /// How this schedule came to be.
    pub schedule_type: ScheduleType,
    /// User identifiers captured at trigger time.
    pub identifiers: Identifiers,
    /// Trigger and deliver instants.
    pub time: ScheduleTime,
    /// Originating event, for event-triggered schedules.
    pub event_based_context: Option<EventBasedContext>,
    /// Reason of the trigger-time eligibility decision.
    pub decision_reason: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    /// Construct a new triggered schedule with a fresh dispatch id.
    #[must_use]
    pub fn triggered(
        in_app_message: &InAppMessage,
        identifiers: Identifiers,
        event_based_context: Option<EventBasedContext>,
        decision_reason: String,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            dispatch_id: Uuid::new_v4().to_string(),
            in_app_message_id: in_app_message.id,
            in_app_message_key: in_app_message.key,
            schedule_type: ScheduleType::Triggered,
            identifiers,
            time: ScheduleTime {
                started_at,
                deliver_at: in_app_message.event_trigger.delay.deliver_at(started_at),
            },
            event_based_context,
            decision_reason,
            created_at: Utc::now(),
        }
    }
}

/// Input to a scheduler action.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    /// The schedule being acted on.
    pub schedule: Schedule,
    /// Request origin; selects the scheduler.
    pub schedule_type: ScheduleType,
    /// When the request was made.
    pub requested_at: DateTime<Utc>,
}

impl ScheduleRequest {
    /// Request made right after a trigger matched.
    #[must_use]
    pub fn triggered(schedule: Schedule, requested_at: DateTime<Utc>) -> Self {
        Self {
            schedule,
            schedule_type: ScheduleType::Triggered,
            requested_at,
        }
    }

    /// Request re-submitted when a delay fires.
    #[must_use]
    pub fn delayed(schedule: Schedule, requested_at: DateTime<Utc>) -> Self {
        Self {
            schedule,
            schedule_type: ScheduleType::Delayed,
            requested_at,
        }
    }

    /// Dispatch id of the underlying schedule.
    #[must_use]
    pub fn dispatch_id(&self) -> &str {
        &self.schedule.dispatch_id
    }

    /// Time left until the schedule is due; negative once overdue.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.schedule.time.deliver_at - self.requested_at
    }
}

/// A pending timed re-delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Delay {
    /// The request that was deferred.
    pub request: ScheduleRequest,
    /// When the delay fires.
    pub schedule_at: DateTime<Utc>,
}

impl Delay {
    /// Delay that fires at the request's deliver time.
    #[must_use]
    pub fn from_request(request: ScheduleRequest) -> Self {
        let schedule_at = request.schedule.time.deliver_at;
        Self {
            request,
            schedule_at,
        }
    }

    /// Dispatch id the delay is keyed by.
    #[must_use]
    pub fn dispatch_id(&self) -> &str {
        self.request.dispatch_id()
    }

    /// Wall-clock wait from `now` until the delay fires; zero when overdue.
    #[must_use]
    pub fn remaining_from(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.schedule_at - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}
