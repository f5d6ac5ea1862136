//! Schedule classification, scheduling actions, and delay bookkeeping.
//!
//! A [`ScheduleRequest`](crate::models::schedule::ScheduleRequest) enters
//! through [`processor::ScheduleProcessor`], which asks the
//! [`determiner::ScheduleActionDeterminer`] what to do and hands the chosen
//! [`ScheduleAction`] to the scheduler that supports the request's type.

pub mod delay;
pub mod determiner;
pub mod processor;
pub mod scheduler;
pub mod timer;

use std::fmt::{Display, Formatter};

use crate::models::delivery::DeliverResponse;
use crate::models::schedule::Delay;

/// What a scheduler should do with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleAction {
    /// Validate and present now.
    Deliver,
    /// Defer until the schedule is due.
    Delay,
    /// Drop the request.
    Ignore,
}

impl ScheduleAction {
    /// Upper-case log name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deliver => "DELIVER",
            Self::Delay => "DELAY",
            Self::Ignore => "IGNORE",
        }
    }
}

impl Display for ScheduleAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing a [`ScheduleAction`].
#[derive(Debug, Clone)]
pub enum ScheduleResponse {
    /// Delivery ran to a terminal outcome.
    Deliver(DeliverResponse),
    /// A delay is pending.
    Delay(Delay),
    /// Request dropped; carries the cancelled delay for delayed requests.
    Ignore(Option<Delay>),
}

impl ScheduleResponse {
    /// The action this response answers.
    #[must_use]
    pub fn action(&self) -> ScheduleAction {
        match self {
            Self::Deliver(_) => ScheduleAction::Deliver,
            Self::Delay(_) => ScheduleAction::Delay,
            Self::Ignore(_) => ScheduleAction::Ignore,
        }
    }

    /// Nested delivery response, for `Deliver`.
    #[must_use]
    pub fn deliver_response(&self) -> Option<&DeliverResponse> {
        match self {
            Self::Deliver(response) => Some(response),
            _ => None,
        }
    }
}
