//! Deliver request/response and presentation context models.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::message::{InAppMessage, Message};
use super::schedule::ScheduleRequest;
use super::user::{Identifiers, User};

/// Property carrying the originating event's insert id.
pub const TRIGGER_EVENT_INSERT_ID: &str = "trigger_event_insert_id";

/// Request to re-validate and present one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverRequest {
    /// Idempotency key of the dispatch.
    pub dispatch_id: String,
    /// Target message id.
    pub in_app_message_id: i64,
    /// Target message key.
    pub in_app_message_key: i64,
    /// Identifiers captured when the schedule was created.
    pub identifiers: Identifiers,
    /// When delivery was requested.
    pub requested_at: DateTime<Utc>,
    /// Reason of the trigger-time eligibility decision.
    pub decision_reason: String,
    /// Extra decision properties, e.g. the trigger event insert id.
    pub properties: Map<String, Value>,
}

impl DeliverRequest {
    /// Derive the deliver request for a schedule request.
    #[must_use]
    pub fn from_schedule_request(request: &ScheduleRequest) -> Self {
        let schedule = &request.schedule;
        let mut properties = Map::new();
        if let Some(ref ctx) = schedule.event_based_context {
            properties.insert(
                TRIGGER_EVENT_INSERT_ID.to_owned(),
                Value::String(ctx.insert_id.clone()),
            );
        }
        Self {
            dispatch_id: schedule.dispatch_id.clone(),
            in_app_message_id: schedule.in_app_message_id,
            in_app_message_key: schedule.in_app_message_key,
            identifiers: schedule.identifiers.clone(),
            requested_at: request.requested_at,
            decision_reason: schedule.decision_reason.clone(),
            properties,
        }
    }
}

/// Flat discriminant of a [`DeliverOutcome`], for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliverCode {
    /// No usable foreground screen.
    ActivityInactive,
    /// Workspace snapshot unavailable.
    WorkspaceNotFound,
    /// Message no longer in the workspace.
    InAppMessageNotFound,
    /// User identity changed since the trigger.
    IdentifierChanged,
    /// Delivery-time evaluation rejected the user.
    Ineligible,
    /// Handed to the presenter.
    Present,
    /// Unexpected failure inside the pipeline.
    Exception,
}

impl DeliverCode {
    /// Upper-case log name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActivityInactive => "ACTIVITY_INACTIVE",
            Self::WorkspaceNotFound => "WORKSPACE_NOT_FOUND",
            Self::InAppMessageNotFound => "IN_APP_MESSAGE_NOT_FOUND",
            Self::IdentifierChanged => "IDENTIFIER_CHANGED",
            Self::Ineligible => "INELIGIBLE",
            Self::Present => "PRESENT",
            Self::Exception => "EXCEPTION",
        }
    }
}

impl Display for DeliverCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a delivery attempt.
#[derive(Debug, Clone)]
pub enum DeliverOutcome {
    /// No usable foreground screen.
    ActivityInactive,
    /// Workspace snapshot unavailable.
    WorkspaceNotFound,
    /// Message no longer in the workspace.
    InAppMessageNotFound,
    /// User identity changed since the trigger.
    IdentifierChanged,
    /// Delivery-time evaluation rejected the user.
    Ineligible {
        /// Evaluator's reason.
        reason: String,
    },
    /// Handed to the presenter.
    Present(PresentResponse),
    /// Unexpected failure inside the pipeline.
    Exception {
        /// Rendered error.
        message: String,
    },
}

impl DeliverOutcome {
    /// Flat discriminant.
    #[must_use]
    pub fn code(&self) -> DeliverCode {
        match self {
            Self::ActivityInactive => DeliverCode::ActivityInactive,
            Self::WorkspaceNotFound => DeliverCode::WorkspaceNotFound,
            Self::InAppMessageNotFound => DeliverCode::InAppMessageNotFound,
            Self::IdentifierChanged => DeliverCode::IdentifierChanged,
            Self::Ineligible { .. } => DeliverCode::Ineligible,
            Self::Present(_) => DeliverCode::Present,
            Self::Exception { .. } => DeliverCode::Exception,
        }
    }
}

/// A deliver request paired with its terminal outcome.
#[derive(Debug, Clone)]
pub struct DeliverResponse {
    /// The processed request.
    pub request: DeliverRequest,
    /// Terminal outcome.
    pub outcome: DeliverOutcome,
}

impl DeliverResponse {
    /// Shorthand for `self.outcome.code()`.
    #[must_use]
    pub fn code(&self) -> DeliverCode {
        self.outcome.code()
    }
}

/// Everything the presenter needs to render one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationContext {
    /// Idempotency key of the dispatch.
    pub dispatch_id: String,
    /// The message being shown.
    pub in_app_message: InAppMessage,
    /// Variant chosen by layout evaluation.
    pub message: Message,
    /// User the message is shown to.
    pub user: User,
    /// Reason reported by the deciding evaluation.
    pub decision_reason: String,
    /// Decision properties forwarded to analytics.
    pub properties: Map<String, Value>,
}

/// Presenter acknowledgement of a presentation hand-off.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentResponse {
    /// Idempotency key of the dispatch.
    pub dispatch_id: String,
    /// Context handed to the UI.
    pub context: PresentationContext,
}
