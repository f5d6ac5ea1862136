//! Eligibility, layout, and identity checks consumed by the pipeline.
//!
//! The targeting rule language lives outside this crate. [`Evaluator`] is the
//! seam to it; [`reference::HiddenAwareEvaluator`] is a permissive stand-in
//! that only honours suppression windows.

pub mod identifier;
pub mod reference;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::event::TrackEvent;
use crate::models::message::{InAppMessage, Message, TriggerRule};
use crate::models::user::User;
use crate::models::workspace::Workspace;
use crate::Result;

/// Outcome of an eligibility evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the user qualifies.
    pub is_eligible: bool,
    /// Evaluator's reason code.
    pub reason: String,
}

impl Evaluation {
    /// Eligible with `reason`.
    #[must_use]
    pub fn eligible(reason: impl Into<String>) -> Self {
        Self {
            is_eligible: true,
            reason: reason.into(),
        }
    }

    /// Ineligible with `reason`.
    #[must_use]
    pub fn ineligible(reason: impl Into<String>) -> Self {
        Self {
            is_eligible: false,
            reason: reason.into(),
        }
    }
}

/// Outcome of a layout evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEvaluation {
    /// Variant to render.
    pub message: Message,
    /// Evaluator's reason code.
    pub reason: String,
    /// Extra properties forwarded to analytics (e.g. experiment keys).
    pub properties: Map<String, Value>,
}

/// Targeting engine seam.
pub trait Evaluator: Send + Sync {
    /// Whether `rule`'s targeting conditions hold for `event`.
    ///
    /// Only called for rules whose event key already equals the event's key.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Evaluation` if the conditions cannot be evaluated.
    fn matches_trigger(
        &self,
        workspace: &Workspace,
        in_app_message: &InAppMessage,
        rule: &TriggerRule,
        event: &TrackEvent,
    ) -> Result<bool>;

    /// Full eligibility of `user` for `in_app_message` at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Evaluation` if evaluation fails.
    fn evaluate(
        &self,
        workspace: &Workspace,
        in_app_message: &InAppMessage,
        user: &User,
        timestamp: DateTime<Utc>,
    ) -> Result<Evaluation>;

    /// Pick the variant of `in_app_message` to render for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Evaluation` if no variant can be selected.
    fn evaluate_layout(
        &self,
        workspace: &Workspace,
        in_app_message: &InAppMessage,
        user: &User,
    ) -> Result<LayoutEvaluation>;
}
