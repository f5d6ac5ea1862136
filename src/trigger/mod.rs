//! Event-to-message trigger matching.
//!
//! For each track event the matcher walks the workspace's messages in
//! declared order and returns the first one that both has a matching rule
//! and is eligible right now. Later messages are never considered once a
//! match is found.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn};

use crate::evaluation::Evaluator;
use crate::models::event::TrackEvent;
use crate::models::message::InAppMessage;
use crate::models::schedule::{EventBasedContext, Schedule};
use crate::models::workspace::Workspace;
use crate::platform::WorkspaceFetcher;
use crate::Result;

/// Decision that `in_app_message` should be shown in response to `event`.
#[derive(Debug, Clone)]
pub struct Trigger {
    /// The matched message.
    pub in_app_message: InAppMessage,
    /// Reason of the trigger-time eligibility decision.
    pub reason: String,
    /// The triggering event.
    pub event: TrackEvent,
}

impl Trigger {
    /// Build the triggered schedule for this decision.
    ///
    /// The schedule gets a fresh dispatch id, snapshots the event user's
    /// identifiers, and starts its delay clock at `started_at`.
    #[must_use]
    pub fn schedule(&self, started_at: DateTime<Utc>) -> Schedule {
        Schedule::triggered(
            &self.in_app_message,
            self.event.user.identifiers.clone(),
            Some(EventBasedContext {
                insert_id: self.event.insert_id.clone(),
                event: self.event.event.clone(),
            }),
            self.reason.clone(),
            started_at,
        )
    }
}

/// Finds at most one eligible message for a track event.
pub struct TriggerMatcher {
    workspace_fetcher: Arc<dyn WorkspaceFetcher>,
    evaluator: Arc<dyn Evaluator>,
}

impl TriggerMatcher {
    /// Create a matcher over the given workspace source and evaluator.
    #[must_use]
    pub fn new(
        workspace_fetcher: Arc<dyn WorkspaceFetcher>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            workspace_fetcher,
            evaluator,
        }
    }

    /// First eligible trigger for `event`, or `None`.
    ///
    /// Evaluation failures are logged and treated as no trigger.
    #[must_use]
    pub fn determine(&self, event: &TrackEvent) -> Option<Trigger> {
        let _span = info_span!(
            "trigger_match",
            event_key = %event.event.key,
            insert_id = %event.insert_id,
        )
        .entered();

        match self.try_determine(event) {
            Ok(trigger) => trigger,
            Err(err) => {
                warn!(%err, "trigger matching failed, skipping event");
                None
            }
        }
    }

    fn try_determine(&self, event: &TrackEvent) -> Result<Option<Trigger>> {
        let Some(workspace) = self.workspace_fetcher.fetch() else {
            debug!("no workspace snapshot, nothing to trigger");
            return Ok(None);
        };

        for in_app_message in &workspace.in_app_messages {
            if !self.is_triggered(&workspace, in_app_message, event)? {
                continue;
            }

            let evaluation =
                self.evaluator
                    .evaluate(&workspace, in_app_message, &event.user, event.timestamp)?;
            if !evaluation.is_eligible {
                debug!(
                    in_app_message_key = in_app_message.key,
                    reason = %evaluation.reason,
                    "rule matched but user is ineligible"
                );
                continue;
            }

            info!(
                in_app_message_key = in_app_message.key,
                reason = %evaluation.reason,
                "in-app message triggered"
            );
            return Ok(Some(Trigger {
                in_app_message: in_app_message.clone(),
                reason: evaluation.reason,
                event: event.clone(),
            }));
        }

        Ok(None)
    }

    fn is_triggered(
        &self,
        workspace: &Workspace,
        in_app_message: &InAppMessage,
        event: &TrackEvent,
    ) -> Result<bool> {
        for rule in in_app_message.rules_for(&event.event.key) {
            if self
                .evaluator
                .matches_trigger(workspace, in_app_message, rule, event)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
