//! Delivery-time re-validation pipeline.
//!
//! Conditions may have changed between the trigger and the moment a
//! dispatch is delivered, especially for delayed schedules. The
//! [`DeliverProcessor`] re-checks them in a fixed order and stops at the
//! first failure:
//!
//! 1. foreground activity is active
//! 2. a workspace snapshot exists
//! 3. the message still exists in it
//! 4. the user's identifiers are unchanged
//! 5. eligibility, if the message asks for delivery-time evaluation
//! 6. layout evaluation and hand-off to the presenter
//!
//! Any error raised along the way becomes [`DeliverOutcome::Exception`];
//! nothing escapes to the caller.

use std::sync::Arc;

use tracing::{error, info, info_span};

use crate::evaluation::identifier::IdentifierChecker;
use crate::evaluation::Evaluator;
use crate::models::delivery::{
    DeliverOutcome, DeliverRequest, DeliverResponse, PresentationContext,
};
use crate::models::message::InAppMessage;
use crate::models::user::User;
use crate::models::workspace::Workspace;
use crate::platform::{ActivityProvider, ActivityState, UserManager, WorkspaceFetcher};
use crate::presenter::InAppMessagePresenter;
use crate::Result;

/// Re-validates a dispatch against live state and presents it.
pub struct DeliverProcessor {
    activity_provider: Arc<dyn ActivityProvider>,
    workspace_fetcher: Arc<dyn WorkspaceFetcher>,
    user_manager: Arc<dyn UserManager>,
    identifier_checker: Arc<dyn IdentifierChecker>,
    evaluator: Arc<dyn Evaluator>,
    presenter: Arc<dyn InAppMessagePresenter>,
}

impl DeliverProcessor {
    /// Create the processor.
    #[must_use]
    pub fn new(
        activity_provider: Arc<dyn ActivityProvider>,
        workspace_fetcher: Arc<dyn WorkspaceFetcher>,
        user_manager: Arc<dyn UserManager>,
        identifier_checker: Arc<dyn IdentifierChecker>,
        evaluator: Arc<dyn Evaluator>,
        presenter: Arc<dyn InAppMessagePresenter>,
    ) -> Self {
        Self {
            activity_provider,
            workspace_fetcher,
            user_manager,
            identifier_checker,
            evaluator,
            presenter,
        }
    }

    /// Run `request` to a terminal outcome.
    #[must_use]
    pub fn process(&self, request: DeliverRequest) -> DeliverResponse {
        let _span = info_span!(
            "deliver",
            dispatch_id = %request.dispatch_id,
            in_app_message_key = request.in_app_message_key,
        )
        .entered();

        let outcome = match self.deliver(&request) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, "in-app message delivery failed");
                DeliverOutcome::Exception {
                    message: err.to_string(),
                }
            }
        };

        info!(code = %outcome.code(), "in-app message delivery finished");
        DeliverResponse { request, outcome }
    }

    fn deliver(&self, request: &DeliverRequest) -> Result<DeliverOutcome> {
        if self.activity_provider.current_state() != ActivityState::Active {
            return Ok(DeliverOutcome::ActivityInactive);
        }

        let Some(workspace) = self.workspace_fetcher.fetch() else {
            return Ok(DeliverOutcome::WorkspaceNotFound);
        };

        let Some(in_app_message) = workspace.in_app_message(request.in_app_message_id) else {
            return Ok(DeliverOutcome::InAppMessageNotFound);
        };

        let user = self.user_manager.resolve();
        if self
            .identifier_checker
            .is_changed(&request.identifiers, &user.identifiers)
        {
            return Ok(DeliverOutcome::IdentifierChanged);
        }

        let decision_reason = if in_app_message.evaluate_context.at_deliver_time {
            let evaluation =
                self.evaluator
                    .evaluate(&workspace, in_app_message, &user, request.requested_at)?;
            if !evaluation.is_eligible {
                return Ok(DeliverOutcome::Ineligible {
                    reason: evaluation.reason,
                });
            }
            evaluation.reason
        } else {
            request.decision_reason.clone()
        };

        self.present(request, &workspace, in_app_message, user, decision_reason)
    }

    fn present(
        &self,
        request: &DeliverRequest,
        workspace: &Workspace,
        in_app_message: &InAppMessage,
        user: User,
        decision_reason: String,
    ) -> Result<DeliverOutcome> {
        let layout = self
            .evaluator
            .evaluate_layout(workspace, in_app_message, &user)?;

        let mut properties = request.properties.clone();
        properties.extend(layout.properties);

        let context = PresentationContext {
            dispatch_id: request.dispatch_id.clone(),
            in_app_message: in_app_message.clone(),
            message: layout.message,
            user,
            decision_reason,
            properties,
        };

        let response = self.presenter.present(context)?;
        Ok(DeliverOutcome::Present(response))
    }
}
