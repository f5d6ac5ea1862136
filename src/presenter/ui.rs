//! Singleton UI gate.
//!
//! States are `IDLE` (slot empty) and `PRESENTING` (one message occupies
//! the slot). Opening goes through the slot's acquire guard, so a second
//! open while one is in flight or visible is dropped, never queued.
//! Closing empties the slot exactly once and emits a close event.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::event::{InAppMessageEvent, InAppMessageEventHandler};
use super::slot::OccupancySlot;
use crate::models::delivery::PresentationContext;
use crate::models::message::{Action, ActionArea};
use crate::platform::{Activity, ActivityProvider};
use crate::Result;

/// A rendered message attached to a screen.
pub trait InAppMessageView: Send + Sync {
    /// Attach to `activity` and show.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Present` if the view cannot be shown.
    fn open(&self, activity: &Activity) -> Result<()>;

    /// Detach from the screen.
    fn close(&self);
}

/// Creates platform views for presentation contexts.
pub trait ViewFactory: Send + Sync {
    /// Build a view for `context`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Present` if the display type is not renderable.
    fn create(&self, context: &PresentationContext) -> Result<Arc<dyn InAppMessageView>>;
}

/// The message currently occupying the UI gate.
pub struct PresentedMessage {
    /// What is being shown.
    pub context: PresentationContext,
    /// The live view.
    pub view: Arc<dyn InAppMessageView>,
    /// Screen the view is attached to.
    pub activity: Activity,
}

impl PresentedMessage {
    /// Action and label bound to `area`; `index` selects the button or image.
    #[must_use]
    pub fn action_for(&self, area: ActionArea, index: usize) -> Option<(Action, Option<String>)> {
        let message = &self.context.message;
        match area {
            ActionArea::Message => message.action.clone().map(|action| (action, None)),
            ActionArea::Button => message
                .buttons
                .get(index)
                .map(|button| (button.action.clone(), Some(button.text.clone()))),
            ActionArea::Image => message
                .images
                .get(index)
                .and_then(|image| image.action.clone())
                .map(|action| (action, None)),
            ActionArea::XButton => message
                .close_button
                .as_ref()
                .map(|close| (close.action.clone(), None)),
        }
    }
}

/// Enforces a single visible in-app message and routes its interactions.
pub struct InAppMessageUi {
    slot: OccupancySlot<Arc<PresentedMessage>>,
    activity_provider: Arc<dyn ActivityProvider>,
    view_factory: Arc<dyn ViewFactory>,
    event_handler: InAppMessageEventHandler,
}

impl InAppMessageUi {
    /// Create an idle gate.
    #[must_use]
    pub fn new(
        activity_provider: Arc<dyn ActivityProvider>,
        view_factory: Arc<dyn ViewFactory>,
        event_handler: InAppMessageEventHandler,
    ) -> Self {
        Self {
            slot: OccupancySlot::new(),
            activity_provider,
            view_factory,
            event_handler,
        }
    }

    /// Open `context` if nothing else is opening or visible.
    ///
    /// Returns whether the message is now visible. Must run on the UI thread.
    pub fn open(&self, context: PresentationContext) -> bool {
        let Some(permit) = self.slot.try_acquire() else {
            debug!(
                dispatch_id = %context.dispatch_id,
                "another in-app message is presented, dropping"
            );
            return false;
        };

        let Some(activity) = self.activity_provider.current_activity() else {
            debug!(dispatch_id = %context.dispatch_id, "no foreground activity to attach to");
            return false;
        };

        let view = match self.view_factory.create(&context) {
            Ok(view) => view,
            Err(err) => {
                warn!(
                    %err,
                    dispatch_id = %context.dispatch_id,
                    "failed to create in-app message view"
                );
                return false;
            }
        };

        if let Err(err) = view.open(&activity) {
            warn!(%err, dispatch_id = %context.dispatch_id, "failed to open in-app message view");
            return false;
        }

        info!(
            dispatch_id = %context.dispatch_id,
            in_app_message_key = context.in_app_message.key,
            activity = %activity.name,
            "in-app message opened"
        );
        let presented = Arc::new(PresentedMessage {
            context,
            view,
            activity,
        });
        permit.fill(Arc::clone(&presented));
        self.event_handler
            .handle(self, &presented, InAppMessageEvent::Impression);
        true
    }

    /// Close the visible message; no-op when idle.
    ///
    /// Returns whether a message was closed.
    pub fn close(&self) -> bool {
        let Some(presented) = self.slot.release() else {
            return false;
        };
        presented.view.close();
        info!(dispatch_id = %presented.context.dispatch_id, "in-app message closed");
        self.event_handler
            .handle(self, &presented, InAppMessageEvent::Close);
        true
    }

    /// Route a click on `area` of the visible message.
    ///
    /// `index` selects the button or image and is ignored for other areas.
    /// Clicks on areas without an action, or while idle, are ignored.
    pub fn click(&self, area: ActionArea, index: usize) {
        let Some(presented) = self.slot.current() else {
            debug!("click without a presented in-app message");
            return;
        };
        let Some((action, text)) = presented.action_for(area, index) else {
            debug!(area = area.as_str(), index, "no action bound to clicked area");
            return;
        };
        self.event_handler
            .handle(self, &presented, InAppMessageEvent::Action { action, area, text });
    }

    /// The visible message, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<PresentedMessage>> {
        self.slot.current()
    }

    /// Whether a message is visible.
    #[must_use]
    pub fn is_presenting(&self) -> bool {
        self.slot.current().is_some()
    }
}
