//! Interaction events of a presented message.
//!
//! Every event is tracked first, then processed: impressions are recorded
//! for frequency capping, actions are dispatched to an action handler,
//! closes need nothing further.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use super::action::ActionHandlerFactory;
use super::ui::{InAppMessageUi, PresentedMessage};
use crate::models::delivery::PresentationContext;
use crate::models::event::Event;
use crate::models::message::{Action, ActionArea, DisplayType};
use crate::platform::Tracker;
use crate::storage::{ImpressionRecord, ImpressionStorage};

/// Analytics key of impression events.
pub const IMPRESSION_EVENT_KEY: &str = "$in_app_impression";
/// Analytics key of close events.
pub const CLOSE_EVENT_KEY: &str = "$in_app_close";
/// Analytics key of action events.
pub const ACTION_EVENT_KEY: &str = "$in_app_action";

/// Something that happened to the presented message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InAppMessageEvent {
    /// The message became visible.
    Impression,
    /// The message was closed.
    Close,
    /// The user clicked an area with an action.
    Action {
        /// Bound action.
        action: Action,
        /// Clicked area.
        area: ActionArea,
        /// Button label, for button clicks.
        text: Option<String>,
    },
}

impl InAppMessageEvent {
    /// Analytics event for this interaction on `context`.
    #[must_use]
    pub fn to_event(&self, context: &PresentationContext) -> Event {
        let key = match self {
            Self::Impression => IMPRESSION_EVENT_KEY,
            Self::Close => CLOSE_EVENT_KEY,
            Self::Action { .. } => ACTION_EVENT_KEY,
        };

        let mut event = Event::new(key)
            .property("in_app_message_id", context.in_app_message.id)
            .property("in_app_message_key", context.in_app_message.key)
            .property("in_app_message_display_type", display_type_name(context))
            .property("dispatch_id", context.dispatch_id.clone())
            .property("decision_reason", context.decision_reason.clone());

        if let Some(ref variation_key) = context.message.variation_key {
            event = event.property("variation_key", variation_key.clone());
        }
        for (name, value) in &context.properties {
            event.properties.insert(name.clone(), value.clone());
        }

        if let Self::Action { action, area, text } = self {
            event = event
                .property("action_type", action.action_type.as_str())
                .property("action_area", area.as_str())
                .property(
                    "action_value",
                    action.value.clone().map_or(Value::Null, Value::String),
                )
                .property(
                    "button_text",
                    text.clone().map_or(Value::Null, Value::String),
                );
        }

        event
    }
}

fn display_type_name(context: &PresentationContext) -> &'static str {
    match context.message.display_type {
        DisplayType::Modal => "MODAL",
        DisplayType::Banner => "BANNER",
        DisplayType::BottomSheet => "BOTTOM_SHEET",
    }
}

/// Tracks and processes interaction events.
pub struct InAppMessageEventHandler {
    tracker: Arc<dyn Tracker>,
    impressions: Arc<dyn ImpressionStorage>,
    actions: ActionHandlerFactory,
}

impl InAppMessageEventHandler {
    /// Create the handler.
    #[must_use]
    pub fn new(
        tracker: Arc<dyn Tracker>,
        impressions: Arc<dyn ImpressionStorage>,
        actions: ActionHandlerFactory,
    ) -> Self {
        Self {
            tracker,
            impressions,
            actions,
        }
    }

    /// Track `event`, then process it.
    pub fn handle(
        &self,
        ui: &InAppMessageUi,
        presented: &PresentedMessage,
        event: InAppMessageEvent,
    ) {
        let context = &presented.context;
        let now = Utc::now();

        if let Err(err) = self.tracker.track(event.to_event(context), &context.user, now) {
            warn!(%err, dispatch_id = %context.dispatch_id, "failed to track in-app message event");
        }

        match event {
            InAppMessageEvent::Impression => self.impressions.record(
                context.in_app_message.key,
                ImpressionRecord {
                    identifiers: context.user.identifiers.clone(),
                    timestamp: now,
                },
            ),
            InAppMessageEvent::Close => {}
            InAppMessageEvent::Action { action, .. } => self.actions.handle(ui, presented, &action),
        }
    }
}
