//! In-app message descriptors loaded from the workspace snapshot.
//!
//! These types are read-only inside the pipeline: the workspace owner
//! creates them, the trigger matcher and deliver processor only look them up.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A configured in-app message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct InAppMessage {
    /// Workspace-unique id.
    pub id: i64,
    /// Stable key reported in analytics.
    pub key: i64,
    /// Event rules that can trigger this message.
    pub event_trigger: EventTrigger,
    /// When eligibility must be evaluated.
    #[serde(default)]
    pub evaluate_context: EvaluateContext,
    /// Renderable variants; layout evaluation picks one.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl InAppMessage {
    /// Rules whose event key equals `event_key`, in declaration order.
    pub fn rules_for<'a>(&'a self, event_key: &'a str) -> impl Iterator<Item = &'a TriggerRule> {
        self.event_trigger
            .rules
            .iter()
            .filter(move |rule| rule.event_key == event_key)
    }
}

/// Trigger configuration of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct EventTrigger {
    /// Triggering rules.
    pub rules: Vec<TriggerRule>,
    /// How long to wait between the trigger and delivery.
    #[serde(default)]
    pub delay: TriggerDelay,
}

/// A single event rule with opaque targeting conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TriggerRule {
    /// Event key that activates this rule.
    pub event_key: String,
    /// Targeting conditions interpreted by the evaluator.
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// Opaque targeting condition; its language belongs to the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Target(pub Value);

/// Wait between trigger and delivery.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerDelay {
    /// Deliver as soon as the trigger fires.
    #[default]
    Immediate,
    /// Deliver after a fixed duration.
    After {
        /// Wait in milliseconds.
        duration_millis: u64,
    },
}

impl TriggerDelay {
    /// Deliver time for a trigger that fired at `started_at`.
    #[must_use]
    pub fn deliver_at(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Immediate => started_at,
            Self::After { duration_millis } => {
                let millis = i64::try_from(*duration_millis).unwrap_or(i64::MAX);
                Duration::try_milliseconds(millis)
                    .and_then(|wait| started_at.checked_add_signed(wait))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            }
        }
    }
}

/// Controls re-evaluation at delivery time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct EvaluateContext {
    /// Re-run eligibility at delivery instead of trusting the trigger decision.
    #[serde(default)]
    pub at_deliver_time: bool,
}

/// One renderable variant of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Message {
    /// Experiment variation this variant belongs to, if any.
    #[serde(default)]
    pub variation_key: Option<String>,
    /// Language tag.
    pub lang: String,
    /// Display type of the variant.
    pub display_type: DisplayType,
    /// Title and body copy.
    #[serde(default)]
    pub text: Option<MessageText>,
    /// Buttons in display order.
    #[serde(default)]
    pub buttons: Vec<Button>,
    /// Images in display order.
    #[serde(default)]
    pub images: Vec<Image>,
    /// Dedicated close (X) button.
    #[serde(default)]
    pub close_button: Option<CloseButton>,
    /// Action for a click on the message body.
    #[serde(default)]
    pub action: Option<Action>,
}

/// How a variant is rendered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplayType {
    /// Centered dialog.
    Modal,
    /// Top or bottom strip.
    Banner,
    /// Sheet anchored to the bottom edge.
    BottomSheet,
}

/// Message copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MessageText {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
}

/// A labelled button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Button {
    /// Button label.
    pub text: String,
    /// Action on click.
    pub action: Action,
}

/// An image, optionally clickable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Image {
    /// Image location.
    pub image_path: String,
    /// Action on click.
    #[serde(default)]
    pub action: Option<Action>,
}

/// The X button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CloseButton {
    /// Action on click.
    pub action: Action,
}

/// What happens when the user interacts with part of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Action {
    /// Action kind.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Link target for link actions.
    #[serde(default)]
    pub value: Option<String>,
}

impl Action {
    /// Action with no value.
    #[must_use]
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            value: None,
        }
    }

    /// Link action pointing at `uri`.
    #[must_use]
    pub fn link(action_type: ActionType, uri: impl Into<String>) -> Self {
        Self {
            action_type,
            value: Some(uri.into()),
        }
    }
}

/// Supported action kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Close the message.
    Close,
    /// Open a link externally, keep the message open.
    WebLink,
    /// Open a link externally and close the message.
    LinkAndClose,
    /// Suppress the message for a while and close it.
    Hidden,
}

impl ActionType {
    /// Analytics name of the action type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Close => "CLOSE",
            Self::WebLink => "WEB_LINK",
            Self::LinkAndClose => "LINK_AND_CLOSE",
            Self::Hidden => "HIDDEN",
        }
    }
}

/// Part of the rendered message that received the interaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionArea {
    /// The message body.
    Message,
    /// A button.
    Button,
    /// An image.
    Image,
    /// The X button.
    XButton,
}

impl ActionArea {
    /// Analytics name of the area.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "MESSAGE",
            Self::Button => "BUTTON",
            Self::Image => "IMAGE",
            Self::XButton => "X_BUTTON",
        }
    }
}
