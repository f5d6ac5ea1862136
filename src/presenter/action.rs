//! Handlers for message actions (close, links, hide).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use super::ui::{InAppMessageUi, PresentedMessage};
use crate::models::message::{Action, ActionType};
use crate::platform::UriOpener;
use crate::storage::HiddenStorage;
use crate::{AppError, Result};

/// Performs one kind of action.
pub trait ActionHandler: Send + Sync {
    /// Whether this handler performs `action`.
    fn supports(&self, action: &Action) -> bool;

    /// Perform `action` on the presented message.
    ///
    /// # Errors
    ///
    /// Returns an error if the action could not be carried out.
    fn handle(
        &self,
        ui: &InAppMessageUi,
        presented: &PresentedMessage,
        action: &Action,
    ) -> Result<()>;
}

/// Closes the message.
pub struct CloseActionHandler;

impl ActionHandler for CloseActionHandler {
    fn supports(&self, action: &Action) -> bool {
        action.action_type == ActionType::Close
    }

    fn handle(
        &self,
        ui: &InAppMessageUi,
        _presented: &PresentedMessage,
        _action: &Action,
    ) -> Result<()> {
        ui.close();
        Ok(())
    }
}

/// Opens the action's link externally; closes the message if that fails.
pub struct LinkActionHandler {
    opener: Arc<dyn UriOpener>,
}

impl LinkActionHandler {
    /// Handler opening links through `opener`.
    #[must_use]
    pub fn new(opener: Arc<dyn UriOpener>) -> Self {
        Self { opener }
    }
}

impl ActionHandler for LinkActionHandler {
    fn supports(&self, action: &Action) -> bool {
        action.action_type == ActionType::WebLink
    }

    fn handle(
        &self,
        ui: &InAppMessageUi,
        _presented: &PresentedMessage,
        action: &Action,
    ) -> Result<()> {
        if let Err(err) = open_link(self.opener.as_ref(), action) {
            ui.close();
            return Err(err);
        }
        Ok(())
    }
}

/// Opens the action's link externally and closes the message.
pub struct LinkAndCloseActionHandler {
    opener: Arc<dyn UriOpener>,
}

impl LinkAndCloseActionHandler {
    /// Handler opening links through `opener`.
    #[must_use]
    pub fn new(opener: Arc<dyn UriOpener>) -> Self {
        Self { opener }
    }
}

impl ActionHandler for LinkAndCloseActionHandler {
    fn supports(&self, action: &Action) -> bool {
        action.action_type == ActionType::LinkAndClose
    }

    fn handle(
        &self,
        ui: &InAppMessageUi,
        _presented: &PresentedMessage,
        action: &Action,
    ) -> Result<()> {
        let opened = open_link(self.opener.as_ref(), action);
        ui.close();
        opened
    }
}

/// Suppresses the message for a fixed window, then closes it.
pub struct HiddenActionHandler {
    storage: Arc<dyn HiddenStorage>,
    duration: TimeDelta,
}

impl HiddenActionHandler {
    /// Handler writing `duration`-long windows to `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn HiddenStorage>, duration: Duration) -> Self {
        Self {
            storage,
            duration: TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX),
        }
    }
}

impl ActionHandler for HiddenActionHandler {
    fn supports(&self, action: &Action) -> bool {
        action.action_type == ActionType::Hidden
    }

    fn handle(
        &self,
        ui: &InAppMessageUi,
        presented: &PresentedMessage,
        _action: &Action,
    ) -> Result<()> {
        let key = presented.context.in_app_message.key;
        let until = Utc::now()
            .checked_add_signed(self.duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.storage.put(key, until);
        info!(in_app_message_key = key, %until, "in-app message hidden");
        ui.close();
        Ok(())
    }
}

fn open_link(opener: &dyn UriOpener, action: &Action) -> Result<()> {
    let uri = action
        .value
        .as_deref()
        .ok_or_else(|| AppError::NotFound("link action without a value".into()))?;
    opener.open(uri)
}

/// Dispatches an action to the first handler that supports it.
pub struct ActionHandlerFactory {
    handlers: Vec<Box<dyn ActionHandler>>,
}

impl ActionHandlerFactory {
    /// Factory over `handlers`, consulted in order.
    #[must_use]
    pub fn new(handlers: Vec<Box<dyn ActionHandler>>) -> Self {
        Self { handlers }
    }

    /// Close, link, link-and-close, and hidden handlers.
    #[must_use]
    pub fn standard(
        opener: &Arc<dyn UriOpener>,
        hidden: Arc<dyn HiddenStorage>,
        hidden_duration: Duration,
    ) -> Self {
        let handlers: Vec<Box<dyn ActionHandler>> = vec![
            Box::new(CloseActionHandler),
            Box::new(LinkActionHandler::new(Arc::clone(opener))),
            Box::new(LinkAndCloseActionHandler::new(Arc::clone(opener))),
            Box::new(HiddenActionHandler::new(hidden, hidden_duration)),
        ];
        Self::new(handlers)
    }

    /// Perform `action`; unsupported actions are ignored.
    pub fn handle(&self, ui: &InAppMessageUi, presented: &PresentedMessage, action: &Action) {
        let Some(handler) = self
            .handlers
            .iter()
            .find(|handler| handler.supports(action))
        else {
            debug!(action_type = action.action_type.as_str(), "no handler for action");
            return;
        };
        if let Err(err) = handler.handle(ui, presented, action) {
            warn!(
                %err,
                action_type = action.action_type.as_str(),
                dispatch_id = %presented.context.dispatch_id,
                "in-app message action failed"
            );
        }
    }
}
