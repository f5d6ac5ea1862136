//! Presentation of delivered messages.
//!
//! [`ViewPresenter`] is the egress of the deliver pipeline: it acknowledges
//! the hand-off immediately and marshals the actual opening onto the UI
//! thread, where [`ui::InAppMessageUi`] enforces that at most one message
//! is visible at a time.

pub mod action;
pub mod event;
pub mod slot;
pub mod ui;

use std::sync::Arc;

use tracing::debug;

use crate::models::delivery::{PresentResponse, PresentationContext};
use crate::platform::UiDispatcher;
use crate::Result;

use self::ui::InAppMessageUi;

/// Hands a validated dispatch to the rendering layer.
pub trait InAppMessagePresenter: Send + Sync {
    /// Present `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if the hand-off itself fails; the deliver pipeline
    /// maps it to an exception outcome.
    fn present(&self, context: PresentationContext) -> Result<PresentResponse>;
}

/// Presenter opening messages through the singleton UI gate.
pub struct ViewPresenter {
    ui: Arc<InAppMessageUi>,
    dispatcher: Arc<dyn UiDispatcher>,
}

impl ViewPresenter {
    /// Presenter opening through `ui` on `dispatcher`'s thread.
    #[must_use]
    pub fn new(ui: Arc<InAppMessageUi>, dispatcher: Arc<dyn UiDispatcher>) -> Self {
        Self { ui, dispatcher }
    }
}

impl InAppMessagePresenter for ViewPresenter {
    fn present(&self, context: PresentationContext) -> Result<PresentResponse> {
        let response = PresentResponse {
            dispatch_id: context.dispatch_id.clone(),
            context: context.clone(),
        };

        let ui = Arc::clone(&self.ui);
        self.dispatcher.dispatch(Box::new(move || {
            let dispatch_id = context.dispatch_id.clone();
            if !ui.open(context) {
                debug!(%dispatch_id, "in-app message not opened");
            }
        }));

        Ok(response)
    }
}
