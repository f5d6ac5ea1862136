//! Session-scoped wiring of the in-app message pipeline.
//!
//! [`InAppMessaging::start`] builds every service exactly once from the
//! host's collaborators and the global configuration, then starts the
//! fired-delay consumer. The returned value owns the whole graph; there are
//! no process-wide singletons.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::GlobalConfig;
use crate::deliver::DeliverProcessor;
use crate::evaluation::identifier::{IdentifierChecker, UserIdentifierChecker};
use crate::evaluation::Evaluator;
use crate::manager::{InAppMessageManager, UserEventListener};
use crate::platform::{
    ActivityProvider, Tracker, UiDispatcher, UriOpener, UserManager, WorkspaceFetcher,
};
use crate::presenter::action::ActionHandlerFactory;
use crate::presenter::event::InAppMessageEventHandler;
use crate::presenter::ui::{InAppMessageUi, ViewFactory};
use crate::presenter::ViewPresenter;
use crate::schedule::delay::DelayManager;
use crate::schedule::determiner::ScheduleActionDeterminer;
use crate::schedule::processor::ScheduleProcessor;
use crate::schedule::scheduler::SchedulerFactory;
use crate::schedule::timer::{spawn_delay_consumer, TokioDelayScheduler};
use crate::storage::{HiddenStorage, ImpressionStorage};
use crate::trigger::TriggerMatcher;
use crate::{AppError, Result};

/// Host-provided collaborators.
pub struct Collaborators {
    /// Workspace snapshot source.
    pub workspace_fetcher: Arc<dyn WorkspaceFetcher>,
    /// Foreground activity tracking.
    pub activity_provider: Arc<dyn ActivityProvider>,
    /// Current user resolution.
    pub user_manager: Arc<dyn UserManager>,
    /// Targeting engine.
    pub evaluator: Arc<dyn Evaluator>,
    /// Analytics emission.
    pub tracker: Arc<dyn Tracker>,
    /// External link handling.
    pub uri_opener: Arc<dyn UriOpener>,
    /// Platform view creation.
    pub view_factory: Arc<dyn ViewFactory>,
    /// UI-thread marshalling.
    pub ui_dispatcher: Arc<dyn UiDispatcher>,
    /// Suppression windows.
    pub hidden_storage: Arc<dyn HiddenStorage>,
    /// Impression history.
    pub impression_storage: Arc<dyn ImpressionStorage>,
}

/// The running pipeline for one app session.
pub struct InAppMessaging {
    manager: Arc<InAppMessageManager>,
    ui: Arc<InAppMessageUi>,
    delay_manager: Arc<DelayManager>,
    processor: Arc<ScheduleProcessor>,
    cancel: CancellationToken,
    consumer: Option<JoinHandle<()>>,
}

impl InAppMessaging {
    /// Wire the pipeline and start the fired-delay consumer.
    ///
    /// Must be called from within a tokio runtime; delay timers are spawned
    /// on it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when called outside a tokio runtime.
    pub fn start(config: &GlobalConfig, collaborators: Collaborators) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|err| AppError::Config(format!("no tokio runtime: {err}")))?;

        let Collaborators {
            workspace_fetcher,
            activity_provider,
            user_manager,
            evaluator,
            tracker,
            uri_opener,
            view_factory,
            ui_dispatcher,
            hidden_storage,
            impression_storage,
        } = collaborators;

        let actions =
            ActionHandlerFactory::standard(&uri_opener, hidden_storage, config.hidden_duration());
        let event_handler = InAppMessageEventHandler::new(tracker, impression_storage, actions);
        let ui = Arc::new(InAppMessageUi::new(
            Arc::clone(&activity_provider),
            view_factory,
            event_handler,
        ));
        let presenter = Arc::new(ViewPresenter::new(Arc::clone(&ui), ui_dispatcher));

        let identifier_checker: Arc<dyn IdentifierChecker> = Arc::new(UserIdentifierChecker);
        let deliver_processor = Arc::new(DeliverProcessor::new(
            activity_provider,
            Arc::clone(&workspace_fetcher),
            user_manager,
            identifier_checker,
            Arc::clone(&evaluator),
            presenter,
        ));

        let (fired_tx, fired_rx) = mpsc::channel(config.delay.channel_capacity);
        let delay_manager = Arc::new(DelayManager::new(Arc::new(TokioDelayScheduler::new(
            runtime, fired_tx,
        ))));

        let processor = Arc::new(ScheduleProcessor::new(
            ScheduleActionDeterminer::new(config.expiration_threshold()),
            SchedulerFactory::standard(&deliver_processor, &delay_manager),
        ));

        let matcher = TriggerMatcher::new(workspace_fetcher, evaluator);
        let manager = Arc::new(InAppMessageManager::new(matcher, Arc::clone(&processor)));

        let cancel = CancellationToken::new();
        let consumer = spawn_delay_consumer(fired_rx, Arc::clone(&processor), cancel.clone());
        info!("in-app messaging started");

        Ok(Self {
            manager,
            ui,
            delay_manager,
            processor,
            cancel,
            consumer: Some(consumer),
        })
    }

    /// Listener to register with the analytics pipeline.
    #[must_use]
    pub fn listener(&self) -> Arc<dyn UserEventListener> {
        Arc::clone(&self.manager) as Arc<dyn UserEventListener>
    }

    /// The singleton UI gate.
    #[must_use]
    pub fn ui(&self) -> &Arc<InAppMessageUi> {
        &self.ui
    }

    /// Pending delay registry.
    #[must_use]
    pub fn delay_manager(&self) -> &Arc<DelayManager> {
        &self.delay_manager
    }

    /// Schedule request entry point.
    #[must_use]
    pub fn processor(&self) -> &Arc<ScheduleProcessor> {
        &self.processor
    }

    /// Stop the consumer, then cancel pending delays.
    ///
    /// The consumer is stopped first so a delay that fires during shutdown
    /// is never processed after its registry entry is gone.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.consumer.take() {
            let _ = handle.await;
        }
        let cancelled = self.delay_manager.cancel_all();
        info!(cancelled, "in-app messaging stopped");
    }
}

impl Drop for InAppMessaging {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
