#![allow(dead_code)]

//! Shared fakes and fixtures for pipeline integration tests.
//!
//! Every collaborator trait gets a small recording fake so individual test
//! modules can flip live conditions and assert on calls rather than build
//! boilerplate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Map;

use inapp_dispatch::evaluation::identifier::UserIdentifierChecker;
use inapp_dispatch::evaluation::{Evaluation, Evaluator, LayoutEvaluation};
use inapp_dispatch::deliver::DeliverProcessor;
use inapp_dispatch::models::delivery::{PresentResponse, PresentationContext};
use inapp_dispatch::models::event::{Event, TrackEvent};
use inapp_dispatch::models::message::{
    Action, ActionType, Button, CloseButton, DisplayType, EvaluateContext, EventTrigger,
    InAppMessage, Message, MessageText, TriggerDelay, TriggerRule,
};
use inapp_dispatch::models::schedule::{Delay, Schedule};
use inapp_dispatch::models::user::User;
use inapp_dispatch::models::workspace::Workspace;
use inapp_dispatch::platform::workspace::SnapshotWorkspaceFetcher;
use inapp_dispatch::platform::{
    Activity, ActivityProvider, ActivityState, Tracker, UriOpener, UserManager,
};
use inapp_dispatch::presenter::ui::{InAppMessageView, ViewFactory};
use inapp_dispatch::presenter::InAppMessagePresenter;
use inapp_dispatch::schedule::delay::{DelayScheduler, DelayTask};
use inapp_dispatch::{AppError, Result};

// ─── Fixtures ─────────────────────────────────────────────────────────

/// A modal variant with one close button and an X button.
pub fn modal_message() -> Message {
    Message {
        variation_key: None,
        lang: "en".into(),
        display_type: DisplayType::Modal,
        text: Some(MessageText {
            title: "Welcome".into(),
            body: "Hello there".into(),
        }),
        buttons: vec![Button {
            text: "Close".into(),
            action: Action::new(ActionType::Close),
        }],
        images: Vec::new(),
        close_button: Some(CloseButton {
            action: Action::new(ActionType::Close),
        }),
        action: None,
    }
}

/// Message `id` (key `id * 10`) triggered by `event_key`.
pub fn in_app_message(id: i64, event_key: &str) -> InAppMessage {
    InAppMessage {
        id,
        key: id * 10,
        event_trigger: EventTrigger {
            rules: vec![TriggerRule {
                event_key: event_key.into(),
                targets: Vec::new(),
            }],
            delay: TriggerDelay::Immediate,
        },
        evaluate_context: EvaluateContext::default(),
        messages: vec![modal_message()],
    }
}

/// Same as [`in_app_message`] with delivery-time evaluation enabled.
pub fn at_deliver_time(mut message: InAppMessage) -> InAppMessage {
    message.evaluate_context.at_deliver_time = true;
    message
}

/// Same as [`in_app_message`] delayed by `millis`.
pub fn delayed_by(mut message: InAppMessage, millis: u64) -> InAppMessage {
    message.event_trigger.delay = TriggerDelay::After {
        duration_millis: millis,
    };
    message
}

/// Workspace holding `messages` in order.
pub fn workspace(messages: Vec<InAppMessage>) -> Workspace {
    Workspace {
        in_app_messages: messages,
    }
}

/// The default test user.
pub fn test_user() -> User {
    User::with_device_id("device-1").user_id("user-1")
}

/// Track event `key` for the default test user at `timestamp`.
pub fn track_event(key: &str, timestamp: DateTime<Utc>) -> TrackEvent {
    TrackEvent::new(Event::new(key), test_user(), timestamp)
}

/// Triggered schedule for `message` owned by the default test user.
pub fn schedule_for(message: &InAppMessage, started_at: DateTime<Utc>) -> Schedule {
    Schedule::triggered(
        message,
        test_user().identifiers,
        None,
        "IN_APP_TARGET".into(),
        started_at,
    )
}

// ─── Platform fakes ───────────────────────────────────────────────────

/// Activity provider whose state tests can flip.
pub struct FakeActivityProvider {
    state: Mutex<ActivityState>,
}

impl FakeActivityProvider {
    pub fn active() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ActivityState::Active),
        })
    }

    pub fn set(&self, state: ActivityState) {
        *self.state.lock().unwrap() = state;
    }
}

impl ActivityProvider for FakeActivityProvider {
    fn current_state(&self) -> ActivityState {
        *self.state.lock().unwrap()
    }

    fn current_activity(&self) -> Option<Activity> {
        match self.current_state() {
            ActivityState::Active => Some(Activity::new("MainActivity")),
            ActivityState::Inactive => None,
        }
    }
}

/// User manager returning a settable user.
pub struct FakeUserManager {
    user: Mutex<User>,
}

impl FakeUserManager {
    pub fn new(user: User) -> Arc<Self> {
        Arc::new(Self {
            user: Mutex::new(user),
        })
    }

    pub fn set(&self, user: User) {
        *self.user.lock().unwrap() = user;
    }
}

impl UserManager for FakeUserManager {
    fn resolve(&self) -> User {
        self.user.lock().unwrap().clone()
    }
}

/// Evaluator with switchable answers that counts `evaluate` calls.
pub struct FakeEvaluator {
    pub matches: Mutex<bool>,
    pub evaluation: Mutex<Evaluation>,
    pub fail_layout: Mutex<bool>,
    pub evaluate_calls: AtomicUsize,
}

impl FakeEvaluator {
    pub fn eligible() -> Arc<Self> {
        Arc::new(Self {
            matches: Mutex::new(true),
            evaluation: Mutex::new(Evaluation::eligible("IN_APP_TARGET")),
            fail_layout: Mutex::new(false),
            evaluate_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_evaluation(&self, evaluation: Evaluation) {
        *self.evaluation.lock().unwrap() = evaluation;
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }
}

impl Evaluator for FakeEvaluator {
    fn matches_trigger(
        &self,
        _workspace: &Workspace,
        _in_app_message: &InAppMessage,
        _rule: &TriggerRule,
        _event: &TrackEvent,
    ) -> Result<bool> {
        Ok(*self.matches.lock().unwrap())
    }

    fn evaluate(
        &self,
        _workspace: &Workspace,
        _in_app_message: &InAppMessage,
        _user: &User,
        _timestamp: DateTime<Utc>,
    ) -> Result<Evaluation> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.evaluation.lock().unwrap().clone())
    }

    fn evaluate_layout(
        &self,
        _workspace: &Workspace,
        in_app_message: &InAppMessage,
        _user: &User,
    ) -> Result<LayoutEvaluation> {
        if *self.fail_layout.lock().unwrap() {
            return Err(AppError::Evaluation("layout unavailable".into()));
        }
        Ok(LayoutEvaluation {
            message: in_app_message.messages[0].clone(),
            reason: "DEFAULT".into(),
            properties: Map::new(),
        })
    }
}

/// Presenter that records contexts and can be told to fail or panic.
#[derive(Default)]
pub struct RecordingPresenter {
    pub presented: Mutex<Vec<PresentationContext>>,
    pub fail: Mutex<bool>,
    pub panic_next: Mutex<bool>,
}

impl RecordingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let presenter = Self::default();
        *presenter.fail.lock().unwrap() = true;
        Arc::new(presenter)
    }

    /// Panics on the first `present`, records afterwards.
    pub fn panicking_once() -> Arc<Self> {
        let presenter = Self::default();
        *presenter.panic_next.lock().unwrap() = true;
        Arc::new(presenter)
    }

    pub fn count(&self) -> usize {
        self.presented.lock().unwrap().len()
    }
}

impl InAppMessagePresenter for RecordingPresenter {
    fn present(&self, context: PresentationContext) -> Result<PresentResponse> {
        if std::mem::take(&mut *self.panic_next.lock().unwrap()) {
            panic!("renderer crashed");
        }
        if *self.fail.lock().unwrap() {
            return Err(AppError::Present("view inflation failed".into()));
        }
        self.presented.lock().unwrap().push(context.clone());
        Ok(PresentResponse {
            dispatch_id: context.dispatch_id.clone(),
            context,
        })
    }
}

/// Tracker recording every event key.
#[derive(Default)]
pub struct RecordingTracker {
    pub events: Mutex<Vec<Event>>,
}

impl RecordingTracker {
    pub fn keys(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.key.clone())
            .collect()
    }
}

impl Tracker for RecordingTracker {
    fn track(&self, event: Event, _user: &User, _timestamp: DateTime<Utc>) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Link opener recording URIs; fails when `fail` is set.
#[derive(Default)]
pub struct RecordingUriOpener {
    pub opened: Mutex<Vec<String>>,
    pub fail: Mutex<bool>,
}

impl UriOpener for RecordingUriOpener {
    fn open(&self, uri: &str) -> Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::Present(format!("no handler for {uri}")));
        }
        self.opened.lock().unwrap().push(uri.to_owned());
        Ok(())
    }
}

/// View counting opens and closes across all instances.
pub struct CountingView {
    pub dispatch_id: String,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl InAppMessageView for CountingView {
    fn open(&self, _activity: &Activity) -> Result<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory for [`CountingView`]s sharing its counters.
#[derive(Default)]
pub struct CountingViewFactory {
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl CountingViewFactory {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ViewFactory for CountingViewFactory {
    fn create(&self, context: &PresentationContext) -> Result<Arc<dyn InAppMessageView>> {
        Ok(Arc::new(CountingView {
            dispatch_id: context.dispatch_id.clone(),
            opens: Arc::clone(&self.opens),
            closes: Arc::clone(&self.closes),
        }))
    }
}

/// Delay scheduler that never fires on its own; tests fire by hand.
#[derive(Default)]
pub struct ManualDelayScheduler {
    pub armed: Mutex<Vec<Delay>>,
    pub cancelled: Arc<AtomicUsize>,
}

struct ManualTask {
    cancelled: Arc<AtomicUsize>,
}

impl DelayTask for ManualTask {
    fn cancel(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

impl DelayScheduler for ManualDelayScheduler {
    fn schedule(&self, delay: &Delay) -> Box<dyn DelayTask> {
        self.armed.lock().unwrap().push(delay.clone());
        Box::new(ManualTask {
            cancelled: Arc::clone(&self.cancelled),
        })
    }
}

// ─── Assembled pipeline ───────────────────────────────────────────────

/// Deliver processor plus handles on every fake it uses.
pub struct DeliverHarness {
    pub activity: Arc<FakeActivityProvider>,
    pub fetcher: Arc<SnapshotWorkspaceFetcher>,
    pub users: Arc<FakeUserManager>,
    pub evaluator: Arc<FakeEvaluator>,
    pub presenter: Arc<RecordingPresenter>,
    pub processor: Arc<DeliverProcessor>,
}

impl DeliverHarness {
    /// Harness over `workspace` with an active screen and eligible user.
    pub fn new(workspace: Option<Workspace>) -> Self {
        Self::with_presenter(workspace, RecordingPresenter::new())
    }

    /// Harness using a specific presenter.
    pub fn with_presenter(
        workspace: Option<Workspace>,
        presenter: Arc<RecordingPresenter>,
    ) -> Self {
        let activity = FakeActivityProvider::active();
        let fetcher = Arc::new(match workspace {
            Some(ws) => SnapshotWorkspaceFetcher::new(ws),
            None => SnapshotWorkspaceFetcher::empty(),
        });
        let users = FakeUserManager::new(test_user());
        let evaluator = FakeEvaluator::eligible();
        let processor = Arc::new(DeliverProcessor::new(
            activity.clone(),
            fetcher.clone(),
            users.clone(),
            Arc::new(UserIdentifierChecker),
            evaluator.clone(),
            presenter.clone(),
        ));
        Self {
            activity,
            fetcher,
            users,
            evaluator,
            presenter,
            processor,
        }
    }
}
