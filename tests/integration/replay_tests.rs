//! Integration tests for scripted replay through the full pipeline.

use std::io::Cursor;
use std::sync::Arc;

use inapp_dispatch::app::{Collaborators, InAppMessaging};
use inapp_dispatch::evaluation::reference::HiddenAwareEvaluator;
use inapp_dispatch::platform::ui_thread::InlineDispatcher;
use inapp_dispatch::platform::workspace::SnapshotWorkspaceFetcher;
use inapp_dispatch::presenter::event::{ACTION_EVENT_KEY, CLOSE_EVENT_KEY, IMPRESSION_EVENT_KEY};
use inapp_dispatch::replay::{
    replay, ForegroundActivity, LogTracker, LogUriOpener, LogViewFactory, ReplaySummary,
    SessionUserManager,
};
use inapp_dispatch::storage::{InMemoryHiddenStorage, InMemoryImpressionStorage};
use inapp_dispatch::{AppError, GlobalConfig};

use super::test_helpers::{delayed_by, in_app_message, workspace};

struct Replayer {
    messaging: InAppMessaging,
    users: Arc<SessionUserManager>,
    tracker: Arc<LogTracker>,
}

fn start(messages: Vec<inapp_dispatch::models::message::InAppMessage>) -> Replayer {
    let users = Arc::new(SessionUserManager::default());
    let tracker = Arc::new(LogTracker::default());
    let hidden = Arc::new(InMemoryHiddenStorage::default());
    let collaborators = Collaborators {
        workspace_fetcher: Arc::new(SnapshotWorkspaceFetcher::new(workspace(messages))),
        activity_provider: Arc::new(ForegroundActivity::new("MainActivity")),
        user_manager: users.clone(),
        evaluator: Arc::new(HiddenAwareEvaluator::new(hidden.clone())),
        tracker: tracker.clone(),
        uri_opener: Arc::new(LogUriOpener),
        view_factory: Arc::new(LogViewFactory),
        ui_dispatcher: Arc::new(InlineDispatcher),
        hidden_storage: hidden,
        impression_storage: Arc::new(InMemoryImpressionStorage::new(10)),
    };
    Replayer {
        messaging: InAppMessaging::start(&GlobalConfig::default(), collaborators).unwrap(),
        users,
        tracker,
    }
}

const USER: &str = r#"{"identifiers":{"$deviceId":"device-1","$userId":"user-1"}}"#;

#[tokio::test]
async fn script_presents_then_closes_message() {
    let replayer = start(vec![in_app_message(1, "purchase")]);
    let script = format!(
        "# open then close\n\
         {{\"type\":\"track\",\"key\":\"purchase\",\"user\":{USER}}}\n\
         \n\
         {{\"type\":\"click\",\"area\":\"x_button\"}}\n"
    );

    let summary = replay(&replayer.messaging, &replayer.users, Cursor::new(script))
        .await
        .unwrap();

    assert_eq!(summary, ReplaySummary { events: 1, clicks: 1 });
    assert!(!replayer.messaging.ui().is_presenting());
    assert_eq!(
        replayer.tracker.keys(),
        vec![
            IMPRESSION_EVENT_KEY.to_owned(),
            ACTION_EVENT_KEY.to_owned(),
            CLOSE_EVENT_KEY.to_owned(),
        ]
    );
    replayer.messaging.shutdown().await;
}

#[tokio::test]
async fn wait_lines_let_delays_fire() {
    let replayer = start(vec![delayed_by(in_app_message(1, "purchase"), 50)]);
    let script = format!(
        "{{\"type\":\"track\",\"key\":\"purchase\",\"user\":{USER}}}\n\
         {{\"type\":\"wait\",\"millis\":400}}\n"
    );

    replay(&replayer.messaging, &replayer.users, Cursor::new(script))
        .await
        .unwrap();

    assert!(replayer.messaging.ui().is_presenting());
    replayer.messaging.shutdown().await;
}

#[tokio::test]
async fn malformed_line_reports_its_number() {
    let replayer = start(Vec::new());
    let script = "{\"type\":\"wait\",\"millis\":0}\n{\"type\":\"teleport\"}\n";

    let err = replay(&replayer.messaging, &replayer.users, Cursor::new(script))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("line 2")));
    replayer.messaging.shutdown().await;
}
