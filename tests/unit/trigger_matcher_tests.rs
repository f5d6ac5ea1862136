use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map};

use inapp_dispatch::evaluation::{Evaluation, Evaluator, LayoutEvaluation};
use inapp_dispatch::models::event::{Event, TrackEvent};
use inapp_dispatch::models::message::{InAppMessage, TriggerRule};
use inapp_dispatch::models::user::User;
use inapp_dispatch::models::workspace::Workspace;
use inapp_dispatch::platform::workspace::SnapshotWorkspaceFetcher;
use inapp_dispatch::trigger::TriggerMatcher;
use inapp_dispatch::{AppError, Result};

/// Eligibility per message key; unknown keys are eligible. Rules with a
/// `{"deny": true}` target never match.
#[derive(Default)]
struct KeyedEvaluator {
    ineligible: HashMap<i64, String>,
    failing: Option<i64>,
}

impl Evaluator for KeyedEvaluator {
    fn matches_trigger(
        &self,
        _workspace: &Workspace,
        _in_app_message: &InAppMessage,
        rule: &TriggerRule,
        _event: &TrackEvent,
    ) -> Result<bool> {
        Ok(!rule.targets.iter().any(|target| target.0 == json!({"deny": true})))
    }

    fn evaluate(
        &self,
        _workspace: &Workspace,
        in_app_message: &InAppMessage,
        _user: &User,
        _timestamp: DateTime<Utc>,
    ) -> Result<Evaluation> {
        if self.failing == Some(in_app_message.key) {
            return Err(AppError::Evaluation("target service down".into()));
        }
        Ok(match self.ineligible.get(&in_app_message.key) {
            Some(reason) => Evaluation::ineligible(reason.clone()),
            None => Evaluation::eligible("IN_APP_TARGET"),
        })
    }

    fn evaluate_layout(
        &self,
        _workspace: &Workspace,
        in_app_message: &InAppMessage,
        _user: &User,
    ) -> Result<LayoutEvaluation> {
        Ok(LayoutEvaluation {
            message: in_app_message.messages[0].clone(),
            reason: "DEFAULT".into(),
            properties: Map::new(),
        })
    }
}

fn message(id: i64, event_key: &str, deny: bool) -> InAppMessage {
    let targets = if deny { json!([{"deny": true}]) } else { json!([]) };
    serde_json::from_value(json!({
        "id": id,
        "key": id * 10,
        "event_trigger": { "rules": [{ "event_key": event_key, "targets": targets }] },
        "messages": [{ "lang": "en", "display_type": "modal" }],
    }))
    .unwrap()
}

fn matcher(messages: Vec<InAppMessage>, evaluator: KeyedEvaluator) -> TriggerMatcher {
    TriggerMatcher::new(
        Arc::new(SnapshotWorkspaceFetcher::new(Workspace {
            in_app_messages: messages,
        })),
        Arc::new(evaluator),
    )
}

fn event(key: &str) -> TrackEvent {
    TrackEvent::new(
        Event::new(key),
        User::with_device_id("device-1").user_id("user-1"),
        Utc::now(),
    )
}

#[test]
fn matching_eligible_message_triggers() {
    let matcher = matcher(vec![message(1, "purchase", false)], KeyedEvaluator::default());
    let event = event("purchase");

    let trigger = matcher.determine(&event).unwrap();

    assert_eq!(trigger.in_app_message.id, 1);
    assert_eq!(trigger.reason, "IN_APP_TARGET");
    assert_eq!(trigger.event.insert_id, event.insert_id);
}

#[test]
fn no_rule_for_event_key_means_no_trigger() {
    let matcher = matcher(vec![message(1, "purchase", false)], KeyedEvaluator::default());

    assert!(matcher.determine(&event("signup")).is_none());
}

#[test]
fn first_declared_message_wins() {
    let matcher = matcher(
        vec![message(1, "purchase", false), message(2, "purchase", false)],
        KeyedEvaluator::default(),
    );

    assert_eq!(matcher.determine(&event("purchase")).unwrap().in_app_message.id, 1);
}

#[test]
fn ineligible_match_falls_through_to_next_message() {
    let mut evaluator = KeyedEvaluator::default();
    evaluator.ineligible.insert(10, "IN_APP_HIDDEN".into());
    let matcher = matcher(
        vec![message(1, "purchase", false), message(2, "purchase", false)],
        evaluator,
    );

    assert_eq!(matcher.determine(&event("purchase")).unwrap().in_app_message.id, 2);
}

#[test]
fn unmatched_targets_skip_message() {
    let matcher = matcher(
        vec![message(1, "purchase", true), message(2, "purchase", false)],
        KeyedEvaluator::default(),
    );

    assert_eq!(matcher.determine(&event("purchase")).unwrap().in_app_message.id, 2);
}

#[test]
fn missing_workspace_means_no_trigger() {
    let matcher = TriggerMatcher::new(
        Arc::new(SnapshotWorkspaceFetcher::empty()),
        Arc::new(KeyedEvaluator::default()),
    );

    assert!(matcher.determine(&event("purchase")).is_none());
}

#[test]
fn evaluator_error_drops_the_event() {
    let evaluator = KeyedEvaluator {
        failing: Some(10),
        ..KeyedEvaluator::default()
    };
    let matcher = matcher(
        vec![message(1, "purchase", false), message(2, "purchase", false)],
        evaluator,
    );

    assert!(matcher.determine(&event("purchase")).is_none());
}

#[test]
fn trigger_schedule_captures_event_context() {
    let matcher = matcher(vec![message(1, "purchase", false)], KeyedEvaluator::default());
    let event = event("purchase");
    let trigger = matcher.determine(&event).unwrap();

    let schedule = trigger.schedule(event.timestamp);

    assert_eq!(schedule.in_app_message_id, 1);
    assert_eq!(schedule.identifiers, event.user.identifiers);
    assert_eq!(schedule.decision_reason, "IN_APP_TARGET");
    let context = schedule.event_based_context.unwrap();
    assert_eq!(context.insert_id, event.insert_id);
    assert_eq!(context.event.key, "purchase");
    assert_eq!(schedule.time.deliver_at, event.timestamp);
}
