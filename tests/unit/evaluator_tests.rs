use std::sync::Arc;

use chrono::{TimeDelta, Utc};

use inapp_dispatch::evaluation::reference::HiddenAwareEvaluator;
use inapp_dispatch::evaluation::Evaluator;
use inapp_dispatch::models::message::InAppMessage;
use inapp_dispatch::models::user::User;
use inapp_dispatch::models::workspace::Workspace;
use inapp_dispatch::storage::{
    HiddenStorage, ImpressionRecord, ImpressionStorage, InMemoryHiddenStorage,
    InMemoryImpressionStorage,
};
use inapp_dispatch::AppError;

fn message(with_variant: bool) -> InAppMessage {
    let variants = if with_variant {
        r#"[{"lang":"en","display_type":"modal"}]"#
    } else {
        "[]"
    };
    serde_json::from_str(&format!(
        r#"{{"id":1,"key":10,"event_trigger":{{"rules":[{{"event_key":"purchase"}}]}},"messages":{variants}}}"#
    ))
    .unwrap()
}

fn evaluator() -> (HiddenAwareEvaluator, Arc<InMemoryHiddenStorage>) {
    let hidden = Arc::new(InMemoryHiddenStorage::default());
    (HiddenAwareEvaluator::new(hidden.clone()), hidden)
}

#[test]
fn visible_message_is_eligible() {
    let (evaluator, _) = evaluator();
    let user = User::with_device_id("device-1");

    let evaluation = evaluator
        .evaluate(&Workspace::default(), &message(true), &user, Utc::now())
        .unwrap();

    assert!(evaluation.is_eligible);
    assert_eq!(evaluation.reason, "IN_APP_TARGET");
}

#[test]
fn hidden_message_is_ineligible() {
    let (evaluator, hidden) = evaluator();
    let now = Utc::now();
    hidden.put(10, now + TimeDelta::hours(1));

    let evaluation = evaluator
        .evaluate(
            &Workspace::default(),
            &message(true),
            &User::default(),
            now,
        )
        .unwrap();

    assert!(!evaluation.is_eligible);
    assert_eq!(evaluation.reason, "IN_APP_HIDDEN");
}

fn capped_evaluator(cap: usize) -> (HiddenAwareEvaluator, Arc<InMemoryImpressionStorage>) {
    let impressions = Arc::new(InMemoryImpressionStorage::new(10));
    let evaluator = HiddenAwareEvaluator::new(Arc::new(InMemoryHiddenStorage::default()))
        .with_frequency_cap(impressions.clone(), cap);
    (evaluator, impressions)
}

fn seen_by(user: &User) -> ImpressionRecord {
    ImpressionRecord {
        identifiers: user.identifiers.clone(),
        timestamp: Utc::now(),
    }
}

#[test]
fn message_shown_cap_times_to_device_is_ineligible() {
    let (evaluator, impressions) = capped_evaluator(2);
    let user = User::with_device_id("device-1");
    impressions.record(10, seen_by(&user));
    impressions.record(10, seen_by(&user));

    let evaluation = evaluator
        .evaluate(&Workspace::default(), &message(true), &user, Utc::now())
        .unwrap();

    assert!(!evaluation.is_eligible);
    assert_eq!(evaluation.reason, "IN_APP_FREQUENCY_CAPPED");
}

#[test]
fn frequency_cap_counts_only_the_evaluated_device() {
    let (evaluator, impressions) = capped_evaluator(2);
    let user = User::with_device_id("device-1");
    let other = User::with_device_id("device-2");
    impressions.record(10, seen_by(&user));
    impressions.record(10, seen_by(&other));
    impressions.record(10, seen_by(&other));
    impressions.record(20, seen_by(&user));

    let evaluation = evaluator
        .evaluate(&Workspace::default(), &message(true), &user, Utc::now())
        .unwrap();

    assert!(evaluation.is_eligible);
    assert_eq!(evaluation.reason, "IN_APP_TARGET");
}

#[test]
fn message_without_variants_is_ineligible() {
    let (evaluator, _) = evaluator();

    let evaluation = evaluator
        .evaluate(
            &Workspace::default(),
            &message(false),
            &User::default(),
            Utc::now(),
        )
        .unwrap();

    assert_eq!(evaluation.reason, "NO_MESSAGE");
}

#[test]
fn layout_picks_first_variant() {
    let (evaluator, _) = evaluator();

    let layout = evaluator
        .evaluate_layout(&Workspace::default(), &message(true), &User::default())
        .unwrap();

    assert_eq!(layout.message.lang, "en");
    assert_eq!(layout.reason, "DEFAULT");
}

#[test]
fn layout_without_variants_fails() {
    let (evaluator, _) = evaluator();

    let err = evaluator
        .evaluate_layout(&Workspace::default(), &message(false), &User::default())
        .unwrap_err();

    assert!(matches!(err, AppError::Evaluation(_)));
}
