use chrono::{TimeDelta, Utc};

use inapp_dispatch::models::user::User;
use inapp_dispatch::storage::{
    HiddenStorage, ImpressionRecord, ImpressionStorage, InMemoryHiddenStorage,
    InMemoryImpressionStorage,
};

#[test]
fn hidden_within_window() {
    let storage = InMemoryHiddenStorage::default();
    let now = Utc::now();
    storage.put(10, now + TimeDelta::hours(1));

    assert!(storage.is_hidden(10, now));
    assert!(!storage.is_hidden(20, now));
}

#[test]
fn hidden_window_expires() {
    let storage = InMemoryHiddenStorage::default();
    let now = Utc::now();
    storage.put(10, now);

    assert!(!storage.is_hidden(10, now), "window end is exclusive");
    assert!(!storage.is_hidden(10, now - TimeDelta::hours(1)), "expired entry removed");
}

#[test]
fn later_put_replaces_window() {
    let storage = InMemoryHiddenStorage::default();
    let now = Utc::now();
    storage.put(10, now + TimeDelta::minutes(1));
    storage.put(10, now + TimeDelta::hours(2));

    assert!(storage.is_hidden(10, now + TimeDelta::hours(1)));
}

fn record(seconds: i64) -> ImpressionRecord {
    ImpressionRecord {
        identifiers: User::with_device_id("device-1").identifiers,
        timestamp: Utc::now() + TimeDelta::seconds(seconds),
    }
}

#[test]
fn impressions_are_kept_per_message_in_order() {
    let storage = InMemoryImpressionStorage::new(10);
    let first = record(0);
    let second = record(1);
    storage.record(10, first.clone());
    storage.record(10, second.clone());
    storage.record(20, record(2));

    assert_eq!(storage.get(10), vec![first, second]);
    assert_eq!(storage.get(20).len(), 1);
    assert!(storage.get(30).is_empty());
}

#[test]
fn oldest_impressions_are_evicted() {
    let storage = InMemoryImpressionStorage::new(2);
    let kept = [record(1), record(2)];
    storage.record(10, record(0));
    storage.record(10, kept[0].clone());
    storage.record(10, kept[1].clone());

    assert_eq!(storage.get(10), kept.to_vec());
}
