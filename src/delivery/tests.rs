use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::{AckTracker, DeliveryStats, InFlightPublish};

fn publish(id: u64) -> InFlightPublish {
    InFlightPublish::new(id, "fleet", "fleet/data", json!({ "id": id }))
}

#[test]
fn test_resolve_returns_payload_and_removes_entry() {
    let tracker = AckTracker::new();
    tracker.record(InFlightPublish::new(42, "vans", "fleet/van-1", json!({ "x": 1 })));

    assert!(tracker.is_pending(42));
    assert_eq!(tracker.resolve(42), Some(json!({ "x": 1 })));
    assert!(!tracker.is_pending(42));
    assert!(tracker.is_empty());
}

#[test]
fn test_resolve_twice_is_idempotent() {
    let tracker = AckTracker::new();
    tracker.record(publish(7));

    assert!(tracker.resolve(7).is_some());
    assert!(tracker.resolve(7).is_none());
    assert_eq!(tracker.stats().acknowledged, 1);
}

#[test]
fn test_resolve_unknown_id_leaves_others_alone() {
    let tracker = AckTracker::new();
    tracker.record(publish(1));
    tracker.record(publish(2));

    assert!(tracker.resolve(99).is_none());
    assert_eq!(tracker.len(), 2);
}

#[test]
fn test_record_same_id_replaces_entry() {
    let tracker = AckTracker::new();
    tracker.record(publish(3));
    tracker.record(InFlightPublish::new(3, "trucks", "fleet/truck-1", json!("second")));

    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.resolve(3), Some(json!("second")));
}

#[test]
fn test_report_lost_counts_once() {
    let tracker = AckTracker::new();
    tracker.record(publish(5));

    let lost = tracker.report_lost(5, "connection closed");
    assert_eq!(lost.map(|p| p.correlation_id), Some(5));
    assert!(tracker.report_lost(5, "again").is_none());
    assert!(tracker.resolve(5).is_none());

    assert_eq!(
        tracker.stats(),
        DeliveryStats {
            recorded: 1,
            acknowledged: 0,
            lost: 1,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_expire_drops_only_old_entries() {
    let tracker = AckTracker::new();
    tracker.record(publish(1));
    tokio::time::advance(Duration::from_secs(3)).await;
    tracker.record(publish(2));
    tokio::time::advance(Duration::from_secs(2)).await;

    let expired = tracker.expire(Duration::from_secs(5));
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].correlation_id, 1);
    assert!(tracker.is_pending(2));
    assert_eq!(tracker.stats().lost, 1);
}

#[tokio::test]
async fn test_wait_for_returns_immediately_when_settled() {
    let tracker = AckTracker::new();
    tracker.wait_for(11).await;

    tracker.record(publish(11));
    tracker.resolve(11);
    tracker.wait_for(11).await;
}

#[tokio::test]
async fn test_wait_for_wakes_on_resolve_from_another_task() {
    let tracker = Arc::new(AckTracker::new());
    tracker.record(publish(8));

    let resolver = {
        let tracker = tracker.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            tracker.resolve(8)
        })
    };

    tokio::time::timeout(Duration::from_secs(1), tracker.wait_for(8))
        .await
        .expect("wait_for should wake on resolve");
    assert_eq!(resolver.await.unwrap(), Some(json!({ "id": 8 })));
}

#[tokio::test]
async fn test_wait_for_wakes_on_report_lost() {
    let tracker = Arc::new(AckTracker::new());
    tracker.record(publish(9));

    let reporter = {
        let tracker = tracker.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            tracker.report_lost(9, "gave up");
        })
    };

    tokio::time::timeout(Duration::from_secs(1), tracker.wait_for(9))
        .await
        .expect("wait_for should wake on loss");
    reporter.await.unwrap();
}
