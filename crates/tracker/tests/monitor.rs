mod util;

use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracker::monitor::Tick;
use tracker::store::Store;
use tracker::Monitor;
use util::{airborne, departed, harness, landed, DEPARTURE};

#[tokio::test]
async fn test_takeoff_is_alerted_exactly_once() {
    let h = harness(false);
    let entity = util::entity("f1", DEPARTURE);
    util::insert(h.store.as_ref(), &entity).await;

    let monitor = Monitor::new(entity.clone(), h.services.clone());
    let token = CancellationToken::new();

    // First observation only establishes a baseline.
    h.source.push(departed());
    h.clock.set(DEPARTURE + 100);
    assert_eq!(monitor.tick(&token).await, Tick::Continue);
    assert!(h.notifier.posted().is_empty());

    let baseline = h.store.fetch_snapshot("f1").await.unwrap().unwrap();
    assert_eq!(baseline.dep_actual, DEPARTURE);
    assert_eq!(baseline.updated_at, DEPARTURE + 100);

    h.source.push(departed());
    h.clock.set(DEPARTURE + 200);
    assert_eq!(monitor.tick(&token).await, Tick::Continue);
    assert!(h.notifier.posted().is_empty());

    h.source.push(airborne(DEPARTURE + 300));
    h.clock.set(DEPARTURE + 400);
    assert_eq!(monitor.tick(&token).await, Tick::Continue);

    let posted = h.notifier.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].channel, "C123");
    assert!(
        posted[0].message.text.contains("Flight took off!"),
        "{}",
        posted[0].message.text
    );
    assert!(h.store.alert_sent("f1", "flight_takeoff").await.unwrap());

    h.source.push(airborne(DEPARTURE + 300));
    h.clock.set(DEPARTURE + 500);
    assert_eq!(monitor.tick(&token).await, Tick::Continue);
    assert_eq!(h.notifier.posted().len(), 1);

    let latest = h.store.fetch_snapshot("f1").await.unwrap().unwrap();
    assert_eq!(latest.takeoff_actual, DEPARTURE + 300);
    assert_eq!(latest.updated_at, DEPARTURE + 500);
}

#[tokio::test]
async fn test_fetch_failures_skip_the_poll() {
    let h = harness(false);
    let entity = util::entity("f1", DEPARTURE);
    util::insert(h.store.as_ref(), &entity).await;

    let monitor = Monitor::new(entity, h.services.clone());
    let token = CancellationToken::new();

    h.source.push_error();
    assert_eq!(monitor.tick(&token).await, Tick::Continue);

    // Exhausted: the source has no current data.
    assert_eq!(monitor.tick(&token).await, Tick::Continue);

    assert_eq!(h.store.fetch_snapshot("f1").await.unwrap(), None);
    assert!(h.notifier.posted().is_empty());
}

#[tokio::test]
async fn test_snapshot_read_failure_keeps_the_baseline() {
    let h = harness(false);
    let entity = util::entity("f1", DEPARTURE);
    util::insert(h.store.as_ref(), &entity).await;

    let monitor = Monitor::new(entity, h.services.clone());
    let token = CancellationToken::new();

    h.source.push(departed());
    h.clock.set(DEPARTURE + 100);
    assert_eq!(monitor.tick(&token).await, Tick::Continue);
    let baseline = h.store.fetch_snapshot("f1").await.unwrap();

    // A read error is not a cold start: nothing is dispatched or stored.
    h.store.fail_snapshot_reads.store(true, Ordering::SeqCst);
    h.source.push(airborne(DEPARTURE + 300));
    h.clock.set(DEPARTURE + 400);
    assert_eq!(monitor.tick(&token).await, Tick::Continue);
    h.store.fail_snapshot_reads.store(false, Ordering::SeqCst);

    assert!(h.notifier.posted().is_empty());
    assert_eq!(h.store.fetch_snapshot("f1").await.unwrap(), baseline);

    // Once reads recover, the takeoff is observed against the baseline.
    h.source.push(airborne(DEPARTURE + 300));
    h.clock.set(DEPARTURE + 500);
    assert_eq!(monitor.tick(&token).await, Tick::Continue);
    assert_eq!(h.notifier.posted().len(), 1);
    assert!(h.store.alert_sent("f1", "flight_takeoff").await.unwrap());
}

#[tokio::test]
async fn test_failed_delivery_still_stores_the_snapshot() {
    let h = harness(false);
    let entity = util::entity("f1", DEPARTURE);
    util::insert(h.store.as_ref(), &entity).await;

    let monitor = Monitor::new(entity, h.services.clone());
    let token = CancellationToken::new();

    h.source.push(departed());
    h.clock.set(DEPARTURE + 100);
    assert_eq!(monitor.tick(&token).await, Tick::Continue);

    h.notifier.failing.store(true, Ordering::SeqCst);
    h.source.push(airborne(DEPARTURE + 300));
    h.clock.set(DEPARTURE + 400);
    assert_eq!(monitor.tick(&token).await, Tick::Continue);

    assert!(h.notifier.posted().is_empty());
    assert!(!h.store.alert_sent("f1", "flight_takeoff").await.unwrap());

    let stored = h.store.fetch_snapshot("f1").await.unwrap().unwrap();
    assert_eq!(stored.takeoff_actual, DEPARTURE + 300);
    assert_eq!(stored.updated_at, DEPARTURE + 400);
}

#[tokio::test]
async fn test_cancelled_poll_makes_no_writes() {
    let h = harness(false);
    let entity = util::entity("f1", DEPARTURE);
    util::insert(h.store.as_ref(), &entity).await;

    let monitor = Monitor::new(entity, h.services.clone());
    let token = CancellationToken::new();
    token.cancel();

    h.source.push(departed());
    assert_eq!(monitor.tick(&token).await, Tick::Cancelled);

    assert_eq!(h.store.fetch_snapshot("f1").await.unwrap(), None);
    assert!(h.notifier.posted().is_empty());
}

#[tokio::test]
async fn test_landing_retires_the_flight() {
    let h = harness(false);
    let entity = util::entity("f1", DEPARTURE);
    util::insert(h.store.as_ref(), &entity).await;

    h.source.push(airborne(DEPARTURE + 300));
    h.source.push(landed(DEPARTURE + 3_000));
    h.clock.set(DEPARTURE + 3_100);

    let token = CancellationToken::new();
    let (exits_tx, mut exits_rx) = tokio::sync::mpsc::unbounded_channel();

    let monitor = Monitor::new(entity, h.services.clone());
    tokio::time::timeout(
        Duration::from_secs(5),
        monitor.run(Duration::from_millis(10), token.clone(), exits_tx),
    )
    .await
    .expect("monitor retires after landing");

    assert!(token.is_cancelled());
    assert_eq!(exits_rx.recv().await.as_deref(), Some("f1"));
    assert_eq!(h.store.get_entity("f1").await.unwrap(), None);
    assert_eq!(h.store.fetch_snapshot("f1").await.unwrap(), None);

    let posted = h.notifier.posted();
    assert_eq!(posted.len(), 1);
    assert!(
        posted[0].message.text.contains("Flight landed!"),
        "{}",
        posted[0].message.text
    );
    assert!(h.store.alert_sent("f1", "flight_landed").await.unwrap());
}

#[tokio::test]
async fn test_previously_complete_flight_retires() {
    let h = harness(false);
    let entity = util::entity("f1", DEPARTURE);
    util::insert(h.store.as_ref(), &entity).await;

    let monitor = Monitor::new(entity, h.services.clone());
    let token = CancellationToken::new();

    // A landing which was observed, but whose retirement didn't finish.
    let previous = models::StateSnapshot::from_detail(&landed(DEPARTURE + 3_000), "f1", DEPARTURE);
    h.store.store_snapshot(previous).await.unwrap();
    h.store.record_alert("f1", "flight_landed").await.unwrap();

    h.source.push(landed(DEPARTURE + 3_000));
    h.clock.set(DEPARTURE + 3_100);
    assert_eq!(monitor.tick(&token).await, Tick::Retire);
    assert!(h.notifier.posted().is_empty());
}
