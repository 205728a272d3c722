//! Monitor-driven reconnection under a paused clock.
//!
//! Defaults in play: stale threshold 6s, poll clamp 3-30s, reopen delay
//! 500ms, settle delay 200ms. With the clock paused, sleeps auto-advance
//! through pending timers, so tick positions are exact.

mod support;

use std::sync::Arc;
use std::time::Duration;

use cableway_client::{Cable, Consumer};
use tokio::time::sleep;

use support::{CountingHandler, FakeHost, MockConnector, SUPPORTED};

fn consumer(connector: &Arc<MockConnector>) -> Consumer {
    Cable::new()
        .with_transport_factory(Arc::clone(connector) as _)
        .create_consumer(Some("ws://cable.test/cable"))
        .expect("consumer")
}

fn consumer_with_host(connector: &Arc<MockConnector>, host: &Arc<FakeHost>) -> Consumer {
    Cable::new()
        .with_transport_factory(Arc::clone(connector) as _)
        .with_host(Arc::clone(host) as _)
        .create_consumer(Some("ws://cable.test/cable"))
        .expect("consumer")
}

#[tokio::test(start_paused = true)]
async fn test_stalled_handshake_triggers_backoff_reopen() {
    let connector = MockConnector::new();
    let consumer = consumer(&connector);
    consumer.connect();
    // The handshake never completes; the first ticks at 3s and 6s are not
    // yet past the strict 6s threshold, the 9s tick is.
    sleep(Duration::from_millis(8900)).await;
    assert_eq!(connector.open_count(), 1);
    assert_eq!(consumer.connection().monitor().reconnect_attempts(), 0);

    // 9s tick: attempt counted, socket closed, reopen lands 500ms later.
    sleep(Duration::from_millis(700)).await;
    assert_eq!(consumer.connection().monitor().reconnect_attempts(), 1);
    assert_eq!(connector.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_welcome_after_reconnect_resets_attempts_and_resubscribes() {
    let connector = MockConnector::new();
    let consumer = consumer(&connector);
    consumer.connect();
    connector.latest().accept(SUPPORTED).await;

    let handler = CountingHandler::new();
    consumer
        .subscriptions()
        .create("Chat", Arc::clone(&handler) as _)
        .await;

    // No welcome and no pings ever arrive: the 9s tick reopens.
    sleep(Duration::from_millis(9600)).await;
    assert_eq!(connector.open_count(), 2);
    assert_eq!(consumer.connection().monitor().reconnect_attempts(), 1);

    let transport = connector.latest();
    transport.accept(SUPPORTED).await;
    transport.deliver(r#"{"type":"welcome"}"#).await;

    assert_eq!(consumer.connection().monitor().reconnect_attempts(), 0);
    assert_eq!(
        transport.sent(),
        vec![r#"{"command":"subscribe","identifier":"{\"channel\":\"Chat\"}"}"#]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pings_keep_the_connection_alive() {
    let connector = MockConnector::new();
    let consumer = consumer(&connector);
    consumer.connect();
    let transport = connector.latest();
    transport.accept(SUPPORTED).await;
    transport.deliver(r#"{"type":"welcome"}"#).await;

    // Ping every 3 seconds for half a minute; no tick ever sees a stale gap.
    for _ in 0..10 {
        sleep(Duration::from_secs(3)).await;
        transport.deliver(r#"{"type":"ping","message":1700000000}"#).await;
    }

    assert_eq!(connector.open_count(), 1);
    assert_eq!(consumer.connection().monitor().reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_recent_disconnect_suppresses_reopen_but_counts_attempts() {
    let connector = MockConnector::new();
    let consumer = consumer(&connector);
    consumer.connect();
    let transport = connector.latest();
    transport.accept(SUPPORTED).await;
    transport.deliver(r#"{"type":"welcome"}"#).await;

    // Kill the socket just before the 9s tick; the tick sees a stale
    // connection but a disconnect fresh enough that the link may heal.
    sleep(Duration::from_millis(8500)).await;
    transport.drop_connection().await;
    sleep(Duration::from_millis(700)).await;

    assert_eq!(consumer.connection().monitor().reconnect_attempts(), 1);
    assert_eq!(connector.open_count(), 1);

    // Once the disconnect ages past the threshold, the next stale tick
    // reopens. Ticks land at 12.466s and 17.959s as the backoff grows.
    sleep(Duration::from_millis(9000)).await;
    assert_eq!(connector.open_count(), 2);
    assert!(consumer.connection().monitor().reconnect_attempts() >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_delayed_reopen() {
    let connector = MockConnector::new();
    let consumer = consumer(&connector);
    consumer.connect();

    // 9s tick: close + delayed reopen scheduled for 9.5s.
    sleep(Duration::from_millis(9200)).await;
    assert_eq!(consumer.connection().monitor().reconnect_attempts(), 1);
    assert_eq!(connector.open_count(), 1);

    // An intentional disconnect before the timer fires must win.
    consumer.disconnect();
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(connector.open_count(), 1);
    assert!(!consumer.connection().monitor().is_running());

    // And no polling continues either.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_regain_reopens_a_dead_socket() {
    let connector = MockConnector::new();
    let host = FakeHost::new();
    let consumer = consumer_with_host(&connector, &host);
    consumer.connect();
    let transport = connector.latest();
    transport.accept(SUPPORTED).await;
    transport.deliver(r#"{"type":"welcome"}"#).await;

    // The platform kills the socket while backgrounded; no close event.
    sleep(Duration::from_secs(1)).await;
    transport.drop_connection().await;

    host.regain_foreground();
    sleep(Duration::from_millis(300)).await;

    assert_eq!(connector.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_regain_leaves_a_healthy_socket_alone() {
    let connector = MockConnector::new();
    let host = FakeHost::new();
    let consumer = consumer_with_host(&connector, &host);
    consumer.connect();
    let transport = connector.latest();
    transport.accept(SUPPORTED).await;
    transport.deliver(r#"{"type":"welcome"}"#).await;

    host.regain_foreground();
    sleep(Duration::from_millis(300)).await;

    assert_eq!(connector.open_count(), 1);
}
