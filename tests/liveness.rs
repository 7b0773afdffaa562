//! Liveness sweep behavior, driven under paused virtual time: the sweep
//! ticker and the idle thresholds all run on the tokio clock, so the tests
//! advance through minutes of idleness instantly.

mod common;

use common::TestBed;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test(start_paused = true)]
async fn idle_registered_client_is_pinged_then_dropped() {
    let mut bed = TestBed::start();
    let mut conn = bed.connect();
    conn.register("nick1", "foo1 bar1 baz1 :Long name1").await;

    // Past the 90 s idle threshold the daemon sends one PING.
    let line = conn.rx.recv().await.expect("daemon went away");
    assert_eq!(line, "PING :foohost");
    assert!(!conn.client.is_closed());

    // No PONG (or any traffic) within the 180 s deadline: disconnected.
    timeout(
        Duration::from_secs(1000),
        conn.client.cancel_token().cancelled(),
    )
    .await
    .expect("idle client must be disconnected");
}

#[tokio::test(start_paused = true)]
async fn idle_unregistered_client_is_dropped_without_ping() {
    let mut bed = TestBed::start();
    let mut conn = bed.connect();

    timeout(
        Duration::from_secs(1000),
        conn.client.cancel_token().cancelled(),
    )
    .await
    .expect("idle unregistered client must be disconnected");
    // No PING was ever sent to it.
    assert!(conn.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn inbound_activity_rearms_the_ping_clock() {
    let mut bed = TestBed::start();
    let mut conn = bed.connect();
    conn.register("nick1", "foo1 bar1 baz1 :Long name1").await;

    assert_eq!(conn.rx.recv().await.unwrap(), "PING :foohost");

    // Any inbound read refreshes the idle clock and rearms the PING flag,
    // the way the reader does on traffic.
    conn.client.touch();
    conn.send("PING x");
    assert_eq!(conn.rx.recv().await.unwrap(), ":foohost PONG foohost :x");
    assert!(!conn.client.is_closed());

    // Gone quiet again: the next PING follows.
    assert_eq!(conn.rx.recv().await.unwrap(), "PING :foohost");
}
