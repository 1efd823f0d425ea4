//! Integration tests for the tag event pipeline
//!
//! Tags are injected through the mock driver's event sink, the same path a
//! vendor callback takes, and observed through session subscribers.

mod common;

use common::{epc, mock_session, scanning_session};
use futures::StreamExt;
use rstest::rstest;
use std::time::Duration;
use tagscan_reader::{DuplicatePolicy, ReaderConfig, StatusEvent, StatusKind, TagReadEvent};

/// A burst larger than the buffer keeps only the most recent reads
#[tokio::test(start_paused = true)]
async fn test_burst_keeps_most_recent_hundred() {
    let (session, handle) = scanning_session(ReaderConfig::default()).await;
    let mut tags = session.subscribe_tags();

    let published = handle.emit_tags((0..150).map(epc));
    assert_eq!(published, 150);

    assert_eq!(tags.len(), 100);
    assert_eq!(tags.dropped(), 50);

    let received: Vec<String> = std::iter::from_fn(|| tags.try_recv())
        .map(|tag| tag.epc)
        .collect();
    let expected: Vec<String> = (50..150).map(epc).collect();
    assert_eq!(received, expected);
}

/// Buffer size follows configuration
#[rstest]
#[case(1)]
#[case(10)]
#[case(250)]
#[tokio::test(start_paused = true)]
async fn test_configured_buffer_capacity(#[case] capacity: usize) {
    let config = ReaderConfig {
        tag_buffer_capacity: capacity,
        ..Default::default()
    };
    let (session, handle) = scanning_session(config).await;
    let tags = session.subscribe_tags();

    handle.emit_tags((0..300).map(epc));

    assert_eq!(tags.len(), capacity);
    assert_eq!(tags.dropped(), (300 - capacity) as u64);
}

/// Each subscriber receives every read independently
#[tokio::test(start_paused = true)]
async fn test_multiple_subscribers() {
    let (session, handle) = scanning_session(ReaderConfig::default()).await;
    let mut display = session.subscribe_tags();
    let mut logger = session.subscribe_tags();

    handle.emit_tag(TagReadEvent::new(epc(1)).with_rssi(-45).with_antenna(2));

    let first = display.recv().await.unwrap();
    let second = logger.recv().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.rssi, -45);
    assert_eq!(first.antenna_id, 2);
}

/// Consumers can await reads as a stream
#[tokio::test(start_paused = true)]
async fn test_consume_as_stream() {
    let (session, handle) = scanning_session(ReaderConfig::default()).await;
    let stream = session.subscribe_tags().into_stream();

    let producer = tokio::spawn(async move {
        for index in 0..3 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.emit_tag(TagReadEvent::new(epc(index)));
        }
    });

    let epcs: Vec<String> = stream.take(3).map(|tag| tag.epc).collect().await;
    producer.await.unwrap();
    assert_eq!(epcs, vec![epc(0), epc(1), epc(2)]);
}

/// Reads decode to GTIN when the EPC is SGTIN-96
#[tokio::test(start_paused = true)]
async fn test_received_tags_decode() {
    let (session, handle) = scanning_session(ReaderConfig::default()).await;
    let mut tags = session.subscribe_tags();

    handle.emit_tag(TagReadEvent::new("3074257BF7194E4000001A85"));
    handle.emit_tag(TagReadEvent::new("E2801160600002054C4D8B3A"));

    let sgtin = tags.recv().await.unwrap();
    assert_eq!(sgtin.decode().gtin14(), Some("06141418123456"));
    let other = tags.recv().await.unwrap();
    assert!(!other.decode().is_success());
    assert_eq!(other.display_name(), "E2801160600002054C4D8B3A");
}

/// Reads without an identifier never reach consumers
#[tokio::test(start_paused = true)]
async fn test_empty_identifier_is_dropped() {
    let (session, handle) = scanning_session(ReaderConfig::default()).await;
    let mut tags = session.subscribe_tags();

    assert!(!handle.emit_tag(TagReadEvent::new("")));
    assert!(tags.try_recv().is_none());
}

/// First-read policy delivers each EPC once per inventory run
#[tokio::test(start_paused = true)]
async fn test_first_read_per_inventory() {
    let config = ReaderConfig {
        duplicate_policy: DuplicatePolicy::FirstReadPerInventory,
        ..Default::default()
    };
    let (session, handle) = scanning_session(config).await;
    let tags = session.subscribe_tags();

    assert_eq!(handle.emit_tags([epc(1), epc(1), epc(2), epc(1)]), 2);
    assert_eq!(tags.len(), 2);

    session.stop_inventory().await.unwrap();
    session.start_inventory().await.unwrap();
    assert_eq!(handle.emit_tags([epc(1)]), 1);
    assert_eq!(tags.len(), 3);
}

/// Non-disconnect status events leave the session scanning
#[tokio::test(start_paused = true)]
async fn test_informational_status_events() {
    let (session, handle) = scanning_session(ReaderConfig::default()).await;

    assert!(handle.emit_status(StatusEvent::new(StatusKind::Battery { level: 12 })));
    assert!(handle.emit_status(StatusEvent::new(StatusKind::Trigger { pressed: true })));
    assert!(handle.emit_status(StatusEvent::new(StatusKind::InventoryStopped)));

    assert!(session.is_connected());
    assert_eq!(session.current_state(), tagscan_reader::ReaderState::Scanning);
}

/// No reads are delivered before a connection exists
#[tokio::test(start_paused = true)]
async fn test_no_reads_before_connect() {
    let (session, handle) = mock_session();
    let mut tags = session.subscribe_tags();

    assert!(!handle.emit_tag(TagReadEvent::new(epc(0))));
    assert!(tags.try_recv().is_none());
}

/// Dropping the session stops delivery but keeps buffered reads
#[tokio::test(start_paused = true)]
async fn test_dropped_session_stops_delivery() {
    let (session, handle) = scanning_session(ReaderConfig::default()).await;
    let mut tags = session.subscribe_tags();
    handle.emit_tag(TagReadEvent::new(epc(7)));

    drop(session);
    assert!(!handle.emit_tag(TagReadEvent::new(epc(8))));

    assert_eq!(tags.recv().await.unwrap().epc, epc(7));
}
