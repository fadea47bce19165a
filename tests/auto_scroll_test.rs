//! Auto-scroll state machine behavior over a scripted height sequence.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::ScriptedSession;
use sitemirror::{ScrollConfig, auto_scroll};

fn fast_scroll() -> ScrollConfig {
    ScrollConfig {
        max_iterations: 20,
        stable_readings: 3,
        delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn stabilizes_after_three_consecutive_equal_readings() {
    let mut session = ScriptedSession::new("https://x.test/", "<html></html>")
        .with_heights(vec![100, 200, 300, 300, 300, 300]);
    let probes = session.probes.clone();
    let scrolls = session.scrolls.clone();

    let final_height = auto_scroll(&mut session, &fast_scroll())
        .await
        .expect("auto-scroll succeeds");

    assert_eq!(final_height, 300);
    // 100, 200, 300 grow; then three consecutive equal readings stop the loop
    // well before the 20-iteration bound.
    assert_eq!(probes.load(Ordering::SeqCst), 6);

    let scrolls = scrolls.lock().expect("scroll lock");
    assert_eq!(*scrolls.last().expect("scrolled"), 0, "must return to top");
    assert!(scrolls[..scrolls.len() - 1].iter().all(|&y| y > 0));
}

#[tokio::test]
async fn iteration_bound_stops_infinite_growth() {
    let heights: Vec<u64> = (1..=40).map(|i| i * 100).collect();
    let mut session =
        ScriptedSession::new("https://x.test/", "<html></html>").with_heights(heights);
    let probes = session.probes.clone();

    auto_scroll(&mut session, &fast_scroll())
        .await
        .expect("auto-scroll succeeds");

    // A page that never stops growing is bounded by iteration count.
    assert_eq!(probes.load(Ordering::SeqCst), 20);
}

#[tokio::test]
async fn flat_page_stabilizes_immediately() {
    let mut session = ScriptedSession::new("https://x.test/", "<html></html>")
        .with_heights(vec![500]);
    let probes = session.probes.clone();

    let final_height = auto_scroll(&mut session, &fast_scroll())
        .await
        .expect("auto-scroll succeeds");

    assert_eq!(final_height, 500);
    // First reading differs from the initial zero, then three equal readings.
    assert_eq!(probes.load(Ordering::SeqCst), 4);
}
