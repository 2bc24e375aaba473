//! Detailed-variant fallback and persistence.

mod support;

use boundary_fetch::{DownloadOutcome, InFlightSlot, Variant};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use support::*;
use tempfile::TempDir;
use wiremock::MockServer;

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).expect("file written")).expect("valid json")
}

#[tokio::test]
async fn falls_back_to_base_when_detailed_fails() {
    let server = MockServer::start().await;
    mount_json(&server, "440000.json", feature("440000")).await;
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("province").join("440000.json");
    let slot = InFlightSlot::new();

    let outcome = downloader(&server, slot.clone()).download("440000", &target, true).await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Success { variant: Variant::Base, fell_back: true }
    ));
    assert_eq!(read_json(&target), feature("440000"));
    assert!(slot.is_empty());

    let paths = request_paths(&server).await;
    assert_eq!(paths.iter().filter(|p| p.ends_with("440000_full.json")).count(), 3);
    assert_eq!(paths.iter().filter(|p| p.ends_with("/440000.json")).count(), 1);
}

#[tokio::test]
async fn detailed_variant_wins_when_available() {
    let server = MockServer::start().await;
    let full = json!({"type": "FeatureCollection", "features": [1, 2, 3]});
    mount_json(&server, "440000_full.json", full.clone()).await;
    mount_json(&server, "440000.json", feature("440000")).await;
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("440000.json");

    let outcome = downloader(&server, InFlightSlot::new()).download("440000", &target, true).await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Success { variant: Variant::Detailed, fell_back: false }
    ));
    assert_eq!(read_json(&target), full);
    assert_eq!(base_boundary_requests(&server).await.len(), 0);
}

#[tokio::test]
async fn base_only_when_detailed_not_wanted() {
    let server = MockServer::start().await;
    mount_json(&server, "440103.json", feature("440103")).await;
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("county").join("440103.json");

    let outcome = downloader(&server, InFlightSlot::new()).download("440103", &target, false).await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Success { variant: Variant::Base, fell_back: false }
    ));
    assert_eq!(request_paths(&server).await, ["/areas_v3/bound/440103.json"]);
}

#[tokio::test]
async fn failed_base_is_reported_not_raised() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("missing.json");

    let outcome = downloader(&server, InFlightSlot::new()).download("990000", &target, true).await;

    match outcome {
        DownloadOutcome::Failed(err) => assert!(err.to_string().contains("404"), "{err}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!target.exists());
}

#[tokio::test]
async fn pause_follows_base_downloads_only() {
    let delay = Duration::from_millis(800);
    let server = MockServer::start().await;
    mount_json(&server, "440103.json", feature("440103")).await;
    mount_json(&server, "440000_full.json", feature("440000")).await;
    let dir = TempDir::new().unwrap();
    let dl = paced_downloader(&server, InFlightSlot::new(), delay);

    let started = Instant::now();
    let outcome = dl.download("440103", &dir.path().join("440103.json"), false).await;
    assert!(matches!(outcome, DownloadOutcome::Success { variant: Variant::Base, .. }));
    assert!(started.elapsed() >= delay, "base success returned after {:?}", started.elapsed());

    let started = Instant::now();
    let outcome = dl.download("440000", &dir.path().join("440000.json"), true).await;
    assert!(matches!(outcome, DownloadOutcome::Success { variant: Variant::Detailed, .. }));
    assert!(started.elapsed() < delay, "detailed success waited {:?}", started.elapsed());

    let started = Instant::now();
    let outcome = dl.download("990000", &dir.path().join("990000.json"), false).await;
    assert!(matches!(outcome, DownloadOutcome::Failed(_)));
    assert!(started.elapsed() < delay, "failure waited {:?}", started.elapsed());
}
