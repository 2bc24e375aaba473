#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use boundary_fetch::{
    Fetcher, GranularityConfig, InFlightSlot, OutputLayout, Orchestrator, ProgressEvent,
    ProgressSink, RetryPolicy, VariantDownloader,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const BOUND_PREFIX: &str = "/areas_v3/bound";

/// Sink that keeps every event for later inspection.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<ProgressEvent>>>,
    pub started: Arc<Mutex<Vec<(String, usize)>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<(String, usize)> {
        self.started.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn start(&mut self, owner: &str, total: usize) {
        self.started.lock().unwrap().push((owner.to_string(), total));
    }

    fn on_event(&mut self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn base_url(server: &MockServer) -> String {
    format!("{}{}/", server.uri(), BOUND_PREFIX)
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

pub fn fetcher(server: &MockServer) -> Fetcher {
    Fetcher::new(&base_url(server), fast_retry()).expect("fetcher")
}

pub fn downloader(server: &MockServer, slot: InFlightSlot) -> VariantDownloader {
    paced_downloader(server, slot, Duration::ZERO)
}

pub fn paced_downloader(server: &MockServer, slot: InFlightSlot, delay: Duration) -> VariantDownloader {
    VariantDownloader::new(fetcher(server), slot, delay)
}

pub fn orchestrator(
    server: &MockServer,
    root: &std::path::Path,
    config: GranularityConfig,
    sink: RecordingSink,
) -> Orchestrator {
    let layout = OutputLayout::new(root, config.naming_mode);
    Orchestrator::new(
        downloader(server, InFlightSlot::new()),
        layout,
        config,
        Box::new(sink),
    )
}

pub fn feature(code: &str) -> Value {
    json!({"type": "FeatureCollection", "features": [{"properties": {"adcode": code}}]})
}

pub async fn mount_json(server: &MockServer, resource: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", BOUND_PREFIX, resource)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts `infos.json` plus a base boundary document for every code in it.
/// Detailed (`_full`) documents are left unmounted and answer 404.
pub async fn mount_index(server: &MockServer, infos: &Value) {
    mount_json(server, "infos.json", infos.clone()).await;
    if let Some(map) = infos.as_object() {
        for code in map.keys() {
            mount_json(server, &format!("{}.json", code), feature(code)).await;
        }
    }
}

pub async fn requests(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

pub async fn request_paths(server: &MockServer) -> Vec<String> {
    requests(server)
        .await
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

/// Base-variant boundary requests, i.e. one per download attempt that
/// reached the base document.
pub async fn base_boundary_requests(server: &MockServer) -> Vec<String> {
    request_paths(server)
        .await
        .into_iter()
        .filter(|p| !p.ends_with("infos.json") && !p.contains("_full"))
        .collect()
}

pub fn sample_infos() -> Value {
    json!({
        "100000": {"name": "中华人民共和国", "level": "country"},
        "110000": {"name": "北京市", "level": "province"},
        "110101": {"name": "东城区", "level": "district"},
        "110102": {"name": "西城区", "level": "district"},
        "440000": {"name": "广东省", "level": "province"},
        "440100": {"name": "广州市", "level": "city"},
        "440103": {"name": "荔湾区", "level": "district"},
        "440104": {"name": "越秀区", "level": "district"},
        "440300": {"name": "深圳市", "level": "city"},
        "440304": {"name": "福田区", "level": "district"},
        "650000": {"name": "新疆维吾尔自治区", "level": "province"},
        "659001": {"name": "石河子市", "level": "district"}
    })
}
