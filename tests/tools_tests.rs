//! `/go-to/` click tracking and `/see-stats` tests

#[macro_use]
mod common;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use async_trait::async_trait;
use parking_lot::Mutex;

use common::{SiteFixture, location};
use sumatra_website::analytics::ClickRecorder;
use sumatra_website::telemetry::{Batch, BatchTransport, TelemetryClient, TelemetryOptions};

#[derive(Default)]
struct RecordingTransport {
    batches: Mutex<Vec<Batch>>,
}

#[async_trait]
impl BatchTransport for RecordingTransport {
    async fn post_batch(&self, batch: Batch) -> anyhow::Result<()> {
        self.batches.lock().push(batch);
        Ok(())
    }
}

#[actix_rt::test]
async fn test_known_tool_redirects_and_records() {
    let fixture = SiteFixture::new();
    let state = fixture.state();
    let recorder = state.recorder.clone();
    let app = site_app!(state);

    let req = TestRequest::get().uri("/go-to/merge-pdf").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "http://bit.ly/2g8YrvJ");

    let snapshot = recorder.sorted_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].category, "merge-pdf");
    assert_eq!(snapshot[0].count, 1);

    let log = std::fs::read_to_string(fixture.stats_path()).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains(r#""w":"merge-pdf""#));
}

#[actix_rt::test]
async fn test_unknown_tool_falls_back_without_recording() {
    let fixture = SiteFixture::new();
    let state = fixture.state();
    let recorder = state.recorder.clone();
    let app = site_app!(state);

    let req = TestRequest::get().uri("/go-to/no-such-tool").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/pdf-tools.html");
    assert!(recorder.sorted_snapshot().is_empty());
}

#[actix_rt::test]
async fn test_see_stats_sorted_by_count() {
    let fixture = SiteFixture::new();
    let app = site_app!(fixture.state());

    for uri in [
        "/go-to/split-pdf",
        "/go-to/merge-pdf",
        "/go-to/merge-pdf",
        "/go-to/compress-pdf",
    ] {
        let req = TestRequest::get().uri(uri).to_request();
        let _ = test::call_service(&app, req).await;
    }

    let req = TestRequest::get().uri("/see-stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "text/html; charset=utf-8"
    );

    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    let merge = html.find("<td>merge-pdf</td>").unwrap();
    let compress = html.find("<td>compress-pdf</td>").unwrap();
    let split = html.find("<td>split-pdf</td>").unwrap();
    // 次数相同按名字升序
    assert!(merge < compress);
    assert!(compress < split);
}

#[actix_rt::test]
async fn test_clicks_survive_restart() {
    let fixture = SiteFixture::new();
    {
        let app = site_app!(fixture.state());
        for _ in 0..3 {
            let req = TestRequest::get().uri("/go-to/merge-pdf").to_request();
            let _ = test::call_service(&app, req).await;
        }
        let req = TestRequest::get().uri("/go-to/pdf-to-word").to_request();
        let _ = test::call_service(&app, req).await;
    }

    let reopened = ClickRecorder::open(fixture.stats_path());
    let snapshot = reopened.sorted_snapshot();
    assert_eq!(snapshot[0].category, "merge-pdf");
    assert_eq!(snapshot[0].count, 3);
    assert_eq!(snapshot[1].category, "pdf-to-word");
    assert_eq!(snapshot[1].count, 1);
}

#[actix_rt::test]
async fn test_tool_click_sent_to_telemetry() {
    let fixture = SiteFixture::new();
    let transport = Arc::new(RecordingTransport::default());
    let client = TelemetryClient::new(
        transport.clone(),
        TelemetryOptions::default(),
        Default::default(),
    );
    let app = site_app!(fixture.state_with(Some(client.clone())));

    let req = TestRequest::get().uri("/go-to/rotate-pdf").to_request();
    let _ = test::call_service(&app, req).await;
    assert_eq!(client.buffered(), 1);

    client.flush().await.unwrap();
    let batches = transport.batches.lock();
    assert_eq!(batches.len(), 1);
    let line: serde_json::Value = serde_json::from_slice(&batches[0].body).unwrap();
    assert_eq!(line["event"], "tool_click");
    assert_eq!(line["tool"], "rotate-pdf");
}
