use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::json;
use tempfile::TempDir;

use encore_api::api::{create_router, AppState};
use encore_api::error::{AppError, AppResult};
use encore_api::models::{CallerId, CatalogEntry, EnrichedResult, InferenceMatch, RecommendationRequest};
use encore_api::services::{
    CatalogLookup, Enricher, HistoryRecorder, InferenceClient, InferenceSource, MediaStager,
    MetadataProvider, RecommendationService,
};

// Stub collaborators

#[derive(Clone, Copy)]
enum InferenceBehavior {
    TwoMatches,
    Unavailable,
    Unconfigured,
}

struct StubInference {
    behavior: InferenceBehavior,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl InferenceClient for StubInference {
    fn is_configured(&self) -> bool {
        !matches!(self.behavior, InferenceBehavior::Unconfigured)
    }

    async fn infer(
        &self,
        _request: &RecommendationRequest,
        _source: &InferenceSource,
    ) -> AppResult<Vec<InferenceMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            InferenceBehavior::Unconfigured => Err(AppError::NotConfigured),
            InferenceBehavior::Unavailable => Err(AppError::UpstreamUnavailable(
                "inference request timed out".to_string(),
            )),
            InferenceBehavior::TwoMatches => Ok(vec![
                InferenceMatch {
                    id: Some(1),
                    raw_label: Some("Dynamite - BTS".to_string()),
                    similarity: Some(0.62),
                    distance: None,
                    instrument: Some("drums".to_string()),
                    start_sec: Some(12.0),
                    end_sec: Some(42.0),
                },
                InferenceMatch {
                    id: Some(2),
                    raw_label: Some("Butter - BTS".to_string()),
                    similarity: None,
                    distance: Some(0.05),
                    instrument: None,
                    start_sec: None,
                    end_sec: None,
                },
            ]),
        }
    }
}

struct EmptyCatalog;

#[async_trait::async_trait]
impl CatalogLookup for EmptyCatalog {
    async fn find_by_title(&self, _title: &str) -> AppResult<Option<CatalogEntry>> {
        Ok(None)
    }

    async fn find_by_title_and_artist(
        &self,
        _title: &str,
        _artist: &str,
    ) -> AppResult<Option<CatalogEntry>> {
        Ok(None)
    }
}

struct StubMetadata;

#[async_trait::async_trait]
impl MetadataProvider for StubMetadata {
    async fn fetch_cover(&self, title: &str, _artist: &str) -> String {
        format!("https://covers.test/{}.jpg", title.to_lowercase())
    }
}

struct StubHistory {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl HistoryRecorder for StubHistory {
    async fn record(
        &self,
        _caller: CallerId,
        _request: &RecommendationRequest,
        _results: &[EnrichedResult],
    ) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(AppError::Internal("history storage down".to_string()))
        } else {
            Ok(())
        }
    }
}

struct TestWorld {
    server: TestServer,
    media_dir: TempDir,
    inference_calls: Arc<AtomicUsize>,
    history_calls: Arc<AtomicUsize>,
}

impl TestWorld {
    fn new(behavior: InferenceBehavior, history_fails: bool) -> Self {
        let media_dir = TempDir::new().unwrap();
        let inference_calls = Arc::new(AtomicUsize::new(0));
        let history_calls = Arc::new(AtomicUsize::new(0));

        let recommender = Arc::new(RecommendationService::new(
            MediaStager::new(media_dir.path().to_path_buf(), 60.0),
            Arc::new(StubInference {
                behavior,
                calls: inference_calls.clone(),
            }),
            Enricher::new(Arc::new(EmptyCatalog), Arc::new(StubMetadata)),
            Arc::new(StubHistory {
                fail: history_fails,
                calls: history_calls.clone(),
            }),
            60.0,
            20,
        ));

        let state = AppState::new(recommender, media_dir.path().to_path_buf());
        let server = TestServer::new(create_router(state)).unwrap();

        Self {
            server,
            media_dir,
            inference_calls,
            history_calls,
        }
    }

    fn media_file_count(&self) -> usize {
        std::fs::read_dir(self.media_dir.path()).unwrap().count()
    }
}

/// Mono 8 kHz WAV, `secs` seconds long
fn wav_bytes(secs: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec).unwrap();
        for i in 0..(secs * 8000) {
            writer.write_sample((i % 128) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    buffer.into_inner()
}

const BOUNDARY: &str = "encore-test-boundary";

/// Hand-rolled multipart body with a `request` JSON part and a `file` part
fn multipart_body(request_json: &str, wav: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"request\"\r\n\
             Content-Type: application/json\r\n\r\n{request_json}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"clip.wav\"\r\nContent-Type: audio/wav\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(wav);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn caller_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-caller-id"),
        HeaderValue::from_static("42"),
    )
}

#[tokio::test]
async fn test_health_check() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);
    let response = world.server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_remote_recommendation_for_anonymous_caller() {
    // Scenario: window [10, 40], drums, healthy inference with two matches
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let response = world
        .server
        .post("/api/v1/recommend")
        .json(&json!({
            "sourceUrl": "https://www.youtube.com/watch?v=gdZLi9oWNZg",
            "instruments": ["drums"],
            "startSec": 10.0,
            "endSec": 40.0
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["isLoggedIn"], false);
    assert_eq!(body["historySaved"], false);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    // ordering preserved from the inference service, no re-ranking
    assert_eq!(results[0]["title"], "Dynamite");
    assert_eq!(results[1]["title"], "Butter");
    // native similarity passes through, distance converts to 1 - d
    assert_eq!(results[0]["similarity"], 0.62);
    let converted = results[1]["similarity"].as_f64().unwrap();
    assert!((converted - 0.95).abs() < 1e-9);
    // match-supplied window on the first, request fallback on the second
    assert_eq!(results[0]["startSec"], 12.0);
    assert_eq!(results[1]["startSec"], 10.0);
    assert_eq!(results[1]["endSec"], 40.0);
    assert_eq!(results[0]["albumCoverUrl"], "https://covers.test/dynamite.jpg");

    assert_eq!(world.history_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_inverted_window_rejected_without_side_effects() {
    // Scenario: window [40, 30]
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let response = world
        .server
        .post("/api/v1/recommend")
        .json(&json!({
            "sourceUrl": "https://x/v",
            "instruments": ["drums"],
            "startSec": 40.0,
            "endSec": 30.0
        }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["kind"], "validation_error");

    assert_eq!(world.inference_calls.load(Ordering::SeqCst), 0);
    assert_eq!(world.media_file_count(), 0);
}

#[tokio::test]
async fn test_unknown_instrument_rejected() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let response = world
        .server
        .post("/api/v1/recommend")
        .json(&json!({
            "sourceUrl": "https://x/v",
            "instruments": ["theremin"],
            "startSec": 0.0,
            "endSec": 10.0
        }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["kind"], "validation_error");
}

#[tokio::test]
async fn test_single_instrument_string_accepted() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let response = world
        .server
        .post("/api/v1/recommend")
        .json(&json!({
            "sourceUrl": "https://x/v",
            "instrument": "vocals",
            "startSec": 0.0,
            "endSec": 10.0
        }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_top_k_out_of_bounds_rejected() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let response = world
        .server
        .post("/api/v1/recommend")
        .json(&json!({
            "sourceUrl": "https://x/v",
            "instruments": ["drums"],
            "startSec": 0.0,
            "endSec": 10.0,
            "topK": 500
        }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_recommendation_cleans_staged_media() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let body = multipart_body(
        r#"{"instruments": ["drums"], "startSec": 1.0, "endSec": 3.0}"#,
        &wav_bytes(5),
    );
    let response = world
        .server
        .post("/api/v1/recommend/upload")
        .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
        .bytes(body.into())
        .await;

    response.assert_status_ok();
    let json_body: serde_json::Value = response.json();
    assert_eq!(json_body["results"].as_array().unwrap().len(), 2);

    // both the original upload and the trimmed derivative are gone
    assert_eq!(world.media_file_count(), 0);
}

#[tokio::test]
async fn test_upstream_failure_surfaces_and_cleans_staged_media() {
    // Scenario: inference times out on an uploaded clip
    let world = TestWorld::new(InferenceBehavior::Unavailable, false);

    let body = multipart_body(
        r#"{"instruments": ["drums"], "startSec": 0.0, "endSec": 2.0}"#,
        &wav_bytes(4),
    );
    let response = world
        .server
        .post("/api/v1/recommend/upload")
        .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
        .bytes(body.into())
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    let json_body: serde_json::Value = response.json();
    assert_eq!(json_body["error"]["kind"], "upstream_unavailable");

    assert_eq!(world.inference_calls.load(Ordering::SeqCst), 1);
    assert_eq!(world.media_file_count(), 0);
}

#[tokio::test]
async fn test_upload_with_invalid_window_never_touches_storage() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let body = multipart_body(
        r#"{"instruments": ["drums"], "startSec": 40.0, "endSec": 30.0}"#,
        &wav_bytes(4),
    );
    let response = world
        .server
        .post("/api/v1/recommend/upload")
        .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
        .bytes(body.into())
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(world.media_file_count(), 0);
}

#[tokio::test]
async fn test_garbage_upload_yields_media_processing_error() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let body = multipart_body(
        r#"{"instruments": ["drums"], "startSec": 0.0, "endSec": 2.0}"#,
        b"this is not audio",
    );
    let response = world
        .server
        .post("/api/v1/recommend/upload")
        .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
        .bytes(body.into())
        .await;

    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let json_body: serde_json::Value = response.json();
    assert_eq!(json_body["error"]["kind"], "media_processing_error");
    assert_eq!(world.media_file_count(), 0);
}

#[tokio::test]
async fn test_missing_file_part_rejected() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let request_json = r#"{"instruments": ["drums"], "startSec": 0.0, "endSec": 2.0}"#;
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"request\"\r\n\
         Content-Type: application/json\r\n\r\n{request_json}\r\n--{BOUNDARY}--\r\n"
    );
    let response = world
        .server
        .post("/api/v1/recommend/upload")
        .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
        .bytes(body.into_bytes().into())
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authenticated_caller_gets_history_recorded() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);
    let (name, value) = caller_header();

    let response = world
        .server
        .post("/api/v1/recommend")
        .add_header(name, value)
        .json(&json!({
            "sourceUrl": "https://x/v",
            "instruments": ["drums"],
            "startSec": 10.0,
            "endSec": 40.0
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["isLoggedIn"], true);
    assert_eq!(body["historySaved"], true);
    assert_eq!(world.history_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_history_failure_does_not_fail_response() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, true);
    let (name, value) = caller_header();

    let response = world
        .server
        .post("/api/v1/recommend")
        .add_header(name, value)
        .json(&json!({
            "sourceUrl": "https://x/v",
            "instruments": ["drums"],
            "startSec": 10.0,
            "endSec": 40.0
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["isLoggedIn"], true);
    assert_eq!(body["historySaved"], false);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unconfigured_inference_fails_fast() {
    let world = TestWorld::new(InferenceBehavior::Unconfigured, false);

    let body = multipart_body(
        r#"{"instruments": ["drums"], "startSec": 0.0, "endSec": 2.0}"#,
        &wav_bytes(4),
    );
    let response = world
        .server
        .post("/api/v1/recommend/upload")
        .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
        .bytes(body.into())
        .await;

    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    let json_body: serde_json::Value = response.json();
    assert_eq!(json_body["error"]["kind"], "not_configured");
    // failed fast: nothing was staged, nothing was called
    assert_eq!(world.inference_calls.load(Ordering::SeqCst), 0);
    assert_eq!(world.media_file_count(), 0);
}

#[tokio::test]
async fn test_request_id_echoed_on_response() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let response = world.server.get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_malformed_caller_header_treated_as_anonymous() {
    let world = TestWorld::new(InferenceBehavior::TwoMatches, false);

    let response = world
        .server
        .post("/api/v1/recommend")
        .add_header(
            HeaderName::from_static("x-caller-id"),
            HeaderValue::from_static("not-a-number"),
        )
        .json(&json!({
            "sourceUrl": "https://x/v",
            "instruments": ["drums"],
            "startSec": 10.0,
            "endSec": 40.0
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["isLoggedIn"], false);
    assert_eq!(body["historySaved"], false);
    assert_eq!(world.history_calls.load(Ordering::SeqCst), 0);
}
