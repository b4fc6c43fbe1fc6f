use super::*;
use crate::converter::AudioConverter;
use crate::test_helpers::{MockEngine, VALID_URL};
use crate::types::{Status, TaskSnapshot};
use crate::Config;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tempfile::tempdir;
use tower::ServiceExt;

/// Build a router over a mock engine; returns the converter for direct
/// lifecycle manipulation and the tempdir guard
fn create_test_app(
    engine: MockEngine,
    adjust: impl FnOnce(&mut Config),
) -> (Router, Arc<AudioConverter>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.conversion.output_dir = dir.path().to_path_buf();
    adjust(&mut config);

    let converter =
        Arc::new(AudioConverter::new(config.clone(), Arc::new(engine)).unwrap());
    let app = create_router(converter.clone(), Arc::new(config));
    (app, converter, dir)
}

fn default_app() -> (Router, Arc<AudioConverter>, tempfile::TempDir) {
    create_test_app(MockEngine::default(), |_| {})
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn routes_are_mirrored_under_api_prefix() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_gets_json_404() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Endpoint not found");
}

#[tokio::test]
async fn video_info_returns_metadata() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(json_request("/video-info", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Test Video");
    assert!(body["duration_warning"].is_null());
}

#[tokio::test]
async fn video_info_warns_about_over_cap_duration() {
    let (app, _converter, _dir) =
        create_test_app(MockEngine::default().with_duration(3600), |_| {});

    let response = app
        .oneshot(json_request("/video-info", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    // Over-cap probes still succeed; only conversion rejects
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["duration_warning"].as_str().unwrap().contains("30-minute"));
}

#[tokio::test]
async fn video_info_rejects_invalid_url() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(json_request(
            "/video-info",
            json!({ "url": "https://example.com/watch?v=abc" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid YouTube URL");
}

#[tokio::test]
async fn video_info_sanitizes_engine_failures() {
    let engine = MockEngine::default().with_probe_error(crate::Error::SourceUnavailable(
        "yt-dlp: ERROR secret internals".to_string(),
    ));
    let (app, _converter, _dir) = create_test_app(engine, |_| {});

    let response = app
        .oneshot(json_request("/video-info", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(!message.contains("secret internals"));
    assert!(message.contains("Failed to fetch"));
}

#[tokio::test]
async fn malformed_json_body_is_bad_request() {
    let (app, _converter, _dir) = default_app();

    let request = Request::builder()
        .method("POST")
        .uri("/video-info")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn oversized_body_is_payload_too_large() {
    let (app, _converter, _dir) = create_test_app(MockEngine::default(), |config| {
        config.server.max_body_bytes = 64;
    });

    let big_url = format!("https://www.youtube.com/watch?v=dQw4w9WgXcQ&x={}", "a".repeat(256));
    let response = app
        .oneshot(json_request("/video-info", json!({ "url": big_url })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Request too large");
}

#[tokio::test]
async fn convert_streams_the_file_and_drops_the_task() {
    let (app, converter, _dir) = default_app();

    let response = app
        .oneshot(json_request(
            "/convert",
            json!({ "url": VALID_URL, "bitrate": 192 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        HeaderValue::from_static("audio/mpeg")
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("Test Video.mp3"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"mp3 bytes");

    // The registry entry is gone once the file has been handed out
    assert!(converter.registry.is_empty().await);
}

#[tokio::test]
async fn convert_defaults_bitrate_when_omitted() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(json_request("/convert", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn convert_rejects_out_of_range_bitrates() {
    let (app, _converter, _dir) = default_app();

    for bitrate in [63, 321] {
        let response = app
            .clone()
            .oneshot(json_request(
                "/convert",
                json!({ "url": VALID_URL, "bitrate": bitrate }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{bitrate}");
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("64 and 320"));
    }
}

#[tokio::test]
async fn convert_rejects_over_cap_duration_with_the_limit() {
    let (app, _converter, _dir) =
        create_test_app(MockEngine::default().with_duration(3600), |_| {});

    let response = app
        .oneshot(json_request("/convert", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("1800"));
}

#[tokio::test]
async fn progress_of_unknown_task_is_404() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(Request::get("/progress/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Task not found");
}

#[tokio::test]
async fn progress_reports_the_latest_snapshot() {
    let (app, converter, _dir) = default_app();

    // Drive a conversion to completion outside the HTTP layer so the entry
    // survives for polling
    let finished = converter.convert(VALID_URL, 128).await.unwrap();

    let response = app
        .oneshot(
            Request::get(format!("/progress/{}", finished.task_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let snapshot: TaskSnapshot = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(snapshot.progress.status, Status::Completed);
    assert_eq!(snapshot.video_info.unwrap().title, "Test Video");
}

#[tokio::test]
async fn download_of_in_flight_task_is_not_ready() {
    let (app, converter, _dir) = default_app();
    let task_id = converter.registry.create().await;

    let response = app
        .oneshot(
            Request::get(format!("/download/{task_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Download not completed yet");
}

#[tokio::test]
async fn first_download_claims_the_task() {
    let (app, converter, _dir) = default_app();
    let finished = converter.convert(VALID_URL, 128).await.unwrap();
    let uri = format!("/download/{}", finished.task_id);

    let response = app
        .clone()
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        HeaderValue::from_static("audio/mpeg")
    );

    // Both the repeat download and the progress poll now miss
    let repeat = app
        .clone()
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(repeat.status(), StatusCode::NOT_FOUND);

    let progress = app
        .oneshot(
            Request::get(format!("/progress/{}", finished.task_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(progress.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn progress_stream_rejects_unknown_task() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(
            Request::get("/progress/missing/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn progress_stream_opens_for_known_task() {
    let (app, converter, _dir) = default_app();
    let task_id = converter.registry.create().await;

    let response = app
        .oneshot(
            Request::get(format!("/progress/{task_id}/stream"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        HeaderValue::from_static("text/event-stream")
    );
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(Request::get("/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/convert"].is_object());
}

#[tokio::test]
async fn permissive_cors_allows_any_origin() {
    let (app, _converter, _dir) = default_app();

    let response = app
        .oneshot(
            Request::get("/health")
                .header("Origin", "http://anywhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        HeaderValue::from_static("*")
    );
}

#[tokio::test]
async fn strict_cors_allows_only_listed_origins() {
    let (app, _converter, _dir) = create_test_app(MockEngine::default(), |config| {
        config.server.cors_permissive = false;
        config.server.cors_origins = vec!["http://localhost:3000".to_string()];
    });

    let allowed = app
        .clone()
        .oneshot(
            Request::get("/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        HeaderValue::from_static("http://localhost:3000")
    );

    let denied = app
        .oneshot(
            Request::get("/health")
                .header("Origin", "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(!denied.headers().contains_key("access-control-allow-origin"));
}
