//! # Server Tests
//!
//! Drives the HTTP router in-process with `tower::ServiceExt::oneshot`,
//! following one browser session from upload to export.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use formfill::config::OverlayConfig;
use formfill::extract::{FieldSource, StaticFieldSource};
use formfill::fields::FieldMap;
use formfill::render::font::FontBook;
use formfill::server::{self, AppState, ServerConfig};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "formfill-test-boundary";

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn app_with(extractor: Option<Arc<dyn FieldSource>>) -> Router {
    let config = ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        extractor_url: None,
        overlay: OverlayConfig::default(),
    };
    server::router(Arc::new(AppState::new(
        config,
        Arc::new(FontBook::builtin()),
        extractor,
    )))
}

fn app() -> Router {
    app_with(None)
}

fn blank_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255; 4])))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send_empty(app: &Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn upload(app: &Router, uri: &str, field: &str, data: &[u8]) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, "upload.png", "image/png", data)))
        .unwrap();
    send(app, request).await
}

async fn create_session(app: &Router) -> String {
    let (status, body) = send_empty(app, Method::POST, "/api/sessions").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["output_filename"], "filled-form.png");
    body["id"].as_str().unwrap().to_string()
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_full_session_exports_png() {
    let app = app();
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{}", id);

    let (status, body) = upload(&app, &format!("{}/template", base), "image", &blank_png(300, 200)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["natural_width"], 300);
    assert_eq!(body["natural_height"], 200);
    assert_eq!(body["applied"], true);

    let (status, _) = send_json(
        &app,
        Method::PUT,
        &format!("{}/display", base),
        json!({"width": 150.0, "height": 100.0}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_json(
        &app,
        Method::POST,
        &format!("{}/fields", base),
        json!({"Name": "Jane Roe", "Age": 42}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let elements = json_body(&body);
    assert_eq!(elements.as_array().unwrap().len(), 2);
    assert_eq!(elements[1]["text"], "42");
    let element_id = elements[0]["id"].as_u64().unwrap();

    let (status, _) = send_json(
        &app,
        Method::PUT,
        &format!("{}/elements/{}/position", base, element_id),
        json!({"x": 500.0, "y": 20.0}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send_empty(&app, Method::GET, &format!("{}/elements", base)).await;
    let elements = json_body(&body);
    assert_eq!(elements[0]["x"], 150.0);
    assert_eq!(elements[0]["y"], 20.0);

    let request = Request::builder()
        .uri(format!("{}/export", base))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"filled-form.png\""
    );
    let png = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 200));
}

#[tokio::test]
async fn test_export_without_template_conflicts() {
    let app = app();
    let id = create_session(&app).await;

    let (status, body) = send_empty(&app, Method::GET, &format!("/api/sessions/{}/export", id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json_body(&body)["success"], false);
}

#[tokio::test]
async fn test_export_without_display_conflicts() {
    let app = app();
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{}", id);
    upload(&app, &format!("{}/template", base), "image", &blank_png(40, 40)).await;

    let (status, _) = send_empty(&app, Method::GET, &format!("{}/export", base)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Reported, then unmounted again
    send_json(&app, Method::PUT, &format!("{}/display", base), json!({"width": 20.0, "height": 20.0})).await;
    let (status, _) = send_empty(&app, Method::DELETE, &format!("{}/display", base)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send_empty(&app, Method::GET, &format!("{}/export", base)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_upload_discards_earlier_display_report() {
    let app = app();
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{}", id);
    upload(&app, &format!("{}/template", base), "image", &blank_png(40, 40)).await;
    send_json(&app, Method::PUT, &format!("{}/display", base), json!({"width": 20.0, "height": 20.0})).await;

    // The size was measured for the previous template
    upload(&app, &format!("{}/template", base), "image", &blank_png(60, 30)).await;
    let (status, _) = send_empty(&app, Method::GET, &format!("{}/export", base)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send_json(&app, Method::PUT, &format!("{}/display", base), json!({"width": 30.0, "height": 15.0})).await;
    let (status, _) = send_empty(&app, Method::GET, &format!("{}/export", base)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_export_with_huge_text_and_tiny_display() {
    let app = app();
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{}", id);
    upload(&app, &format!("{}/template", base), "image", &blank_png(120, 80)).await;
    send_json(&app, Method::PUT, &format!("{}/display", base), json!({"width": 0.01, "height": 0.01})).await;

    let (_, body) = send_empty(&app, Method::POST, &format!("{}/fields", base)).await;
    let element_id = json_body(&body)[0]["id"].as_u64().unwrap();
    send_json(
        &app,
        Method::PATCH,
        &format!("{}/elements/{}/style", base, element_id),
        json!({"field": "font_size", "value": 1e20}),
    )
    .await;
    let (_, body) = send_empty(&app, Method::GET, &format!("{}/elements", base)).await;
    assert_eq!(json_body(&body)[0]["font_size_px"], 1000.0);

    let (status, png) = send_empty(&app, Method::GET, &format!("{}/export", base)).await;
    assert_eq!(status, StatusCode::OK);
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (120, 80));
}

#[tokio::test]
async fn test_invalid_display_size_rejected() {
    let app = app();
    let id = create_session(&app).await;
    let (status, _) = send_json(
        &app,
        Method::PUT,
        &format!("/api/sessions/{}/display", id),
        json!({"width": 0.0, "height": 100.0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_template_rejected() {
    let app = app();
    let id = create_session(&app).await;
    let (status, _) = upload(&app, &format!("/api/sessions/{}/template", id), "image", b"plain text").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_template_round_trips_original_bytes() {
    let app = app();
    let id = create_session(&app).await;
    let png = blank_png(12, 8);
    upload(&app, &format!("/api/sessions/{}/template", id), "image", &png).await;

    let (status, body) = send_empty(&app, Method::GET, &format!("/api/sessions/{}/template", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, png);
}

#[tokio::test]
async fn test_stale_element_updates_are_ignored() {
    let app = app();
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{}", id);

    let (_, body) = send_empty(&app, Method::POST, &format!("{}/fields", base)).await;
    let first_batch = json_body(&body);
    assert_eq!(first_batch.as_array().unwrap().len(), 3);
    let stale = first_batch[0]["id"].as_u64().unwrap();

    let (_, body) = send_json(&app, Method::POST, &format!("{}/fields", base), json!({"Only": "one"})).await;
    let second_batch = json_body(&body);

    let (status, _) = send_json(
        &app,
        Method::PUT,
        &format!("{}/elements/{}/position", base, stale),
        json!({"x": 1.0, "y": 1.0}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_json(
        &app,
        Method::PATCH,
        &format!("{}/elements/{}/style", base, stale),
        json!({"field": "color", "value": "#ff0000"}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send_empty(&app, Method::GET, &format!("{}/elements", base)).await;
    assert_eq!(json_body(&body), second_batch);
}

#[tokio::test]
async fn test_style_update() {
    let app = app();
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{}", id);

    let (_, body) = send_empty(&app, Method::POST, &format!("{}/fields", base)).await;
    let element_id = json_body(&body)[1]["id"].as_u64().unwrap();

    let (status, _) = send_json(
        &app,
        Method::PATCH,
        &format!("{}/elements/{}/style", base, element_id),
        json!({"field": "font_size", "value": 32.0}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send_empty(&app, Method::GET, &format!("{}/elements", base)).await;
    assert_eq!(json_body(&body)[1]["font_size_px"], 32.0);
}

#[tokio::test]
async fn test_drag_over_http() {
    let app = app();
    let id = create_session(&app).await;
    let base = format!("/api/sessions/{}", id);
    upload(&app, &format!("{}/template", base), "image", &blank_png(300, 200)).await;
    send_json(&app, Method::PUT, &format!("{}/display", base), json!({"width": 300.0, "height": 200.0})).await;
    let (_, body) = send_empty(&app, Method::POST, &format!("{}/fields", base)).await;
    let element_id = json_body(&body)[0]["id"].as_u64().unwrap();

    let drag = format!("{}/drag", base);
    let (_, body) = send_json(&app, Method::POST, &drag, json!({"event": "down", "x": 55.0, "y": 55.0})).await;
    let body = json_body(&body);
    assert_eq!(body["element"], element_id);
    assert_eq!(body["dragging"], true);

    let (_, body) = send_json(&app, Method::POST, &drag, json!({"event": "move", "x": 1000.0, "y": 105.0})).await;
    let body = json_body(&body);
    assert_eq!(body["position"], json!({"x": 300.0, "y": 100.0}));

    let (_, body) = send_json(&app, Method::POST, &drag, json!({"event": "up"})).await;
    let body = json_body(&body);
    assert_eq!(body["dragging"], false);
    assert_eq!(body["position"], json!({"x": 300.0, "y": 100.0}));

    let (_, body) = send_empty(&app, Method::GET, &format!("{}/elements", base)).await;
    assert_eq!(json_body(&body)[0]["x"], 300.0);
}

#[tokio::test]
async fn test_extract_loads_fields() {
    let fields: FieldMap = [("Passport", "X1234567")].into_iter().collect();
    let app = app_with(Some(Arc::new(StaticFieldSource(fields))));
    let id = create_session(&app).await;

    let (status, body) = upload(
        &app,
        &format!("/api/sessions/{}/extract?document_type=passport", id),
        "file",
        b"scan",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let elements = json_body(&body);
    assert_eq!(elements[0]["label"], "Passport");
    assert_eq!(elements[0]["text"], "X1234567");
}

#[tokio::test]
async fn test_extract_without_service() {
    let app = app();
    let id = create_session(&app).await;
    let (status, _) = upload(&app, &format!("/api/sessions/{}/extract", id), "file", b"scan").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_and_deleted_sessions() {
    let app = app();
    let (status, _) = send_empty(&app, Method::GET, "/api/sessions/not-a-uuid/elements").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = create_session(&app).await;
    let (status, _) = send_empty(&app, Method::DELETE, &format!("/api/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_empty(&app, Method::GET, &format!("/api/sessions/{}/elements", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
