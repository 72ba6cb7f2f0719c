//! Test utilities for integration tests.
//!
//! Helpers for building a fresh in-memory router, generating small test
//! images, and driving the API with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{GrayImage, Luma, RgbImage};
use tower::ServiceExt;

use pixtier::store::{MemoryBlobStore, MemoryMetaStore};
use pixtier::{create_router, HostService, RouterConfig};

/// Build a fresh router over empty in-memory stores.
pub fn test_router() -> Router {
    let service = HostService::new(
        Arc::new(MemoryMetaStore::new()),
        Arc::new(MemoryBlobStore::new()),
    );
    create_router(service, RouterConfig::new().with_tracing(false))
}

/// A small JPEG test image.
pub fn jpeg_image(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]));
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, 90);
    image::DynamicImage::ImageLuma8(img)
        .write_with_encoder(encoder)
        .unwrap();
    buf
}

/// A small PNG test image.
pub fn png_image(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_with_encoder(PngEncoder::new(&mut buf))
        .unwrap();
    buf
}

pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

pub fn is_valid_png(data: &[u8]) -> bool {
    data.len() >= 8 && data[..8] == [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
}

/// Send a request and return `(status, json body)`.
pub async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Build an authenticated GET request.
pub fn get_as(account: u64, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-account-id", account.to_string())
        .body(Body::empty())
        .unwrap()
}

/// Build an authenticated JSON request.
pub fn json_request_as(
    account: u64,
    method: &str,
    uri: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-account-id", account.to_string())
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build an unauthenticated JSON request (admin routes).
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build an authenticated image upload request.
pub fn upload_request(account: u64, content_type: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("x-account-id", account.to_string())
        .header("content-type", content_type)
        .body(Body::from(bytes))
        .unwrap()
}

/// Create a tier through the admin API and return its id.
pub async fn create_tier(
    router: &Router,
    name: &str,
    sizes: &[u32],
    allow_original: bool,
    allow_expiring_link: bool,
) -> u64 {
    let (status, body) = send_json(
        router,
        json_request(
            "POST",
            "/admin/tiers",
            serde_json::json!({
                "name": name,
                "sizes": sizes,
                "allow_original": allow_original,
                "allow_expiring_link": allow_expiring_link,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "tier creation failed: {body}");
    body["id"].as_u64().unwrap()
}

/// Bind an account to a tier through the admin API.
pub async fn bind_account(router: &Router, account: u64, policy: u64) {
    let (status, body) = send_json(
        router,
        json_request(
            "POST",
            "/admin/subscriptions",
            serde_json::json!({ "account": account, "policy": policy }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "bind failed: {body}");
}

/// Create a tier and bind an account to it in one step.
pub async fn subscribe(
    router: &Router,
    account: u64,
    name: &str,
    sizes: &[u32],
    allow_original: bool,
    allow_expiring_link: bool,
) -> u64 {
    let policy = create_tier(router, name, sizes, allow_original, allow_expiring_link).await;
    bind_account(router, account, policy).await;
    policy
}
