//! Image listing and detail tests, plus the health probe.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use super::test_utils::{
    get_as, jpeg_image, send_json, subscribe, test_router, upload_request,
};

#[tokio::test]
async fn test_health() {
    let router = test_router();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].as_str().is_some());
}

#[tokio::test]
async fn test_images_listing_requires_account_identity() {
    let router = test_router();

    let request = Request::builder()
        .uri("/images")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_images_lists_own_images_newest_first() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;
    subscribe(&router, 2, "Other", &[400], false, false).await;

    let (_, first) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(300, 300))).await;
    let (_, second) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(300, 300))).await;
    send_json(&router, upload_request(2, "image/jpeg", jpeg_image(300, 300))).await;

    let (status, body) = send_json(&router, get_as(1, "/images")).await;
    assert_eq!(status, StatusCode::OK);

    let images = body.as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["name"], second["name"]);
    assert_eq!(images[1]["name"], first["name"]);

    // The plain listing links to details and omits thumbnails.
    let details = images[0]["details"].as_str().unwrap();
    assert!(details.ends_with(&format!(
        "/images/details/{}",
        images[0]["name"].as_str().unwrap()
    )));
    assert!(images[0].get("thumbnails").is_none());
    // No original retained on this tier: url omitted.
    assert!(images[0].get("url").is_none());
}

#[tokio::test]
async fn test_images_details_nests_thumbnails() {
    let router = test_router();
    subscribe(&router, 1, "Premium", &[200, 400], true, false).await;
    send_json(&router, upload_request(1, "image/jpeg", jpeg_image(600, 600))).await;

    let (status, body) = send_json(&router, get_as(1, "/images/details")).await;
    assert_eq!(status, StatusCode::OK);

    let images = body.as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert!(images[0]["url"].as_str().unwrap().contains("/media/"));

    let thumbnails = images[0]["thumbnails"].as_array().unwrap();
    let sizes: Vec<&str> = thumbnails
        .iter()
        .map(|t| t["size"].as_str().unwrap())
        .collect();
    assert_eq!(sizes, vec!["400px", "200px"]);
    for thumbnail in thumbnails {
        assert!(thumbnail["url"].as_str().unwrap().contains("/media/"));
    }
}

#[tokio::test]
async fn test_single_image_details() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;
    let (_, uploaded) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(300, 300))).await;
    let name = uploaded["name"].as_str().unwrap();

    let (status, body) = send_json(&router, get_as(1, &format!("/images/details/{name}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], uploaded["name"]);
    assert_eq!(body["thumbnails"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_single_image_details_validates_the_name() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;

    let (status, body) = send_json(&router, get_as(1, "/images/details/whatever.gif")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_name");
}

#[tokio::test]
async fn test_single_image_details_missing_and_foreign_look_the_same() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;
    subscribe(&router, 2, "Other", &[400], false, false).await;
    let (_, uploaded) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(300, 300))).await;
    let name = uploaded["name"].as_str().unwrap();

    let (missing_status, _) = send_json(&router, get_as(1, "/images/details/absent.jpg")).await;
    let (foreign_status, _) =
        send_json(&router, get_as(2, &format!("/images/details/{name}"))).await;

    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
}
