//! Upload flow tests: policy gating, thumbnail fan-out, original
//! retention, and the tier-scenario end to end.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{
    get_as, is_valid_jpeg, jpeg_image, png_image, send_json, subscribe, test_router,
    upload_request,
};

#[tokio::test]
async fn test_upload_requires_account_identity() {
    let router = test_router();

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "image/jpeg")
        .body(Body::from(jpeg_image(64, 48)))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_without_subscription_is_forbidden() {
    let router = test_router();

    let (status, body) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(64, 48))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_subscribed");
}

#[tokio::test]
async fn test_upload_basic_tier() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;

    let (status, body) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(600, 600))).await;
    assert_eq!(status, StatusCode::CREATED);

    let name = body["name"].as_str().unwrap();
    assert!(name.starts_with('1'));
    assert!(name.ends_with(".jpg"));

    // No original retained: the url field is omitted entirely.
    assert!(body.get("url").is_none());

    let thumbnails = body["thumbnails"].as_array().unwrap();
    assert_eq!(thumbnails.len(), 1);
    assert_eq!(
        thumbnails[0]["name"].as_str().unwrap(),
        name.replace(".jpg", "_200.jpg")
    );
    assert_eq!(thumbnails[0]["size"], "200px");
}

#[tokio::test]
async fn test_upload_premium_tier_keeps_original_and_fans_out() {
    let router = test_router();
    subscribe(&router, 1, "Premium", &[200, 400], true, false).await;

    let (status, body) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(600, 600))).await;
    assert_eq!(status, StatusCode::CREATED);

    // Original retained: url present.
    assert!(body["url"].as_str().unwrap().contains("/media/"));

    // Thumbnails derive tallest first.
    let sizes: Vec<&str> = body["thumbnails"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["size"].as_str().unwrap())
        .collect();
    assert_eq!(sizes, vec!["400px", "200px"]);
}

#[tokio::test]
async fn test_upload_png() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;

    let (status, body) = send_json(&router, upload_request(1, "image/png", png_image(300, 300))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["name"].as_str().unwrap().ends_with(".png"));
    let thumb_name = body["thumbnails"][0]["name"].as_str().unwrap();
    assert!(thumb_name.ends_with("_200.png"));

    // A png upload derives a png thumbnail.
    let response = router
        .clone()
        .oneshot(get_as(1, &format!("/media/{thumb_name}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(super::test_utils::is_valid_png(&bytes));
}

#[tokio::test]
async fn test_upload_rejects_unknown_content_type() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;

    let (status, body) = send_json(&router, upload_request(1, "image/gif", jpeg_image(64, 48))).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "unsupported_media_type");
}

#[tokio::test]
async fn test_upload_rejects_undecodable_body() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;

    let (status, body) = send_json(
        &router,
        upload_request(1, "image/jpeg", b"definitely not an image".to_vec()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "undecodable_image");

    // The image record was created before the thumbnail step failed and
    // stays in place — at-least-once, no compensation.
    let (status, body) = send_json(&router, get_as(1, "/images/details")).await;
    assert_eq!(status, StatusCode::OK);
    let images = body.as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert!(images[0]["thumbnails"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_tier_scenario_end_to_end() {
    let router = test_router();

    // Account on a tier granting only 200px, no original storage.
    subscribe(&router, 1, "Basic", &[200], false, false).await;

    let (status, first) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(600, 600))).await;
    assert_eq!(status, StatusCode::CREATED);
    let first_name = first["name"].as_str().unwrap();
    assert!(first.get("url").is_none());
    let thumbs = first["thumbnails"].as_array().unwrap();
    assert_eq!(thumbs.len(), 1);
    assert_eq!(
        thumbs[0]["name"].as_str().unwrap(),
        format!("{}_200.jpg", first_name.trim_end_matches(".jpg"))
    );

    // Change the account to a tier that no longer grants 200px.
    let tall = super::test_utils::create_tier(&router, "Tall", &[400], false, false).await;
    let (status, _) = send_json(
        &router,
        super::test_utils::json_request(
            "PUT",
            "/admin/subscriptions/1",
            serde_json::json!({ "policy": tall }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The next upload derives no 200px thumbnail.
    let (status, second) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(600, 600))).await;
    assert_eq!(status, StatusCode::CREATED);
    let names: Vec<&str> = second["thumbnails"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.iter().all(|n| !n.contains("_200.")));
}

#[tokio::test]
async fn test_media_serves_thumbnail_to_owner_only() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;

    let (_, body) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(600, 600))).await;
    let thumb_name = body["thumbnails"][0]["name"].as_str().unwrap().to_string();

    // Owner fetch succeeds with the right content type.
    let response = router
        .clone()
        .oneshot(get_as(1, &format!("/media/{thumb_name}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert!(response.headers().contains_key("cache-control"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&bytes));

    // Another account sees a 404, indistinguishable from absence.
    let (status, _) = send_json(&router, get_as(2, &format!("/media/{thumb_name}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_media_does_not_serve_unretained_originals() {
    let router = test_router();
    subscribe(&router, 1, "Basic", &[200], false, false).await;

    let (_, body) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(600, 600))).await;
    let image_name = body["name"].as_str().unwrap().to_string();

    let (status, _) = send_json(&router, get_as(1, &format!("/media/{image_name}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
