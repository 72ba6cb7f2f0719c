//! Expiring link tests: issuance gating, range validation, public
//! resolution and the conflict over unretained originals.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{
    create_tier, is_valid_jpeg, jpeg_image, json_request, json_request_as, send_json, subscribe,
    test_router, upload_request,
};

async fn upload_image(router: &axum::Router, account: u64) -> String {
    let (status, body) = send_json(
        router,
        upload_request(account, "image/jpeg", jpeg_image(600, 600)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["name"].as_str().unwrap().to_string()
}

fn link_request(account: u64, image_name: &str, seconds: i64) -> Request<Body> {
    json_request_as(
        account,
        "POST",
        "/link",
        serde_json::json!({ "image_name": image_name, "seconds": seconds }),
    )
}

#[tokio::test]
async fn test_generate_and_resolve_link() {
    let router = test_router();
    subscribe(&router, 1, "Enterprise", &[200], true, true).await;
    let image_name = upload_image(&router, 1).await;

    let (status, body) = send_json(&router, link_request(1, &image_name, 400)).await;
    assert_eq!(status, StatusCode::OK);

    // Expiry renders as HH:MM:SS DD.MM.YY.
    let expiring_time = body["expiring_time"].as_str().unwrap();
    assert_eq!(expiring_time.len(), 17);
    assert_eq!(&expiring_time[2..3], ":");
    assert_eq!(&expiring_time[5..6], ":");
    assert_eq!(&expiring_time[11..12], ".");
    assert_eq!(&expiring_time[14..15], ".");

    // The link URL resolves publicly, with no account header.
    let url = body["url"].as_str().unwrap();
    let response = router
        .clone()
        .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&bytes));
}

#[tokio::test]
async fn test_multiple_links_to_the_same_image() {
    let router = test_router();
    subscribe(&router, 1, "Enterprise", &[200], true, true).await;
    let image_name = upload_image(&router, 1).await;

    let (_, first) = send_json(&router, link_request(1, &image_name, 400)).await;
    let (_, second) = send_json(&router, link_request(1, &image_name, 400)).await;
    assert_ne!(first["url"], second["url"]);
}

#[tokio::test]
async fn test_link_generation_requires_the_permission() {
    let router = test_router();
    // Premium retains originals but does not grant links.
    subscribe(&router, 1, "Premium", &[200], true, false).await;
    let image_name = upload_image(&router, 1).await;

    let (status, body) = send_json(&router, link_request(1, &image_name, 400)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "link_not_allowed");
}

#[tokio::test]
async fn test_link_generation_without_subscription_is_forbidden() {
    let router = test_router();
    let (status, _) = send_json(&router, link_request(1, "whatever.jpg", 400)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_seconds_out_of_range() {
    let router = test_router();
    subscribe(&router, 1, "Enterprise", &[200], true, true).await;
    let image_name = upload_image(&router, 1).await;

    for seconds in [-1, 0, 299, 30001] {
        let (status, body) = send_json(&router, link_request(1, &image_name, seconds)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "for {seconds}");
        assert_eq!(body["error"], "seconds_out_of_range");
    }

    // Boundary values pass.
    for seconds in [300, 30000] {
        let (status, _) = send_json(&router, link_request(1, &image_name, seconds)).await;
        assert_eq!(status, StatusCode::OK, "for {seconds}");
    }
}

#[tokio::test]
async fn test_link_over_unretained_original_conflicts() {
    let router = test_router();
    // Upload happens on a tier without original storage...
    subscribe(&router, 1, "Basic", &[200], false, false).await;
    let image_name = upload_image(&router, 1).await;

    // ...then the account moves to a link-granting tier. The live
    // permission check passes, but the image has no stored bytes.
    let enterprise = create_tier(&router, "Enterprise", &[200], true, true).await;
    let (status, _) = send_json(
        &router,
        json_request(
            "PUT",
            "/admin/subscriptions/1",
            serde_json::json!({ "policy": enterprise }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&router, link_request(1, &image_name, 400)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "image_not_linkable");
}

#[tokio::test]
async fn test_link_to_foreign_image_is_not_found() {
    let router = test_router();
    subscribe(&router, 1, "Enterprise", &[200], true, true).await;
    let image_name = upload_image(&router, 1).await;

    subscribe(&router, 2, "Other", &[400], true, true).await;
    let (status, _) = send_json(&router, link_request(2, &image_name, 400)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_link_name_is_not_found() {
    let router = test_router();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/01700000000nothing.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
