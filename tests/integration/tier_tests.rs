//! Tier administration tests: the size catalog, policy creation rules,
//! and subscription lifecycle over the admin API.

use axum::http::StatusCode;

use super::test_utils::{
    bind_account, create_tier, jpeg_image, json_request, send_json, test_router, upload_request,
};

#[tokio::test]
async fn test_size_get_or_create_is_idempotent() {
    let router = test_router();

    let (status, first) = send_json(
        &router,
        json_request("POST", "/admin/sizes", serde_json::json!({ "height": 200 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, second) = send_json(
        &router,
        json_request("POST", "/admin/sizes", serde_json::json!({ "height": 200 })),
    )
    .await;
    assert_eq!(first, second);

    let (_, listed) = send_json(
        &router,
        json_request("GET", "/admin/sizes", serde_json::Value::Null),
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_zero_height_is_rejected() {
    let router = test_router();

    let (status, body) = send_json(
        &router,
        json_request("POST", "/admin/sizes", serde_json::json!({ "height": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_height");
}

#[tokio::test]
async fn test_create_policy_normalizes_the_link_flag() {
    let router = test_router();

    let (status, body) = send_json(
        &router,
        json_request(
            "POST",
            "/admin/tiers",
            serde_json::json!({
                "name": "Odd",
                "sizes": [200],
                "allow_original": false,
                "allow_expiring_link": true,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    // Normalized: a link permission without original retention is inert.
    assert_eq!(body["allow_original"], false);
    assert_eq!(body["allow_expiring_link"], false);
}

#[tokio::test]
async fn test_duplicate_policy_name_rejected() {
    let router = test_router();
    create_tier(&router, "Basic", &[200], false, false).await;

    let (status, body) = send_json(
        &router,
        json_request(
            "POST",
            "/admin/tiers",
            serde_json::json!({ "name": "Basic", "sizes": [400] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "duplicate_name");
}

#[tokio::test]
async fn test_duplicate_bundle_rejected_regardless_of_name() {
    let router = test_router();
    create_tier(&router, "Basic", &[200, 400], false, false).await;

    // Same size set (different order) and flags under a new name.
    let (status, body) = send_json(
        &router,
        json_request(
            "POST",
            "/admin/tiers",
            serde_json::json!({ "name": "Rebranded", "sizes": [400, 200] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "duplicate_policy");

    // Different flags make it a different bundle.
    let (status, _) = send_json(
        &router,
        json_request(
            "POST",
            "/admin/tiers",
            serde_json::json!({ "name": "Premium", "sizes": [400, 200], "allow_original": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_policy_requires_sizes() {
    let router = test_router();

    let (status, body) = send_json(
        &router,
        json_request(
            "POST",
            "/admin/tiers",
            serde_json::json!({ "name": "Empty", "sizes": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_policy");
}

#[tokio::test]
async fn test_binding_is_one_to_one() {
    let router = test_router();
    let basic = create_tier(&router, "Basic", &[200], false, false).await;
    let premium = create_tier(&router, "Premium", &[200], true, false).await;

    bind_account(&router, 1, basic).await;

    let (status, body) = send_json(
        &router,
        json_request(
            "POST",
            "/admin/subscriptions",
            serde_json::json!({ "account": 1, "policy": premium }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "already_subscribed");
}

#[tokio::test]
async fn test_tier_change_rejects_no_op() {
    let router = test_router();
    let basic = create_tier(&router, "Basic", &[200], false, false).await;
    bind_account(&router, 1, basic).await;

    let (status, body) = send_json(
        &router,
        json_request(
            "PUT",
            "/admin/subscriptions/1",
            serde_json::json!({ "policy": basic }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "same_tier");
}

#[tokio::test]
async fn test_tier_change_is_visible_immediately() {
    let router = test_router();
    let basic = create_tier(&router, "Basic", &[200], false, false).await;
    let premium = create_tier(&router, "Premium", &[400], true, false).await;
    bind_account(&router, 1, basic).await;

    let (status, _) = send_json(
        &router,
        json_request(
            "PUT",
            "/admin/subscriptions/1",
            serde_json::json!({ "policy": premium }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The very next upload runs under the new tier.
    let (status, body) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(600, 600))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["thumbnails"][0]["size"], "400px");
    assert!(body["url"].as_str().is_some());
}

#[tokio::test]
async fn test_cancel_subscription_closes_the_upload_path() {
    let router = test_router();
    let basic = create_tier(&router, "Basic", &[200], false, false).await;
    bind_account(&router, 1, basic).await;

    let (status, _) = send_json(
        &router,
        json_request("DELETE", "/admin/subscriptions/1", serde_json::Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(64, 48))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_policy_deletion_cascades_to_subscribers() {
    let router = test_router();
    let basic = create_tier(&router, "Basic", &[200], false, false).await;
    bind_account(&router, 1, basic).await;

    let (status, _) = send_json(
        &router,
        json_request(
            "DELETE",
            &format!("/admin/tiers/{basic}"),
            serde_json::Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The subscriber lost its permissions with the policy.
    let (status, _) = send_json(&router, upload_request(1, "image/jpeg", jpeg_image(64, 48))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_unknown_policy_is_not_found() {
    let router = test_router();
    let (status, _) = send_json(
        &router,
        json_request("DELETE", "/admin/tiers/999", serde_json::Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
