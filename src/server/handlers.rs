//! HTTP request handlers and response shaping.
//!
//! Handlers stay thin: extract, call [`HostService`], render. The DTOs
//! here define the wire shape — optional fields are omitted rather than
//! sent as null, thumbnail sizes render as `"<height>px"` labels, and
//! link expiry renders as `HH:MM:SS DD.MM.YY`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{AssetError, ErrorClass, LinkError, ResizeError, StoreError};
use crate::service::{HostService, ServedAsset, ServiceError, UploadOutcome};
use crate::store::{
    AccountId, BlobStore, ImageRecord, LinkRecord, MetaStore, PolicyRecord, SizeRecord,
    SubscriptionRecord, ThumbnailRecord,
};
use crate::tier::PolicyId;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state handed to every handler.
pub struct AppState<M: MetaStore, B: BlobStore> {
    pub service: Arc<HostService<M, B>>,

    /// Cache-Control max-age for owner asset responses. Assets are
    /// write-once, so long client caching is safe.
    pub cache_max_age: u32,

    /// Base URL prefixed to rendered asset/link URLs. Empty means
    /// path-relative URLs.
    pub public_url: String,
}

impl<M: MetaStore, B: BlobStore> AppState<M, B> {
    pub fn new(service: HostService<M, B>) -> Self {
        Self {
            service: Arc::new(service),
            cache_max_age: 3600,
            public_url: String::new(),
        }
    }

    fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.public_url, path)
    }
}

impl<M: MetaStore, B: BlobStore> Clone for AppState<M, B> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache_max_age: self.cache_max_age,
            public_url: self.public_url.clone(),
        }
    }
}

// =============================================================================
// Account Extractor
// =============================================================================

/// Header carrying the authenticated account identity, set by the
/// fronting session layer.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Extractor for the authenticated account.
///
/// The core never authenticates; it trusts the identity the external
/// session resolver injected. Requests without one are rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct Account(pub AccountId);

impl<S> FromRequestParts<S> for Account
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        match value {
            Some(id) => Ok(Account(AccountId(id))),
            None => {
                debug!("request without a resolved account identity");
                let body = ErrorResponse::with_status(
                    "unauthenticated",
                    "No authenticated account",
                    StatusCode::UNAUTHORIZED,
                );
                Err((StatusCode::UNAUTHORIZED, Json(body)).into_response())
            }
        }
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Body of `POST /link`.
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub image_name: String,
    pub seconds: i64,
}

/// Body of `POST /admin/sizes`.
#[derive(Debug, Deserialize)]
pub struct CreateSizeRequest {
    pub height: u32,
}

/// Body of `POST /admin/tiers`.
#[derive(Debug, Deserialize)]
pub struct CreatePolicyRequest {
    pub name: String,
    pub sizes: Vec<u32>,
    #[serde(default)]
    pub allow_original: bool,
    #[serde(default)]
    pub allow_expiring_link: bool,
}

/// Body of `POST /admin/subscriptions`.
#[derive(Debug, Deserialize)]
pub struct BindSubscriptionRequest {
    pub account: AccountId,
    pub policy: PolicyId,
}

/// Body of `PUT /admin/subscriptions/{account}`.
#[derive(Debug, Deserialize)]
pub struct ChangeTierRequest {
    pub policy: PolicyId,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g. "not_found", "duplicate_policy")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// One image as rendered to its owner. Optional fields are omitted, not
/// null.
#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub name: String,

    /// Link to the single-image details endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// URL of the stored original, present only when it was retained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Vec<ThumbnailResponse>>,
}

/// One thumbnail as rendered to its owner.
#[derive(Debug, Serialize)]
pub struct ThumbnailResponse {
    pub name: String,
    /// Size label, e.g. `"200px"`.
    pub size: String,
    pub url: String,
}

/// Response of `POST /link`.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub url: String,
    /// Absolute expiry, formatted `HH:MM:SS DD.MM.YY`.
    pub expiring_time: String,
}

/// Render a unix timestamp as the link-expiry wire format.
pub fn format_expiry(unix_seconds: u64) -> String {
    DateTime::from_timestamp(unix_seconds as i64, 0)
        .map(|dt| dt.format("%H:%M:%S %d.%m.%y").to_string())
        .unwrap_or_default()
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Map a service error to its HTTP status and error code.
///
/// The base mapping follows the error class (400 / 422 / 404 / 409 / 503)
/// with permission-shaped refusals rendered as 403 and the unsupported
/// upload content type as 415, matching the surrounding API's contract.
fn status_and_code(err: &ServiceError) -> (StatusCode, &'static str) {
    match err {
        ServiceError::LinkNotAllowed => (StatusCode::FORBIDDEN, "link_not_allowed"),
        ServiceError::Subscription(e) => match e {
            crate::error::SubscriptionError::NotSubscribed { .. } => {
                (StatusCode::FORBIDDEN, "not_subscribed")
            }
            crate::error::SubscriptionError::AlreadyBound { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "already_subscribed")
            }
            crate::error::SubscriptionError::NoOpChange => {
                (StatusCode::UNPROCESSABLE_ENTITY, "same_tier")
            }
            crate::error::SubscriptionError::Store(e) => store_status(e),
        },
        ServiceError::UnsupportedMediaType { .. } => {
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
        }
        ServiceError::Catalog(e) => match e {
            crate::error::CatalogError::InvalidHeight { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_height")
            }
            crate::error::CatalogError::Store(e) => store_status(e),
        },
        ServiceError::Policy(e) => match e {
            crate::error::PolicyError::EmptyName
            | crate::error::PolicyError::NameTooLong { .. }
            | crate::error::PolicyError::EmptySizes => {
                (StatusCode::BAD_REQUEST, "invalid_policy")
            }
            crate::error::PolicyError::DuplicateName { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "duplicate_name")
            }
            crate::error::PolicyError::DuplicateBundle => {
                (StatusCode::UNPROCESSABLE_ENTITY, "duplicate_policy")
            }
            crate::error::PolicyError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            crate::error::PolicyError::Store(e) => store_status(e),
        },
        ServiceError::Asset(e) => match e {
            AssetError::UnsupportedExtension { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unsupported_extension")
            }
            AssetError::InvalidName { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_name"),
            AssetError::NotPermitted { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "thumbnail_not_permitted")
            }
            AssetError::NameCollision { .. } => (StatusCode::CONFLICT, "name_collision"),
            AssetError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AssetError::Resize(ResizeError::Decode { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "undecodable_image")
            }
            AssetError::Resize(ResizeError::Encode { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encode_error")
            }
            AssetError::Store(e) => store_status(e),
        },
        ServiceError::Link(e) => match e {
            LinkError::SecondsOutOfRange { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "seconds_out_of_range")
            }
            LinkError::NotLinkable { .. } => (StatusCode::CONFLICT, "image_not_linkable"),
            LinkError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            LinkError::Store(e) => store_status(e),
        },
        ServiceError::Store(e) => store_status(e),
    }
}

fn store_status(err: &StoreError) -> (StatusCode, &'static str) {
    match err.class() {
        ErrorClass::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ErrorClass::Conflict => (StatusCode::CONFLICT, "storage_conflict"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "storage_error"),
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_type) = status_and_code(&self);
        let message = self.to_string();

        if status.is_server_error() || status == StatusCode::SERVICE_UNAVAILABLE {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "request failed: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "request failed: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "request rejected: {}",
                message
            );
        }

        let body = ErrorResponse::with_status(error_type, message, status);
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// DTO Assembly
// =============================================================================

impl<M: MetaStore, B: BlobStore> AppState<M, B> {
    fn render_thumbnail(&self, thumbnail: &ThumbnailRecord) -> ThumbnailResponse {
        ThumbnailResponse {
            name: thumbnail.name.clone(),
            size: format!("{}px", thumbnail.height),
            url: self.absolute(&format!("/media/{}", thumbnail.blob)),
        }
    }

    fn render_image(
        &self,
        image: &ImageRecord,
        thumbnails: Option<&[ThumbnailRecord]>,
        with_details: bool,
    ) -> ImageResponse {
        ImageResponse {
            name: image.name.clone(),
            details: with_details
                .then(|| self.absolute(&format!("/images/details/{}", image.name))),
            url: image
                .blob
                .as_deref()
                .map(|blob| self.absolute(&format!("/media/{blob}"))),
            thumbnails: thumbnails
                .map(|list| list.iter().map(|t| self.render_thumbnail(t)).collect()),
        }
    }

    fn render_link(&self, link: &LinkRecord) -> LinkResponse {
        LinkResponse {
            url: self.absolute(&format!("/{}", link.name)),
            expiring_time: format_expiry(link.expires_at),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /upload` — raw image body, `content-type: image/jpeg|image/png`.
pub async fn upload_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Account(account): Account,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServiceError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let UploadOutcome { image, thumbnails } =
        state.service.upload(account, &content_type, body).await?;

    let rendered = state.render_image(&image, Some(&thumbnails), false);
    Ok((StatusCode::CREATED, Json(rendered)).into_response())
}

/// `GET /images` — the caller's images, newest first.
pub async fn images_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Account(account): Account,
) -> Result<Json<Vec<ImageResponse>>, ServiceError> {
    let images = state.service.list_images(account).await?;
    let rendered = images
        .iter()
        .map(|image| state.render_image(image, None, true))
        .collect();
    Ok(Json(rendered))
}

/// `GET /images/details` — the caller's images with nested thumbnails.
pub async fn images_details_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Account(account): Account,
) -> Result<Json<Vec<ImageResponse>>, ServiceError> {
    let images = state.service.list_images(account).await?;
    let mut rendered = Vec::with_capacity(images.len());
    for image in &images {
        let thumbnails = state.service.thumbnails_of(&image.name).await?;
        rendered.push(state.render_image(image, Some(&thumbnails), false));
    }
    Ok(Json(rendered))
}

/// `GET /images/details/{image_name}` — one image with thumbnails.
pub async fn image_details_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Account(account): Account,
    Path(image_name): Path<String>,
) -> Result<Json<ImageResponse>, ServiceError> {
    let image = state.service.image_details(account, &image_name).await?;
    let thumbnails = state.service.thumbnails_of(&image.name).await?;
    Ok(Json(state.render_image(&image, Some(&thumbnails), false)))
}

/// `POST /link` — mint an expiring link over one of the caller's images.
pub async fn generate_link_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Account(account): Account,
    Json(request): Json<LinkRequest>,
) -> Result<Json<LinkResponse>, ServiceError> {
    let link = state
        .service
        .generate_link(account, &request.image_name, request.seconds)
        .await?;
    Ok(Json(state.render_link(&link)))
}

/// `GET /{link_name}` — public, unauthenticated, expiry-gated.
pub async fn public_image_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Path(link_name): Path<String>,
) -> Result<Response, ServiceError> {
    let asset = state.service.resolve_link(&link_name).await?;
    Ok(serve_bytes(asset, "no-store"))
}

/// `GET /media/{asset_name}` — raw asset bytes for the owner.
pub async fn media_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Account(account): Account,
    Path(asset_name): Path<String>,
) -> Result<Response, ServiceError> {
    let asset = state.service.serve_asset(account, &asset_name).await?;
    let cache_control = format!("private, max-age={}", state.cache_max_age);
    Ok(serve_bytes(asset, &cache_control))
}

fn serve_bytes(asset: ServedAsset, cache_control: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, asset.media_type.to_string()),
            (header::CACHE_CONTROL, cache_control.to_string()),
        ],
        asset.bytes,
    )
        .into_response()
}

// =============================================================================
// Admin Handlers
// =============================================================================

/// `POST /admin/sizes` — register a thumbnail height (idempotent).
pub async fn create_size_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Json(request): Json<CreateSizeRequest>,
) -> Result<Json<SizeRecord>, ServiceError> {
    Ok(Json(
        state.service.get_or_create_size(request.height).await?,
    ))
}

/// `GET /admin/sizes`
pub async fn list_sizes_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
) -> Result<Json<Vec<SizeRecord>>, ServiceError> {
    Ok(Json(state.service.list_sizes().await?))
}

/// `POST /admin/tiers` — create a tier policy.
pub async fn create_policy_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Json(request): Json<CreatePolicyRequest>,
) -> Result<Response, ServiceError> {
    let policy = state
        .service
        .create_policy(
            &request.name,
            &request.sizes,
            request.allow_original,
            request.allow_expiring_link,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(policy)).into_response())
}

/// `GET /admin/tiers`
pub async fn list_policies_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
) -> Result<Json<Vec<PolicyRecord>>, ServiceError> {
    Ok(Json(state.service.list_policies().await?))
}

/// `DELETE /admin/tiers/{id}` — administrative deletion, cascades to
/// subscriptions.
pub async fn delete_policy_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ServiceError> {
    state.service.delete_policy(PolicyId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/subscriptions` — bind an account to a tier.
pub async fn bind_subscription_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Json(request): Json<BindSubscriptionRequest>,
) -> Result<Response, ServiceError> {
    let record = state
        .service
        .bind_subscription(request.account, request.policy)
        .await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

/// `PUT /admin/subscriptions/{account}` — change an account's tier.
pub async fn change_tier_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Path(account): Path<u64>,
    Json(request): Json<ChangeTierRequest>,
) -> Result<Json<SubscriptionRecord>, ServiceError> {
    Ok(Json(
        state
            .service
            .change_subscription_tier(AccountId(account), request.policy)
            .await?,
    ))
}

/// `DELETE /admin/subscriptions/{account}` — revoke immediately.
pub async fn cancel_subscription_handler<M: MetaStore, B: BlobStore>(
    State(state): State<AppState<M, B>>,
    Path(account): Path<u64>,
) -> Result<StatusCode, ServiceError> {
    state
        .service
        .cancel_subscription(AccountId(account))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Tests
// =============================================================================
