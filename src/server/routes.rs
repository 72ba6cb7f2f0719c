//! Router configuration for the pixtier API.
//!
//! The public link route lives at the root (`/{link_name}`) next to the
//! authenticated API routes; static segments win over the capture, so
//! `/health`, `/images`, `/upload`, `/link`, `/media` and `/admin` are
//! never shadowed by link names.

use std::time::Duration;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::HostService;
use crate::store::{BlobStore, MetaStore};

use super::handlers::{
    bind_subscription_handler, cancel_subscription_handler, change_tier_handler,
    create_policy_handler, create_size_handler, delete_policy_handler, generate_link_handler,
    health_handler, image_details_handler, images_details_handler, images_handler,
    list_policies_handler, list_sizes_handler, media_handler, public_image_handler,
    upload_handler, AppState,
};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin).
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age for owner asset responses, in seconds.
    pub cache_max_age: u32,

    /// Base URL prefixed to rendered URLs (e.g. "https://img.example.com").
    /// Empty renders path-relative URLs.
    pub public_url: String,

    /// Whether to attach request tracing.
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Defaults: any origin, 1 hour asset caching, relative URLs, tracing
    /// on.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            public_url: String::new(),
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins. None (the default) allows any.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age for asset responses.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Set the base URL used when rendering asset and link URLs.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        while url.ends_with('/') {
            url.pop();
        }
        self.public_url = url;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Build the complete application router over a [`HostService`].
pub fn create_router<M, B>(service: HostService<M, B>, config: RouterConfig) -> Router
where
    M: MetaStore,
    B: BlobStore,
{
    let mut state = AppState::new(service);
    state.cache_max_age = config.cache_max_age;
    state.public_url = config.public_url.clone();

    let cors = build_cors_layer(&config);

    let admin_routes = Router::new()
        .route(
            "/sizes",
            post(create_size_handler::<M, B>).get(list_sizes_handler::<M, B>),
        )
        .route(
            "/tiers",
            post(create_policy_handler::<M, B>).get(list_policies_handler::<M, B>),
        )
        .route("/tiers/{id}", delete(delete_policy_handler::<M, B>))
        .route("/subscriptions", post(bind_subscription_handler::<M, B>))
        .route(
            "/subscriptions/{account}",
            put(change_tier_handler::<M, B>).delete(cancel_subscription_handler::<M, B>),
        );

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler::<M, B>))
        .route("/images", get(images_handler::<M, B>))
        .route("/images/details", get(images_details_handler::<M, B>))
        .route(
            "/images/details/{image_name}",
            get(image_details_handler::<M, B>),
        )
        .route("/link", post(generate_link_handler::<M, B>))
        .route("/media/{asset_name}", get(media_handler::<M, B>))
        .nest("/admin", admin_routes)
        // Public, unauthenticated: expiring links resolve at the root.
        .route("/{link_name}", get(public_image_handler::<M, B>))
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) => {
            let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
