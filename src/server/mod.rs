//! HTTP layer for the pixtier API.
//!
//! Thin by design: handlers translate requests into [`crate::service`]
//! calls and render plain data structures back out. Authentication is
//! external — the fronting session layer resolves the account and passes
//! it down as a header the [`handlers::Account`] extractor reads.
//!
//! ```text
//! POST /upload                         upload + thumbnail fan-out
//! GET  /images                         caller's images
//! GET  /images/details                 ... with nested thumbnails
//! GET  /images/details/{image_name}    one image with thumbnails
//! POST /link                           mint an expiring link
//! GET  /{link_name}                    public, expiry-gated image fetch
//! GET  /media/{asset_name}             owner-gated raw asset bytes
//! GET  /health                         health probe
//! /admin/...                           tier administration
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    Account, AppState, ErrorResponse, HealthResponse, ImageResponse, LinkRequest, LinkResponse,
    ThumbnailResponse,
};
pub use routes::{create_router, RouterConfig};
