//! Deterministic, collision-checked asset naming.
//!
//! Names are assembled from plain decimal components with no separators,
//! matching what the rest of the system relies on:
//!
//! - image: `{owner-id}{unix-timestamp}{owner-image-count}{extension}`
//! - thumbnail: the image name with `_{height}` inserted before the
//!   extension
//! - link: `{global-link-count}{unix-timestamp}{image-name}`
//!
//! The per-owner timestamp+counter composition makes collisions
//! negligible without a central sequence, but the unique-name constraint
//! in the store stays authoritative: a violation there is a fatal storage
//! error, not a retried path.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AssetError;
use crate::store::AccountId;

/// Supported image extensions. Everything else is rejected at upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageExt {
    Jpg,
    Png,
}

impl ImageExt {
    /// Parse a user-supplied extension (`".jpg"` / `".png"`).
    pub fn parse(extension: &str) -> Result<Self, AssetError> {
        match extension {
            ".jpg" => Ok(ImageExt::Jpg),
            ".png" => Ok(ImageExt::Png),
            other => Err(AssetError::UnsupportedExtension {
                extension: other.to_string(),
            }),
        }
    }

    /// Infer the encoding format from an asset name's trailing letters:
    /// anything not literally ending in `jpg` encodes as png.
    pub fn from_name(name: &str) -> Self {
        if name.ends_with("jpg") {
            ImageExt::Jpg
        } else {
            ImageExt::Png
        }
    }

    /// Map an upload content type to an extension.
    pub fn from_media_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/jpeg" => Some(ImageExt::Jpg),
            "image/png" => Some(ImageExt::Png),
            _ => None,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ImageExt::Jpg => ".jpg",
            ImageExt::Png => ".png",
        }
    }

    /// The content type served for assets with this extension.
    pub fn media_type(self) -> &'static str {
        match self {
            ImageExt::Jpg => "image/jpeg",
            ImageExt::Png => "image/png",
        }
    }
}

/// Whether `name` is a well-formed image name for lookup purposes.
pub fn is_valid_image_name(name: &str) -> bool {
    name.ends_with(".jpg") || name.ends_with(".png")
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_secs()
}

/// Build an image name from its owner, creation time and the owner's
/// running image count.
pub fn image_name(owner: AccountId, timestamp: u64, count: u64, ext: ImageExt) -> String {
    format!("{owner}{timestamp}{count}{}", ext.suffix())
}

/// Build a thumbnail name by inserting `_{height}` before the image
/// name's extension.
pub fn thumbnail_name(image: &str, height: u32) -> String {
    match image.rsplit_once('.') {
        Some((base, ext)) => format!("{base}_{height}.{ext}"),
        None => format!("{image}_{height}"),
    }
}

/// Build an expiring-link name from the global link count, the issuance
/// time and the target image's name.
pub fn link_name(count: u64, timestamp: u64, image: &str) -> String {
    format!("{count}{timestamp}{image}")
}

// =============================================================================
// Tests
// =============================================================================
