//! Asset layer: uploaded images and their derived thumbnails.
//!
//! - [`naming`] — the deterministic naming scheme for images, thumbnails
//!   and expiring links, plus the supported-extension type
//! - [`ImageLibrary`] — image creation (with the captured original-storage
//!   decision) and owner-scoped lookup
//! - [`ThumbnailFactory`] — thumbnail derivation gated by the owner's
//!   *current* policy

pub mod image;
pub mod naming;
pub mod thumbnail;

pub use image::ImageLibrary;
pub use naming::{
    image_name, is_valid_image_name, link_name, thumbnail_name, unix_now, ImageExt,
};
pub use thumbnail::ThumbnailFactory;
