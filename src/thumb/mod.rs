//! Thumbnail derivation.
//!
//! One component: [`ThumbnailEncoder`], the pure resize/re-encode
//! transformation. Policy gating and persistence live in
//! [`crate::asset::thumbnail`]; this module never touches state.

mod encoder;

pub use encoder::{ThumbnailEncoder, DEFAULT_JPEG_QUALITY};
