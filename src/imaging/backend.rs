//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and resize.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, statically
//! linked, built on the `image` crate.

use super::params::{OutputFormat, ResizeParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// What identify learns about a source before any variant is planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub dimensions: Dimensions,
    /// Source encoding, when it is one we can also write.
    pub format: Option<OutputFormat>,
    /// More than one frame (animated GIF or WebP).
    pub animated: bool,
}

/// Trait for image processing backends.
///
/// Both operations must be implemented so the rest of the codebase is
/// backend-agnostic. `Sync` because pages render on a rayon pool.
pub trait ImageBackend: Sync {
    /// Read dimensions, format and animation of a source image.
    fn identify(&self, path: &Path) -> Result<SourceInfo, BackendError>;

    /// Produce one variant.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;
}
