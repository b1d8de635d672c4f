//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader` (dimensions, format) + frame count; AVIF via `avif-parse` |
//! | **Decode** | `image` decoders; AVIF via `rav1d` |
//! | **Resize** | Lanczos3, every frame for animated sources |
//! | **Encode** | WebP, AVIF, JPEG, PNG, GIF encoders from `image` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

mod avif;
pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, SourceInfo};
pub use calculations::{VariantSize, plan_variant_sizes, scaled_height};
pub use operations::{
    FormatVariants, ImageBuildResult, PipelineConfig, Variant, VariantStatus, generate_variants,
    resolve_formats, variant_file_name,
};
pub use params::{FormatRequest, OutputFormat, Quality, ResizeParams, Width};
pub use rust_backend::RustBackend;
