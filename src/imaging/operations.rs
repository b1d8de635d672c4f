//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend, SourceInfo};
use super::calculations::{VariantSize, plan_variant_sizes};
use super::params::{FormatRequest, OutputFormat, Quality, ResizeParams, Width};
use crate::cache::{CacheManifest, hash_variant_params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Length of the source-hash prefix used in variant file names.
const HASH_PREFIX_LEN: usize = 10;

/// Where and how variants are written.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory the variant files are written into.
    pub output_dir: PathBuf,
    /// Public URL prefix for that directory, with leading and trailing `/`.
    pub url_path: String,
    /// Configured formats, in markup order (the last one is the `<img>` fallback).
    pub formats: Vec<FormatRequest>,
    pub quality: Quality,
}

/// Whether a variant was re-encoded or reused from a previous build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStatus {
    Cached,
    Encoded,
}

/// One generated rendition of a source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub url: String,
    pub file_name: String,
    pub status: VariantStatus,
}

impl Variant {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// All variants of one format, ascending by width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatVariants {
    pub format: OutputFormat,
    pub variants: Vec<Variant>,
}

/// Everything the pipeline produced for one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuildResult {
    pub source: SourceInfo,
    /// One entry per resolved format, in configured order.
    pub formats: Vec<FormatVariants>,
}

impl ImageBuildResult {
    /// Variants of a single format, if that format was produced.
    pub fn variants(&self, format: OutputFormat) -> Option<&[Variant]> {
        self.formats
            .iter()
            .find(|f| f.format == format)
            .map(|f| f.variants.as_slice())
    }

    /// Every variant across all formats.
    pub fn all_variants(&self) -> impl Iterator<Item = &Variant> {
        self.formats.iter().flat_map(|f| f.variants.iter())
    }
}

/// Resolve configured formats against an identified source.
///
/// `auto` resolution happens first, then duplicates collapse keeping the
/// first position. For animated sources, formats that cannot carry frames
/// are dropped so a still frame never shadows the animation.
pub fn resolve_formats(requests: &[FormatRequest], source: &SourceInfo) -> Vec<OutputFormat> {
    let mut formats: Vec<OutputFormat> = Vec::new();
    for request in requests {
        let format = request.resolve(source.format, source.animated);
        if source.animated && !format.supports_animation() {
            continue;
        }
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        formats.push(FormatRequest::Auto.resolve(source.format, source.animated));
    }
    formats
}

/// Variant file name: `{hash prefix}-{width}.{ext}`.
pub fn variant_file_name(source_hash: &str, width: u32, format: OutputFormat) -> String {
    let prefix = source_hash.get(..HASH_PREFIX_LEN).unwrap_or(source_hash);
    format!("{}-{}.{}", prefix, width, format.extension())
}

/// Generate every (format, width) variant of `source`.
///
/// `source_hash` is the SHA-256 of the source bytes; it names the files and
/// keys the cache. With a cache, variants whose file and parameters are
/// unchanged are not re-encoded.
pub fn generate_variants(
    backend: &impl ImageBackend,
    source: &Path,
    source_hash: &str,
    widths: &[Width],
    config: &PipelineConfig,
    cache: Option<&Mutex<CacheManifest>>,
) -> Result<ImageBuildResult> {
    let info = backend.identify(source)?;
    let sizes = plan_variant_sizes(info.dimensions, widths);
    let formats = resolve_formats(&config.formats, &info);

    std::fs::create_dir_all(&config.output_dir)?;

    let mut result = ImageBuildResult {
        source: info,
        formats: Vec::with_capacity(formats.len()),
    };

    for format in formats {
        let mut variants = Vec::with_capacity(sizes.len());
        for VariantSize { width, height } in &sizes {
            let (width, height) = (*width, *height);
            let file_name = variant_file_name(source_hash, width, format);
            let params_hash = hash_variant_params(
                format,
                width,
                height,
                config.quality.value(),
                info.animated,
            );

            let fresh = cache.is_some_and(|c| {
                c.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_fresh(&file_name, source_hash, &params_hash, &config.output_dir)
            });

            let status = if fresh {
                VariantStatus::Cached
            } else {
                backend.resize(&ResizeParams {
                    source: source.to_path_buf(),
                    output: config.output_dir.join(&file_name),
                    width,
                    height,
                    format,
                    quality: config.quality,
                    animated: info.animated,
                })?;
                if let Some(c) = cache {
                    c.lock().unwrap_or_else(PoisonError::into_inner).insert(
                        file_name.clone(),
                        source_hash.to_string(),
                        params_hash,
                    );
                }
                VariantStatus::Encoded
            };

            variants.push(Variant {
                format,
                width,
                height,
                url: format!("{}{}", config.url_path, file_name),
                file_name,
                status,
            });
        }
        result.formats.push(FormatVariants { format, variants });
    }

    Ok(result)
}
