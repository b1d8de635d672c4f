//! The `image` shortcode: responsive variants plus `<picture>` markup.
//!
//! ```text
//! {% image "src", "alt", [widths], "sizes", "caption" %}
//! ```
//!
//! Only `src` and `alt` are required. Omitted widths mean a single variant at
//! the source's native width. A missing source fails the build.

use super::{Args, Shortcode, ShortcodeError, ShortcodeOutput, markup};
use crate::cache::{CacheManifest, CacheStats, hash_file};
use crate::config::{OpenGraphConfig, SiteConfig};
use crate::imaging::{
    Dimensions, ImageBackend, ImageBuildResult, OutputFormat, PipelineConfig, Variant,
    VariantStatus, Width, generate_variants,
};
use crate::page::PageContext;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Arguments of one `image` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub source: String,
    pub alt: String,
    pub widths: Vec<Width>,
    pub sizes: Option<String>,
    pub caption: Option<String>,
}

impl ImageRequest {
    pub fn from_args(values: &[Value]) -> Result<Self, ShortcodeError> {
        let args = Args::new("image", values);
        args.expect_at_most(5)?;
        Ok(Self {
            source: args.required_str(0, "source")?,
            alt: args.required_str(1, "alt text")?,
            widths: args.widths(2)?,
            sizes: args.optional_str(3, "sizes")?,
            caption: args.optional_str(4, "caption")?,
        })
    }
}

/// The variant, if any, that qualifies as the page's social preview image.
///
/// Only an exact match on both format and dimensions counts.
pub fn select_open_graph_image(
    result: &ImageBuildResult,
    format: OutputFormat,
    dimensions: Dimensions,
) -> Option<&Variant> {
    result
        .variants(format)?
        .iter()
        .find(|v| v.dimensions() == dimensions)
}

pub struct ImageShortcode<B> {
    backend: B,
    pipeline: PipelineConfig,
    default_sizes: String,
    open_graph: OpenGraphConfig,
    cache: Option<Arc<Mutex<CacheManifest>>>,
}

impl<B: ImageBackend> ImageShortcode<B> {
    pub fn new(backend: B, config: &SiteConfig, site_output: &Path) -> Self {
        Self {
            backend,
            pipeline: config.pipeline(site_output),
            default_sizes: config.images.default_sizes.clone(),
            open_graph: config.open_graph.clone(),
            cache: None,
        }
    }

    /// Share a cache manifest; unchanged variants are then not re-encoded.
    pub fn with_cache(mut self, cache: Arc<Mutex<CacheManifest>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    fn locate(&self, page: &PageContext, request: &ImageRequest) -> Result<PathBuf, ShortcodeError> {
        let source = page.resolve(&request.source);
        if !source.is_file() {
            return Err(ShortcodeError::SourceNotFound(source));
        }
        Ok(source)
    }

    /// Generate every variant for `request` and return the full result.
    pub fn build(
        &self,
        page: &PageContext,
        request: &ImageRequest,
    ) -> Result<ImageBuildResult, ShortcodeError> {
        let source = self.locate(page, request)?;
        let source_hash = hash_file(&source)?;
        let result = generate_variants(
            &self.backend,
            &source,
            &source_hash,
            &request.widths,
            &self.pipeline,
            self.cache.as_deref(),
        )?;
        Ok(result)
    }

    /// Markup and Open Graph candidate for a built request.
    pub fn present(&self, request: &ImageRequest, result: &ImageBuildResult) -> ShortcodeOutput {
        let sizes = request
            .sizes
            .as_deref()
            .unwrap_or(self.default_sizes.as_str());
        let open_graph_image =
            select_open_graph_image(result, self.open_graph.format, self.open_graph.dimensions())
                .map(|v| v.url.clone());

        let mut stats = CacheStats::default();
        for variant in result.all_variants() {
            match variant.status {
                VariantStatus::Cached => stats.hit(),
                VariantStatus::Encoded => stats.miss(),
            }
        }

        ShortcodeOutput {
            html: markup::image(result, &request.alt, Some(sizes), request.caption.as_deref())
                .into_string(),
            open_graph_image,
            stats,
        }
    }
}

impl<B: ImageBackend + Send> Shortcode for ImageShortcode<B> {
    fn name(&self) -> &'static str {
        "image"
    }

    fn render(&self, page: &PageContext, args: &[Value]) -> Result<ShortcodeOutput, ShortcodeError> {
        let request = ImageRequest::from_args(args)?;
        let result = self.build(page, &request)?;
        Ok(self.present(&request, &result))
    }

    fn check(&self, page: &PageContext, args: &[Value]) -> Result<(), ShortcodeError> {
        let request = ImageRequest::from_args(args)?;
        self.locate(page, &request).map(|_| ())
    }
}
