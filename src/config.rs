//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. User values are
//! merged on top of stock defaults, so a config file only needs the keys it
//! wants to change.
//!
//! ## Config File Location
//!
//! ```text
//! content/
//! ├── config.toml              # Optional; overrides stock defaults
//! ├── index.md
//! └── posts/
//!     ├── hello-world.md
//!     └── hello-world.jpg      # Media co-located with the article
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! output_dir = "img"              # Variant directory inside the site output
//! url_path = "/img/"              # Public URL prefix of that directory
//! formats = ["webp", "auto"]      # Markup order; the last one is the <img> fallback
//! quality = 80                    # Lossy encoding quality (1-100)
//! default_sizes = "100vw"         # `sizes` used when several widths exist and none is given
//!
//! [open_graph]
//! format = "webp"                 # Must appear in images.formats
//! width = 1200
//! height = 627
//!
//! [videos]
//! output_dir = "video"
//! url_path = "/video/"
//!
//! [processing]
//! max_processes = 4               # Max parallel page workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Dimensions, FormatRequest, OutputFormat, PipelineConfig, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Responsive image generation settings.
    pub images: ImagesConfig,
    /// Social preview image selection.
    pub open_graph: OpenGraphConfig,
    /// Video embed settings.
    pub videos: VideosConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality == 0 || self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.formats.is_empty() {
            return Err(ConfigError::Validation(
                "images.formats must not be empty".into(),
            ));
        }
        if self.open_graph.width == 0 || self.open_graph.height == 0 {
            return Err(ConfigError::Validation(
                "open_graph.width and open_graph.height must be non-zero".into(),
            ));
        }
        // `auto` depends on the source; only an explicit entry counts.
        let og = FormatRequest::Fixed(self.open_graph.format);
        if !self.images.formats.contains(&og) {
            return Err(ConfigError::Validation(format!(
                "open_graph.format \"{}\" must be listed in images.formats",
                self.open_graph.format
            )));
        }
        validate_url_path("images.url_path", &self.images.url_path)?;
        validate_url_path("videos.url_path", &self.videos.url_path)?;
        validate_output_dir("images.output_dir", &self.images.output_dir)?;
        validate_output_dir("videos.output_dir", &self.videos.output_dir)?;
        Ok(())
    }

    /// Image pipeline settings for a site written to `site_output`.
    pub fn pipeline(&self, site_output: &Path) -> PipelineConfig {
        PipelineConfig {
            output_dir: site_output.join(&self.images.output_dir),
            url_path: self.images.url_path.clone(),
            formats: self.images.formats.clone(),
            quality: Quality::new(self.images.quality),
        }
    }
}

fn validate_url_path(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') || !value.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "{key} must start and end with '/', got '{value}'"
        )));
    }
    Ok(())
}

fn validate_output_dir(key: &str, value: &str) -> Result<(), ConfigError> {
    let path = Path::new(value);
    if value.is_empty()
        || path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(ConfigError::Validation(format!(
            "{key} must be a relative path inside the site output, got '{value}'"
        )));
    }
    Ok(())
}

/// Responsive image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Directory (relative to the site output) variants are written to.
    pub output_dir: String,
    /// URL prefix the variants are served from.
    pub url_path: String,
    /// Output formats in markup order. `auto` keeps the source format.
    pub formats: Vec<FormatRequest>,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// `sizes` attribute used when several widths exist and the shortcode gave none.
    pub default_sizes: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            output_dir: "img".to_string(),
            url_path: "/img/".to_string(),
            formats: vec![FormatRequest::Fixed(OutputFormat::Webp), FormatRequest::Auto],
            quality: 80,
            default_sizes: "100vw".to_string(),
        }
    }
}

/// Which generated variant, if any, becomes the page's `og:image`.
///
/// Only a variant of exactly `width`×`height` in `format` qualifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenGraphConfig {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl OpenGraphConfig {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

impl Default for OpenGraphConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Webp,
            width: 1200,
            height: 627,
        }
    }
}

/// Video embed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideosConfig {
    /// Directory (relative to the site output) videos are copied to.
    pub output_dir: String,
    /// URL prefix the videos are served from.
    pub url_path: String,
}

impl Default for VideosConfig {
    fn default() -> Self {
        Self {
            output_dir: "video".to_string(),
            url_path: "/video/".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of pages rendered in parallel.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `config.toml` in the content root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# blog-media configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Place this file in the content root.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Responsive images ({% image %} shortcode)
# ---------------------------------------------------------------------------
[images]
# Directory, inside the site output, that variants are written to.
output_dir = "img"

# Public URL prefix of output_dir. Must start and end with "/".
url_path = "/img/"

# Output formats in markup order. The last one becomes the <img> fallback,
# the others become <source> elements. "auto" keeps the source's format.
# Known formats: webp, avif, jpeg, png, gif, auto.
formats = ["webp", "auto"]

# Lossy encoding quality (1 = worst, 100 = best).
quality = 80

# `sizes` attribute used when an image has several widths and the shortcode
# did not pass one.
default_sizes = "100vw"

# ---------------------------------------------------------------------------
# Social preview image
# ---------------------------------------------------------------------------
[open_graph]
# A variant of exactly width x height in this format becomes the page's
# og:image. There is no nearest-size fallback. The format must also be
# listed in images.formats.
format = "webp"
width = 1200
height = 627

# ---------------------------------------------------------------------------
# Videos ({% video %} shortcode)
# ---------------------------------------------------------------------------
[videos]
output_dir = "video"
url_path = "/video/"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of pages rendered in parallel.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}
