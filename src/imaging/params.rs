//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides which variants to create) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`OutputFormat`]: A concrete encoded format (WebP, AVIF, JPEG, PNG, GIF).
//! - [`FormatRequest`]: A configured format: concrete, or `auto` (same as the source).
//! - [`Width`]: A requested pixel width, or `auto` for the native width.
//! - [`ResizeParams`]: Everything needed for one variant: source, output path,
//!   target dimensions, format, quality, animation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// A concrete output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Avif,
    Jpeg,
    Png,
    Gif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Webp => "image/webp",
            OutputFormat::Avif => "image/avif",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
        }
    }

    /// Whether the encoder can carry more than one frame.
    pub fn supports_animation(self) -> bool {
        matches!(self, OutputFormat::Gif)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A format as written in config: a concrete encoding or `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FormatRequest {
    /// Keep the source's own format.
    Auto,
    Fixed(OutputFormat),
}

impl FormatRequest {
    /// Resolve against the identified source.
    ///
    /// Animated sources always fall back to GIF, the only encoder here that
    /// keeps every frame.
    pub fn resolve(self, source_format: Option<OutputFormat>, animated: bool) -> OutputFormat {
        match self {
            FormatRequest::Fixed(format) => format,
            FormatRequest::Auto if animated => OutputFormat::Gif,
            FormatRequest::Auto => source_format.unwrap_or(OutputFormat::Jpeg),
        }
    }
}

impl FromStr for FormatRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(FormatRequest::Auto),
            "webp" => Ok(FormatRequest::Fixed(OutputFormat::Webp)),
            "avif" => Ok(FormatRequest::Fixed(OutputFormat::Avif)),
            "jpeg" | "jpg" => Ok(FormatRequest::Fixed(OutputFormat::Jpeg)),
            "png" => Ok(FormatRequest::Fixed(OutputFormat::Png)),
            "gif" => Ok(FormatRequest::Fixed(OutputFormat::Gif)),
            other => Err(format!("unknown image format '{other}'")),
        }
    }
}

impl TryFrom<String> for FormatRequest {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormatRequest> for String {
    fn from(value: FormatRequest) -> Self {
        match value {
            FormatRequest::Auto => "auto".to_string(),
            FormatRequest::Fixed(format) => format.extension().to_string(),
        }
    }
}

/// A requested output width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// The source's native width.
    Auto,
    Pixels(NonZeroU32),
}

impl Width {
    pub fn pixels(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Width::Pixels)
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::Auto => f.write_str("auto"),
            Width::Pixels(px) => write!(f, "{px}"),
        }
    }
}

impl FromStr for Width {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Width::Auto);
        }
        s.parse::<u32>()
            .ok()
            .and_then(Width::pixels)
            .ok_or_else(|| format!("width must be a positive integer or \"auto\", got '{s}'"))
    }
}

/// Parameters for producing one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
    /// Keep every frame of an animated source.
    pub animated: bool,
}
