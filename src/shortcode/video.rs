//! The `video` shortcode: copies a clip into the site and emits a lazy
//! `<video>` element.
//!
//! ```text
//! {% video "clip.mp4", "caption" %}
//! ```
//!
//! Sources carry `data-src` instead of `src`; the lazy video loader swaps
//! them in when the element approaches the viewport.

use super::{Args, Shortcode, ShortcodeError, ShortcodeOutput, markup};
use crate::cache::{CacheStats, hash_file};
use crate::config::SiteConfig;
use crate::page::PageContext;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const HASH_PREFIX_LEN: usize = 10;

/// Arguments of one `video` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub source: String,
    pub caption: Option<String>,
}

impl VideoRequest {
    pub fn from_args(values: &[Value]) -> Result<Self, ShortcodeError> {
        let args = Args::new("video", values);
        args.expect_at_most(2)?;
        Ok(Self {
            source: args.required_str(0, "source")?,
            caption: args.optional_str(1, "caption")?,
        })
    }
}

/// MIME type for a video file, by extension.
pub fn video_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mov" => Some("video/quicktime"),
        "ogv" => Some("video/ogg"),
        _ => None,
    }
}

pub struct VideoShortcode {
    output_dir: PathBuf,
    url_path: String,
}

impl VideoShortcode {
    pub fn new(config: &SiteConfig, site_output: &Path) -> Self {
        Self {
            output_dir: site_output.join(&config.videos.output_dir),
            url_path: config.videos.url_path.clone(),
        }
    }

    fn locate(
        &self,
        page: &PageContext,
        request: &VideoRequest,
    ) -> Result<(PathBuf, &'static str), ShortcodeError> {
        let source = page.resolve(&request.source);
        let mime_type = video_mime_type(&source).ok_or_else(|| ShortcodeError::Arguments {
            shortcode: "video",
            message: format!("unsupported video type: {}", request.source),
        })?;
        if !source.is_file() {
            return Err(ShortcodeError::SourceNotFound(source));
        }
        Ok((source, mime_type))
    }

    /// Copy `source` into the output directory under a content-addressed name.
    ///
    /// Returns the file name and whether an identical copy was already there.
    fn publish(&self, source: &Path) -> Result<(String, bool), ShortcodeError> {
        let hash = hash_file(source)?;
        let prefix = hash.get(..HASH_PREFIX_LEN).unwrap_or(&hash);
        let original = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = format!("{prefix}-{original}");
        let dest = self.output_dir.join(&file_name);

        let unchanged = match (fs::metadata(&dest), fs::metadata(source)) {
            (Ok(existing), Ok(src)) => existing.len() == src.len(),
            _ => false,
        };
        if !unchanged {
            fs::create_dir_all(&self.output_dir)?;
            fs::copy(source, &dest)?;
        }
        Ok((file_name, unchanged))
    }
}

impl Shortcode for VideoShortcode {
    fn name(&self) -> &'static str {
        "video"
    }

    fn render(&self, page: &PageContext, args: &[Value]) -> Result<ShortcodeOutput, ShortcodeError> {
        let request = VideoRequest::from_args(args)?;
        let (source, mime_type) = self.locate(page, &request)?;
        let (file_name, unchanged) = self.publish(&source)?;

        let mut stats = CacheStats::default();
        if unchanged {
            stats.hit();
        } else {
            stats.miss();
        }

        let url = format!("{}{}", self.url_path, file_name);
        Ok(ShortcodeOutput {
            html: markup::video(&url, mime_type, request.caption.as_deref()).into_string(),
            open_graph_image: None,
            stats,
        })
    }

    fn check(&self, page: &PageContext, args: &[Value]) -> Result<(), ShortcodeError> {
        let request = VideoRequest::from_args(args)?;
        self.locate(page, &request).map(|_| ())
    }
}
