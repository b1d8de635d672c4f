//! Build-time shortcodes.
//!
//! Content files embed media with Nunjucks-style tags:
//!
//! ```text
//! {% image "cat.jpg", "A sleeping cat", [600, 1200, "auto"], "(min-width: 40em) 50vw, 100vw", "Caption" %}
//! {% video "clip.mp4", "Caption" %}
//! ```
//!
//! Arguments are a comma-separated list of JSON values, except that strings
//! may use single quotes too. A `%}` inside a quoted string does not close the
//! tag. Trailing arguments may be omitted or passed as `null`. Tags whose name is not registered are left
//! in the text untouched, and `{% raw %}…{% endraw %}` regions are copied
//! verbatim.
//!
//! A shortcode never mutates the page behind the caller's back: it returns a
//! [`ShortcodeOutput`] and [`Shortcodes::expand`] applies any Open Graph
//! candidate to the [`PageContext`] in document order, so the last candidate
//! on a page wins.

pub mod image;
mod markup;
pub mod parse;
pub mod video;

pub use image::{ImageRequest, ImageShortcode, select_open_graph_image};
pub use video::{VideoRequest, VideoShortcode, video_mime_type};

use crate::cache::CacheStats;
use crate::imaging::{BackendError, Width};
use crate::page::PageContext;
use parse::Segment;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShortcodeError {
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("invalid arguments to '{shortcode}': {message}")]
    Arguments {
        shortcode: &'static str,
        message: String,
    },
    #[error("shortcode syntax error: {0}")]
    Parse(String),
    #[error("image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a shortcode produced for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcodeOutput {
    /// Markup that replaces the tag.
    pub html: String,
    /// URL to record as the page's `og:image`, if this invocation produced one.
    pub open_graph_image: Option<String>,
    /// Cache hits and encodes performed for this invocation.
    pub stats: CacheStats,
}

/// A named build-time tag.
pub trait Shortcode: Send + Sync {
    /// Tag name as written in content, e.g. `image`.
    fn name(&self) -> &'static str;

    /// Produce markup and artifacts for one invocation.
    fn render(&self, page: &PageContext, args: &[Value]) -> Result<ShortcodeOutput, ShortcodeError>;

    /// Validate arguments and referenced sources without writing anything.
    fn check(&self, page: &PageContext, args: &[Value]) -> Result<(), ShortcodeError>;
}

/// Result of expanding every shortcode in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    /// Number of registered shortcodes that were expanded.
    pub invocations: usize,
    pub stats: CacheStats,
}

/// Registry of shortcodes by tag name.
#[derive(Default)]
pub struct Shortcodes {
    entries: Vec<Box<dyn Shortcode>>,
}

impl Shortcodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shortcode. A later registration with the same name wins.
    pub fn register(&mut self, shortcode: Box<dyn Shortcode>) {
        self.entries.retain(|s| s.name() != shortcode.name());
        self.entries.push(shortcode);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Shortcode> {
        self.entries
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|s| s.name()).collect()
    }

    /// Replace every registered tag in `source` with its rendered markup.
    ///
    /// Invocations run in document order; the first failure aborts.
    pub fn expand(&self, page: &mut PageContext, source: &str) -> Result<Expansion, ShortcodeError> {
        let mut expansion = Expansion {
            text: String::with_capacity(source.len()),
            ..Expansion::default()
        };

        for segment in parse::segments(source)? {
            match segment {
                Segment::Text(text) => expansion.text.push_str(text),
                Segment::Tag(tag) => match self.get(tag.name) {
                    Some(shortcode) => {
                        let args = parse::parse_args(shortcode.name(), tag.args)?;
                        let output = shortcode.render(page, &args)?;
                        page.apply(&output);
                        expansion.text.push_str(&output.html);
                        expansion.stats.add(output.stats);
                        expansion.invocations += 1;
                    }
                    None => expansion.text.push_str(tag.source),
                },
            }
        }

        Ok(expansion)
    }

    /// Validate every registered tag in `source`, returning how many were found.
    pub fn check(&self, page: &PageContext, source: &str) -> Result<usize, ShortcodeError> {
        let mut checked = 0;
        for segment in parse::segments(source)? {
            if let Segment::Tag(tag) = segment
                && let Some(shortcode) = self.get(tag.name)
            {
                let args = parse::parse_args(shortcode.name(), tag.args)?;
                shortcode.check(page, &args)?;
                checked += 1;
            }
        }
        Ok(checked)
    }
}

// =========================================================================
// Argument access
// =========================================================================

/// Positional argument reader that reports errors against a shortcode name.
pub(crate) struct Args<'a> {
    shortcode: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub(crate) fn new(shortcode: &'static str, values: &'a [Value]) -> Self {
        Self { shortcode, values }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ShortcodeError {
        ShortcodeError::Arguments {
            shortcode: self.shortcode,
            message: message.into(),
        }
    }

    fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    pub(crate) fn required_str(&self, index: usize, what: &str) -> Result<String, ShortcodeError> {
        match self.get(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.error(format!("{what} must be a string, got {other}"))),
            None => Err(self.error(format!("missing {what}"))),
        }
    }

    /// A string argument; empty strings count as absent.
    pub(crate) fn optional_str(&self, index: usize, what: &str) -> Result<Option<String>, ShortcodeError> {
        match self.get(index) {
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.error(format!("{what} must be a string, got {other}"))),
            None => Ok(None),
        }
    }

    /// A width list: an array of pixel widths and `"auto"`, or a single one.
    pub(crate) fn widths(&self, index: usize) -> Result<Vec<Width>, ShortcodeError> {
        match self.get(index) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(|v| self.width(v)).collect(),
            Some(single) => Ok(vec![self.width(single)?]),
        }
    }

    fn width(&self, value: &Value) -> Result<Width, ShortcodeError> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .and_then(Width::pixels)
                .ok_or_else(|| self.error(format!("width must be a positive integer, got {n}"))),
            Value::String(s) => s.parse().map_err(|e: String| self.error(e)),
            other => Err(self.error(format!("width must be a number or \"auto\", got {other}"))),
        }
    }

    pub(crate) fn expect_at_most(&self, count: usize) -> Result<(), ShortcodeError> {
        if self.values.len() > count {
            return Err(self.error(format!(
                "expected at most {count} arguments, got {}",
                self.values.len()
            )));
        }
        Ok(())
    }
}
