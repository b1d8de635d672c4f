//! Whole-site build.
//!
//! Walks the content directory, expands shortcodes in every markdown page,
//! renders the result and writes one HTML document per page.
//!
//! ## Parallelism
//!
//! Pages are built in parallel with [rayon](https://docs.rs/rayon). The only
//! shared state is the cache manifest, locked for lookups and inserts but
//! never across an encode. Progress is reported as [`BuildEvent`]s over an
//! mpsc channel so the caller can print while workers run.
//!
//! ## Skipped entries
//!
//! Hidden files and directories (leading `.`) and directories starting with
//! `_` are not scanned. Only `*.md` files become pages.

use crate::cache::{CacheManifest, CacheStats};
use crate::config::SiteConfig;
use crate::imaging::{ImageBackend, RustBackend};
use crate::page::{PageContext, extract_title, output_path, strip_front_matter};
use crate::render::{markdown_to_html, render_page};
use crate::shortcode::{ImageShortcode, ShortcodeError, Shortcodes, VideoShortcode};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{}: {source}", path.display())]
    Page {
        path: PathBuf,
        #[source]
        source: ShortcodeError,
    },
}

/// A markdown file found under the content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    pub path: PathBuf,
    /// Path relative to the content root.
    pub relative: PathBuf,
}

/// What was written for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub source: PathBuf,
    /// Output file, relative to the site output.
    pub output: PathBuf,
    pub title: String,
    pub shortcodes: usize,
    pub open_graph_image: Option<String>,
    pub stats: CacheStats,
}

/// Progress events emitted while building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Started { pages: usize },
    PageBuilt(PageReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// One report per page, in scan order.
    pub pages: Vec<PageReport>,
    pub stats: CacheStats,
}

impl BuildResult {
    pub fn shortcodes(&self) -> usize {
        self.pages.iter().map(|p| p.shortcodes).sum()
    }
}

/// A page that passed `check`, with how many shortcodes it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCheck {
    pub source: PathBuf,
    pub shortcodes: usize,
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && name.starts_with('_'))
}

/// Every markdown page under `root`, sorted by path.
pub fn scan_pages(root: &Path) -> Result<Vec<PageSource>, SiteError> {
    let mut pages = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
    {
        let entry = entry?;
        let is_markdown = entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "md");
        if !is_markdown {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        pages.push(PageSource {
            path: entry.path().to_path_buf(),
            relative,
        });
    }
    Ok(pages)
}

/// The shortcodes available to content.
pub fn shortcodes<B: ImageBackend + Send + 'static>(
    backend: B,
    config: &SiteConfig,
    output: &Path,
    cache: Option<Arc<Mutex<CacheManifest>>>,
) -> Shortcodes {
    let mut image = ImageShortcode::new(backend, config, output);
    if let Some(cache) = cache {
        image = image.with_cache(cache);
    }
    let mut shortcodes = Shortcodes::new();
    shortcodes.register(Box::new(image));
    shortcodes.register(Box::new(VideoShortcode::new(config, output)));
    shortcodes
}

/// Build the site from `source` into `output` with the pure-Rust backend.
pub fn build(
    source: &Path,
    output: &Path,
    config: &SiteConfig,
    use_cache: bool,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildResult, SiteError> {
    build_with_backend(RustBackend::new(), source, output, config, use_cache, events)
}

/// Build with a specific image backend (allows testing with mock).
pub fn build_with_backend<B: ImageBackend + Send + 'static>(
    backend: B,
    source: &Path,
    output: &Path,
    config: &SiteConfig,
    use_cache: bool,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildResult, SiteError> {
    let pages = scan_pages(source)?;
    let image_dir = config.pipeline(output).output_dir;

    let manifest = if use_cache {
        CacheManifest::load(&image_dir)
    } else {
        CacheManifest::empty()
    };
    let cache = Arc::new(Mutex::new(manifest));
    let shortcodes = shortcodes(backend, config, output, Some(cache.clone()));

    fs::create_dir_all(output)?;
    if let Some(tx) = &events {
        tx.send(BuildEvent::Started { pages: pages.len() }).ok();
    }

    let reports = pages
        .par_iter()
        .map(|page| -> Result<PageReport, SiteError> {
            let report = build_page(&shortcodes, source, output, page)?;
            if let Some(tx) = &events {
                tx.send(BuildEvent::PageBuilt(report.clone())).ok();
            }
            Ok(report)
        })
        .collect::<Result<Vec<_>, SiteError>>()?;

    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .save(&image_dir)?;

    let mut stats = CacheStats::default();
    for report in &reports {
        stats.add(report.stats);
    }
    Ok(BuildResult {
        pages: reports,
        stats,
    })
}

fn build_page(
    shortcodes: &Shortcodes,
    source_root: &Path,
    output_root: &Path,
    page: &PageSource,
) -> Result<PageReport, SiteError> {
    let raw = fs::read_to_string(&page.path)?;
    let body = strip_front_matter(&raw);

    let mut context = PageContext::new(&page.path, source_root);
    let expansion = shortcodes
        .expand(&mut context, body)
        .map_err(|source| SiteError::Page {
            path: page.relative.clone(),
            source,
        })?;

    let title = extract_title(body, &page.path);
    let html = markdown_to_html(&expansion.text);
    let document = render_page(&title, &html, context.open_graph_image.as_deref());

    let relative_output = output_path(&page.relative);
    let output_file = output_root.join(&relative_output);
    if let Some(parent) = output_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output_file, document.into_string())?;

    Ok(PageReport {
        source: page.relative.clone(),
        output: relative_output,
        title,
        shortcodes: expansion.invocations,
        open_graph_image: context.open_graph_image,
        stats: expansion.stats,
    })
}

/// Validate every page's shortcodes without encoding or writing anything.
pub fn check(source: &Path, output: &Path, config: &SiteConfig) -> Result<Vec<PageCheck>, SiteError> {
    let shortcodes = shortcodes(RustBackend::new(), config, output, None);
    scan_pages(source)?
        .into_iter()
        .map(|page| -> Result<PageCheck, SiteError> {
            let raw = fs::read_to_string(&page.path)?;
            let context = PageContext::new(&page.path, source);
            let count = shortcodes
                .check(&context, strip_front_matter(&raw))
                .map_err(|source| SiteError::Page {
                    path: page.relative.clone(),
                    source,
                })?;
            Ok(PageCheck {
                source: page.relative,
                shortcodes: count,
            })
        })
        .collect()
}
