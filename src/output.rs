//! CLI output formatting.
//!
//! Output is **information-first**: each page leads with its title and
//! output path, with the source file and media work shown as indented
//! context lines.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Building 2 pages
//! Hello → posts/hello/index.html
//!     Source: posts/hello.md
//!     Media: 2 shortcodes, 1 cached, 3 encoded (4 total)
//!     Open Graph: /img/3f9a1c2b4d-1200.webp
//! Home → index.html
//!     Source: index.md
//!
//! Built 2 pages, 2 shortcodes
//! Cache: 1 cached, 3 encoded (4 total)
//! ```
//!
//! ## Check
//!
//! ```text
//! Pages
//! 001 index.md
//! 002 posts/hello.md (2 shortcodes)
//!
//! Config
//!     config.toml
//! ```
//!
//! ## Image
//!
//! ```text
//! hello.png (2400x1254, png)
//!     webp 600x314: encoded → /img/3f9a1c2b4d-600.webp
//!     png 600x314: cached → /img/3f9a1c2b4d-600.png
//!     Open Graph: /img/3f9a1c2b4d-1200.webp
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{ImageBuildResult, VariantStatus};
use crate::shortcode::ShortcodeOutput;
use crate::site::{BuildEvent, BuildResult, PageCheck};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Forward slashes regardless of platform.
fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Started { pages } => vec![format!("Building {}", plural(*pages, "page"))],
        BuildEvent::PageBuilt(report) => {
            let mut lines = vec![
                format!("{} \u{2192} {}", report.title, display_path(&report.output)),
                format!("    Source: {}", display_path(&report.source)),
            ];
            if report.shortcodes > 0 {
                let media = if report.stats.total() > 0 {
                    format!("{}, {}", plural(report.shortcodes, "shortcode"), report.stats)
                } else {
                    plural(report.shortcodes, "shortcode")
                };
                lines.push(format!("    Media: {}", media));
            }
            if let Some(url) = &report.open_graph_image {
                lines.push(format!("    Open Graph: {}", url));
            }
            lines
        }
    }
}

/// Format the closing summary of a build.
pub fn format_build_summary(result: &BuildResult) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "Built {}, {}",
            plural(result.pages.len(), "page"),
            plural(result.shortcodes(), "shortcode")
        ),
    ];
    if result.stats.total() > 0 {
        lines.push(format!("Cache: {}", result.stats));
    }
    lines
}

pub fn print_build_summary(result: &BuildResult) {
    for line in format_build_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format check output: every page with its shortcode count, then config.
pub fn format_check_output(pages: &[PageCheck], source_root: &Path) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for (i, page) in pages.iter().enumerate() {
        let detail = if page.shortcodes > 0 {
            format!(" ({})", plural(page.shortcodes, "shortcode"))
        } else {
            String::new()
        };
        lines.push(format!(
            "{} {}{}",
            format_index(i + 1),
            display_path(&page.source),
            detail
        ));
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    if source_root.join("config.toml").exists() {
        lines.push("    config.toml".to_string());
    } else {
        lines.push("    (stock defaults)".to_string());
    }
    lines
}

pub fn print_check_output(pages: &[PageCheck], source_root: &Path) {
    for line in format_check_output(pages, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Single image
// ============================================================================

/// Format the variants generated for one image.
pub fn format_image_output(
    source_name: &str,
    result: &ImageBuildResult,
    output: &ShortcodeOutput,
) -> Vec<String> {
    let dims = result.source.dimensions;
    let kind = match result.source.format {
        Some(format) if result.source.animated => format!("{format}, animated"),
        Some(format) => format.to_string(),
        None => "unknown format".to_string(),
    };
    let mut lines = vec![format!(
        "{} ({}x{}, {})",
        source_name, dims.width, dims.height, kind
    )];

    for variant in result.all_variants() {
        let status = match variant.status {
            VariantStatus::Cached => "cached",
            VariantStatus::Encoded => "encoded",
        };
        lines.push(format!(
            "    {} {}x{}: {} \u{2192} {}",
            variant.format, variant.width, variant.height, status, variant.url
        ));
    }
    if let Some(url) = &output.open_graph_image {
        lines.push(format!("    Open Graph: {}", url));
    }
    lines
}

pub fn print_image_output(source_name: &str, result: &ImageBuildResult, output: &ShortcodeOutput) {
    for line in format_image_output(source_name, result, output) {
        println!("{}", line);
    }
    println!();
    println!("{}", output.html);
}

// ============================================================================
// Tests
// ============================================================================
