//! # Blog Media
//!
//! Build-time media handling for a markdown blog. Pages are plain markdown
//! files; media goes in through shortcodes that are expanded before the
//! markdown is rendered:
//!
//! ```text
//! {% image "cat.jpg", "A cat on a windowsill", [600, 1200], "(min-width: 40em) 50vw" %}
//! {% video "walk.mp4", "Evening walk" %}
//! ```
//!
//! # Architecture
//!
//! ```text
//! content/*.md ──► shortcode expansion ──► markdown ──► HTML document ──► _site/
//!                      │                                      ▲
//!                      ├─► image variants (_site/img/)         │
//!                      ├─► video copies   (_site/video/)       │
//!                      └─► Open Graph candidate ───────────────┘
//! ```
//!
//! Each page is independent, so pages build in parallel. The image variant
//! cache is the only state shared between them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`shortcode`] | Tag scanning, argument parsing, the `image` and `video` shortcodes |
//! | [`imaging`] | Pure-Rust identify, resize and encode behind the [`imaging::ImageBackend`] trait |
//! | [`cache`] | Content-addressed variant cache (`.cache-manifest.json`) |
//! | [`page`] | Per-page context: path resolution, titles, output paths |
//! | [`render`] | Markdown to HTML and the page document (Maud) |
//! | [`site`] | Whole-site build and check |
//! | [`client`] | Lazy video loading and copy-to-clipboard, as testable state machines |
//! | [`config`] | `config.toml` loading, validation, and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Variant Per Width and Format
//!
//! An image shortcode names the widths it wants; every configured format is
//! encoded at every width. The last format in the list is the `<img>`
//! fallback, earlier ones become `<source>` elements, so the default
//! `["webp", "auto"]` serves WebP with the original format as fallback.
//!
//! ## Content-Addressed Output
//!
//! Variant file names are derived from the source file's content hash plus
//! the width, so an unchanged image always maps to the same URL and a
//! changed one never collides with its old variants.
//!
//! ## Open Graph From Content
//!
//! The page's social preview image is not configured separately. Any image
//! shortcode that produces a variant with exactly the Open Graph dimensions
//! (1200×627 by default) nominates it; the last such variant on the page wins.
//!
//! ## Client Scripts Without a Bundler
//!
//! The two browser behaviours are small vanilla scripts inlined into every
//! page. Their rules also live in [`client`] as plain Rust over capability
//! traits so they can be unit tested without a browser.

pub mod cache;
pub mod client;
pub mod config;
pub mod imaging;
pub mod output;
pub mod page;
pub mod render;
pub mod shortcode;
pub mod site;

#[cfg(test)]
pub(crate) mod test_helpers;
