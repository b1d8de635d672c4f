//! Shared test utilities for the blog-media test suite.
//!
//! Writes small real images and content trees into temp directories so
//! pipeline tests can run against the `image` crate instead of mocks.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_content();
//! write_page(tmp.path(), "posts/hello.md", "# Hello\n\n{% image \"cat.png\", \"A cat\" %}\n");
//! write_png(&tmp.path().join("posts/cat.png"), 64, 48);
//! ```

use image::codecs::avif::AvifEncoder;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Images
// =========================================================================

/// Write a gradient PNG of the given size, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(path).unwrap();
}

/// Write a solid reddish AVIF with the `image` crate's rav1e encoder.
pub fn write_avif(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 60, 40])));
    let writer = std::io::BufWriter::new(fs::File::create(path).unwrap());
    img.write_with_encoder(AvifEncoder::new_with_speed_quality(writer, 10, 90))
        .unwrap();
}

/// Write a looping GIF with `frames` solid-colour frames.
pub fn write_animated_gif(path: &Path, width: u32, height: u32, frames: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = fs::File::create(path).unwrap();
    let mut encoder = GifEncoder::new(file);
    encoder.set_repeat(Repeat::Infinite).unwrap();

    let frames = (0..frames).map(|i| {
        let shade = (i * 60 % 256) as u8;
        let buffer = RgbaImage::from_pixel(width, height, Rgba([shade, 255 - shade, 0, 255]));
        Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(100, 1))
    });
    encoder.encode_frames(frames).unwrap();
}

// =========================================================================
// Content trees
// =========================================================================

/// Empty content root in a fresh temp directory.
pub fn setup_content() -> TempDir {
    TempDir::new().unwrap()
}

/// Write a markdown page relative to the content root.
pub fn write_page(root: &Path, relative: &str, body: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

/// Content root with one post that embeds a co-located image at two widths.
///
/// ```text
/// posts/hello.md
/// posts/hello.png   (1200x627)
/// ```
pub fn setup_post_with_image() -> TempDir {
    let tmp = setup_content();
    write_png(&tmp.path().join("posts/hello.png"), 1200, 627);
    write_page(
        tmp.path(),
        "posts/hello.md",
        "# Hello\n\n{% image \"hello.png\", \"A wide gradient\", [600, 1200] %}\n",
    );
    tmp
}
