//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image` crate (pure Rust decoders) |
//! | Decode (AVIF) | `avif-parse` container + `rav1d` AV1 decoder, see [`super::avif`] |
//! | Animation | `image::AnimationDecoder` (GIF, WebP) → per-frame resize → `GifEncoder` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → PNG / GIF | `PngEncoder` / `GifEncoder` |

use super::avif;
use super::backend::{BackendError, Dimensions, ImageBackend, SourceInfo};
use super::params::{OutputFormat, ResizeParams};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::webp::WebPDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(context: &str, path: &Path, err: impl std::fmt::Display) -> BackendError {
    BackendError::ProcessingFailed(format!("{} {}: {}", context, path.display(), err))
}

/// Map a decoded container format to one we can also write.
fn writable_format(format: ImageFormat) -> Option<OutputFormat> {
    match format {
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::Png => Some(OutputFormat::Png),
        ImageFormat::Gif => Some(OutputFormat::Gif),
        ImageFormat::WebP => Some(OutputFormat::Webp),
        ImageFormat::Avif => Some(OutputFormat::Avif),
        _ => None,
    }
}

fn open_buffered(path: &Path) -> Result<BufReader<File>, BackendError> {
    Ok(BufReader::new(File::open(path)?))
}

/// Whether a GIF or WebP file holds more than one frame.
fn is_animated(path: &Path, format: ImageFormat) -> Result<bool, BackendError> {
    match format {
        ImageFormat::Gif => {
            let decoder =
                GifDecoder::new(open_buffered(path)?).map_err(|e| failed("Failed to read", path, e))?;
            // Stop after the second frame; counting the whole file is wasted work.
            Ok(decoder.into_frames().take(2).count() > 1)
        }
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(open_buffered(path)?)
                .map_err(|e| failed("Failed to read", path, e))?;
            Ok(decoder.has_animation())
        }
        _ => Ok(false),
    }
}

/// Decode every frame of an animated GIF or WebP, composited to full canvas.
fn load_frames(path: &Path) -> Result<Vec<Frame>, BackendError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let frames = match reader.format() {
        Some(ImageFormat::Gif) => GifDecoder::new(open_buffered(path)?)
            .map_err(|e| failed("Failed to decode", path, e))?
            .into_frames()
            .collect_frames(),
        Some(ImageFormat::WebP) => WebPDecoder::new(open_buffered(path)?)
            .map_err(|e| failed("Failed to decode", path, e))?
            .into_frames()
            .collect_frames(),
        other => {
            return Err(BackendError::ProcessingFailed(format!(
                "{} is not an animated format ({:?})",
                path.display(),
                other
            )));
        }
    };
    frames.map_err(|e| failed("Failed to decode frames of", path, e))
}

/// Load and decode a still image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    if reader.format() == Some(ImageFormat::Avif) {
        return avif::decode(path);
    }
    reader
        .decode()
        .map_err(|e| failed("Failed to decode", path, e))
}

fn create_output(path: &Path) -> Result<BufWriter<File>, BackendError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Encode a still image in the requested format.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: u32,
) -> Result<(), BackendError> {
    let writer = create_output(path)?;
    let encoded = match format {
        OutputFormat::Webp => {
            // The pure-Rust WebP encoder is lossless-only; quality does not apply.
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(image::codecs::webp::WebPEncoder::new_lossless(writer))
        }
        OutputFormat::Avif => img.write_with_encoder(
            image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 6, quality as u8),
        ),
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
                writer,
                quality as u8,
            ))
        }
        OutputFormat::Png => {
            img.write_with_encoder(image::codecs::png::PngEncoder::new(writer))
        }
        OutputFormat::Gif => {
            let mut encoder = GifEncoder::new(writer);
            encoder.encode_frame(Frame::new(img.to_rgba8()))
        }
    };
    encoded.map_err(|e| failed(&format!("{} encode failed for", format), path, e))
}

/// Resize every frame and write an infinitely looping GIF.
fn save_animation(
    frames: Vec<Frame>,
    path: &Path,
    width: u32,
    height: u32,
) -> Result<(), BackendError> {
    let resized = frames.into_iter().map(|frame| {
        let delay = frame.delay();
        let buffer = image::imageops::resize(frame.buffer(), width, height, FilterType::Lanczos3);
        Frame::from_parts(buffer, 0, 0, delay)
    });

    let mut encoder = GifEncoder::new(create_output(path)?);
    encoder
        .set_repeat(Repeat::Infinite)
        .and_then(|_| encoder.encode_frames(resized))
        .map_err(|e| failed("GIF encode failed for", path, e))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<SourceInfo, BackendError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| failed("Unrecognised image format", path, "no decoder"))?;
        let dimensions = if format == ImageFormat::Avif {
            avif::dimensions(path)?
        } else {
            let (width, height) = reader
                .into_dimensions()
                .map_err(|e| failed("Failed to read dimensions of", path, e))?;
            Dimensions { width, height }
        };

        Ok(SourceInfo {
            dimensions,
            format: writable_format(format),
            animated: is_animated(path, format)?,
        })
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        if params.animated && params.format.supports_animation() {
            let frames = load_frames(&params.source)?;
            return save_animation(frames, &params.output, params.width, params.height);
        }

        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        save_image(&resized, &params.output, params.format, params.quality.value())
    }
}
