//! Pure calculation functions for variant dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::Width;

/// A single variant size to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSize {
    pub width: u32,
    pub height: u32,
}

/// Height that keeps the source aspect ratio at `width`.
///
/// Never rounds down to zero: a 1px-tall strip stays 1px tall.
///
/// ```
/// # use blog_media::imaging::{Dimensions, scaled_height};
/// let native = Dimensions { width: 2400, height: 1254 };
/// assert_eq!(scaled_height(native, 1200), 627);
/// ```
pub fn scaled_height(native: Dimensions, width: u32) -> u32 {
    if native.width == 0 {
        return native.height.max(1);
    }
    let height = (native.height as f64 * width as f64 / native.width as f64).round() as u32;
    height.max(1)
}

/// Resolve requested widths into the ordered set of variants to generate.
///
/// - `auto` becomes the native width
/// - an empty request means a single `auto`
/// - duplicates collapse (including `auto` next to the native width)
/// - the result is sorted by ascending width
///
/// Widths larger than the source are kept: every distinct requested width
/// yields exactly one variant.
pub fn plan_variant_sizes(native: Dimensions, requested: &[Width]) -> Vec<VariantSize> {
    let mut widths: Vec<u32> = if requested.is_empty() {
        vec![native.width]
    } else {
        requested
            .iter()
            .map(|w| match w {
                Width::Auto => native.width,
                Width::Pixels(px) => px.get(),
            })
            .collect()
    };
    widths.sort_unstable();
    widths.dedup();

    widths
        .into_iter()
        .map(|width| VariantSize {
            width,
            height: scaled_height(native, width),
        })
        .collect()
}
