//! AVIF source decoding.
//!
//! The `image` crate's `avif` feature only encodes (rav1e); its decoder needs
//! the C dav1d library. Sources are read here instead: `avif-parse` for the
//! container and `rav1d` for the AV1 payload, then BT.601 YCbCr → RGB8.

use super::backend::{BackendError, Dimensions};
use image::{DynamicImage, Rgb, RgbImage};
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::Dav1dSettings;
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use rav1d::src::lib as dav1d;
use std::ffi::c_void;
use std::io::Cursor;
use std::mem::MaybeUninit;
use std::path::Path;
use std::ptr::NonNull;

fn failed(path: &Path, err: impl std::fmt::Display) -> BackendError {
    BackendError::ProcessingFailed(format!("Failed to decode AVIF {}: {}", path.display(), err))
}

fn read(path: &Path) -> Result<avif_parse::AvifData, BackendError> {
    let bytes = std::fs::read(path)?;
    avif_parse::read_avif(&mut Cursor::new(&bytes)).map_err(|e| failed(path, format!("{e:?}")))
}

/// Frame size from the container metadata, without decoding pixels.
pub(super) fn dimensions(path: &Path) -> Result<Dimensions, BackendError> {
    let avif = read(path)?;
    let meta = avif
        .primary_item_metadata()
        .map_err(|e| failed(path, format!("{e:?}")))?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

/// Decode the primary image to RGB8. Alpha is not carried over.
pub(super) fn decode(path: &Path) -> Result<DynamicImage, BackendError> {
    let avif = read(path)?;
    let av1: &[u8] = &avif.primary_item;

    let mut settings = MaybeUninit::<Dav1dSettings>::uninit();
    // SAFETY: dav1d_default_settings writes every field.
    let mut settings = unsafe {
        dav1d::dav1d_default_settings(NonNull::from(&mut settings).cast());
        settings.assume_init()
    };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe {
        dav1d::dav1d_open(Some(NonNull::from(&mut ctx)), Some(NonNull::from(&mut settings)))
    };
    if rc.0 != 0 {
        return Err(failed(path, format!("rav1d open returned {}", rc.0)));
    }

    // Everything after open runs in here so the context is closed on every path.
    let decoded = (|| -> Result<RgbImage, String> {
        let mut data = Dav1dData::default();
        let buf = unsafe { dav1d::dav1d_data_create(Some(NonNull::from(&mut data)), av1.len()) };
        if buf.is_null() {
            return Err("rav1d could not allocate input buffer".into());
        }
        // SAFETY: `buf` was just allocated with room for `av1.len()` bytes.
        unsafe { std::ptr::copy_nonoverlapping(av1.as_ptr(), buf, av1.len()) };

        let rc = unsafe { dav1d::dav1d_send_data(ctx, Some(NonNull::from(&mut data))) };
        if rc.0 != 0 {
            unsafe { dav1d::dav1d_data_unref(Some(NonNull::from(&mut data))) };
            return Err(format!("rav1d send_data returned {}", rc.0));
        }

        let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
        let rc = unsafe { dav1d::dav1d_get_picture(ctx, Some(NonNull::from(&mut pic))) };
        if rc.0 != 0 {
            return Err(format!("rav1d get_picture returned {}", rc.0));
        }
        let rgb = picture_to_rgb(&pic);
        unsafe { dav1d::dav1d_picture_unref(Some(NonNull::from(&mut pic))) };
        rgb
    })();

    unsafe { dav1d::dav1d_close(Some(NonNull::from(&mut ctx))) };
    decoded
        .map(DynamicImage::ImageRgb8)
        .map_err(|e| failed(path, e))
}

/// One decoded sample plane. Depths above 8 bits are stored as `u16`.
struct Plane {
    ptr: *const u8,
    stride: isize,
    bpc: u32,
}

impl Plane {
    fn new(data: Option<NonNull<c_void>>, stride: isize, bpc: u32) -> Result<Self, String> {
        let ptr = data.ok_or("rav1d returned a picture without plane data")?;
        Ok(Self {
            ptr: ptr.cast::<u8>().as_ptr().cast_const(),
            stride,
            bpc,
        })
    }

    /// # Safety
    ///
    /// `(x, y)` must lie inside the plane the decoder allocated.
    unsafe fn sample(&self, x: u32, y: u32) -> f32 {
        let row = y as isize * self.stride;
        unsafe {
            if self.bpc <= 8 {
                *self.ptr.offset(row + x as isize) as f32
            } else {
                self.ptr
                    .offset(row + x as isize * 2)
                    .cast::<u16>()
                    .read_unaligned() as f32
            }
        }
    }
}

struct Chroma {
    cb: Plane,
    cr: Plane,
    subsample_x: bool,
    subsample_y: bool,
}

impl Chroma {
    fn position(&self, x: u32, y: u32) -> (u32, u32) {
        (
            if self.subsample_x { x / 2 } else { x },
            if self.subsample_y { y / 2 } else { y },
        )
    }
}

fn picture_to_rgb(pic: &Dav1dPicture) -> Result<RgbImage, String> {
    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let bpc = pic.p.bpc as u32;

    let luma = Plane::new(pic.data[0], pic.stride[0], bpc)?;
    let chroma = match pic.p.layout {
        DAV1D_PIXEL_LAYOUT_I400 => None,
        layout => {
            let (subsample_x, subsample_y) = match layout {
                DAV1D_PIXEL_LAYOUT_I420 => (true, true),
                DAV1D_PIXEL_LAYOUT_I422 => (true, false),
                DAV1D_PIXEL_LAYOUT_I444 => (false, false),
                other => return Err(format!("unsupported pixel layout {other}")),
            };
            Some(Chroma {
                cb: Plane::new(pic.data[1], pic.stride[1], bpc)?,
                cr: Plane::new(pic.data[2], pic.stride[1], bpc)?,
                subsample_x,
                subsample_y,
            })
        }
    };

    let max = ((1u32 << bpc) - 1) as f32;
    let center = (1u32 << (bpc - 1)) as f32;
    let scale = 255.0 / max;
    let to_u8 = |v: f32| (v * scale).clamp(0.0, 255.0) as u8;

    let mut rgb = RgbImage::new(width, height);
    for (x, y, pixel) in rgb.enumerate_pixels_mut() {
        // SAFETY: the decoder sized every plane for `width` x `height`.
        let l = unsafe { luma.sample(x, y) };
        *pixel = match &chroma {
            None => {
                let v = to_u8(l);
                Rgb([v, v, v])
            }
            Some(c) => {
                let (cx, cy) = c.position(x, y);
                let (cb, cr) =
                    unsafe { (c.cb.sample(cx, cy) - center, c.cr.sample(cx, cy) - center) };
                Rgb([
                    to_u8(l + 1.402 * cr),
                    to_u8(l - 0.344136 * cb - 0.714136 * cr),
                    to_u8(l + 1.772 * cb),
                ])
            }
        };
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_avif;
    use tempfile::TempDir;

    #[test]
    fn dimensions_come_from_container() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.avif");
        write_avif(&path, 120, 80);

        assert_eq!(
            dimensions(&path).unwrap(),
            Dimensions {
                width: 120,
                height: 80
            }
        );
    }

    #[test]
    fn decode_restores_size_and_colour() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.avif");
        write_avif(&path, 64, 48);

        let img = decode(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (64, 48));
        // Lossy, so only the channel ordering is stable.
        let Rgb([r, g, b]) = *img.get_pixel(32, 24);
        assert!(r > g && r > b, "expected reddish pixel, got {r} {g} {b}");
    }

    #[test]
    fn not_an_avif_is_processing_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fake.avif");
        std::fs::write(&path, b"definitely not isobmff").unwrap();

        assert!(matches!(decode(&path), Err(BackendError::ProcessingFailed(_))));
        assert!(matches!(dimensions(&path), Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            decode(Path::new("/definitely/not/here.avif")),
            Err(BackendError::Io(_))
        ));
    }
}
