//! Convenience helpers for loading and saving images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{OwnedImage, Rgba};
use crate::util::{RingMatchError, RingMatchResult};
use std::path::Path;

/// Creates an owned RGBA image from an `image` RGBA buffer.
pub fn owned_from_rgba_image(img: &image::RgbaImage) -> RingMatchResult<OwnedImage<Rgba>> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img.pixels().map(|px| px.0).collect();
    OwnedImage::new(data, width, height)
}

/// Normalizes any decoded image to RGBA.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> RingMatchResult<OwnedImage<Rgba>> {
    let rgba = img.to_rgba8();
    owned_from_rgba_image(&rgba)
}

/// Loads an image from disk and converts it to an owned RGBA image.
pub fn load_rgba_image<P: AsRef<Path>>(path: P) -> RingMatchResult<OwnedImage<Rgba>> {
    let img = image::open(path).map_err(|err| RingMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}

/// Encodes an owned RGBA image to disk; the format follows the extension.
pub fn save_rgba_image<P: AsRef<Path>>(path: P, img: &OwnedImage<Rgba>) -> RingMatchResult<()> {
    let width = u32::try_from(img.width()).map_err(|_| RingMatchError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })?;
    let height = u32::try_from(img.height()).map_err(|_| RingMatchError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })?;
    let raw: Vec<u8> = img.data().iter().flatten().copied().collect();
    let buffer = image::RgbaImage::from_raw(width, height, raw).ok_or(
        RingMatchError::BufferTooSmall {
            needed: img.width() * img.height() * 4,
            got: img.data().len() * 4,
        },
    )?;
    buffer.save(path).map_err(|err| RingMatchError::ImageIo {
        reason: err.to_string(),
    })
}
