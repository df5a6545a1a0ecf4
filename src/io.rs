//! Mask rendering via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Masks are upscaled from
//! feature space with nearest-neighbour sampling.

use crate::grid::{Grid, InstanceMap, Mask};
use crate::util::{ShelfError, ShelfResult};
use std::path::Path;

/// Renders `mask` as a `width × height` grayscale image: 255 for set cells.
pub fn mask_to_gray_image(mask: &Mask, width: u32, height: u32) -> ShelfResult<image::GrayImage> {
    upscale_nearest(mask, width, height, |&v| if v { 255 } else { 0 })
}

/// Renders instance labels as distinct gray levels; background stays black.
pub fn instances_to_gray_image(
    map: &InstanceMap,
    width: u32,
    height: u32,
) -> ShelfResult<image::GrayImage> {
    upscale_nearest(map, width, height, |&label| match label {
        0 => 0,
        l => (64 + (l.wrapping_mul(37) % 192)) as u8,
    })
}

/// Renders `mask` at `size × size` and writes it as PNG.
pub fn save_mask_png<P: AsRef<Path>>(mask: &Mask, size: u32, path: P) -> ShelfResult<()> {
    let img = mask_to_gray_image(mask, size, size)?;
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|err| ShelfError::ImageIo {
            reason: err.to_string(),
        })
}

fn upscale_nearest<T, F>(
    grid: &Grid<T>,
    width: u32,
    height: u32,
    level: F,
) -> ShelfResult<image::GrayImage>
where
    F: Fn(&T) -> u8,
{
    if width == 0 || height == 0 {
        return Err(ShelfError::InvalidDimensions {
            width: width as usize,
            height: height as usize,
        });
    }
    let (src_w, src_h) = grid.shape();
    let src = grid.as_slice();
    Ok(image::GrayImage::from_fn(width, height, |x, y| {
        let sx = (x as usize * src_w / width as usize).min(src_w - 1);
        let sy = (y as usize * src_h / height as usize).min(src_h - 1);
        image::Luma([level(&src[sy * src_w + sx])])
    }))
}
