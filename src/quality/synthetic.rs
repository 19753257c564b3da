//! Synthetic donation photos.
//!
//! Used by the demo binary and the test suites to produce known brightness and sharpness
//! profiles without shipping fixture files.

use image::{GrayImage, ImageError, ImageFormat, Luma};
use std::io::Cursor;

/// A flat image where every pixel has the same intensity. No edges, so zero sharpness.
pub fn uniform_png(width: u32, height: u32, value: u8) -> Result<Vec<u8>, ImageError> {
    encode_png(&GrayImage::from_pixel(width, height, Luma([value])))
}

/// A checkerboard of `cell`-sized squares alternating between `dark` and `light`.
pub fn checkerboard_png(
    width: u32,
    height: u32,
    cell: u32,
    dark: u8,
    light: u8,
) -> Result<Vec<u8>, ImageError> {
    let cell = cell.max(1);
    let image = GrayImage::from_fn(width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            Luma([dark])
        } else {
            Luma([light])
        }
    });
    encode_png(&image)
}

/// PNG-encodes a grayscale image in memory.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
