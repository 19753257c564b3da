use super::DecodeError;
use image::{DynamicImage, GrayImage, RgbImage};

/// A decoded donation photo.
///
/// Holds both the grayscale intensity grid used for scoring and the color grid. A sample is
/// created per submission and dropped as soon as the gate has produced its verdict.
#[derive(Debug, Clone)]
pub struct ImageSample {
    gray: GrayImage,
    color: RgbImage,
}

impl ImageSample {
    /// Decodes raw bytes (PNG or JPEG) into a sample.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let image = image::load_from_memory(bytes)?;
        Self::from_dynamic(image)
    }

    /// Builds a sample from an already decoded image.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, DecodeError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::NoPixels);
        }
        Ok(Self {
            gray: image.to_luma8(),
            color: image.to_rgb8(),
        })
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn color(&self) -> &RgbImage {
        &self.color
    }

    /// Mean luminance over the grayscale grid, in `0.0..=255.0`.
    pub fn mean_luminance(&self) -> f64 {
        let total: u64 = self.gray.pixels().map(|p| u64::from(p.0[0])).sum();
        total as f64 / self.pixel_count()
    }

    /// Per-channel mean of the color grid as `[r, g, b]`.
    pub fn mean_rgb(&self) -> [f64; 3] {
        let mut sums = [0u64; 3];
        for pixel in self.color.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += u64::from(channel);
            }
        }
        let count = self.pixel_count();
        sums.map(|sum| sum as f64 / count)
    }

    /// Population variance of the 4-neighbour Laplacian response.
    ///
    /// Uses the `[0 1 0; 1 -4 1; 0 1 0]` kernel with reflect-101 borders (`-1 -> 1`,
    /// `n -> n - 2`).
    pub fn laplacian_variance(&self) -> f64 {
        let (width, height) = (self.width() as usize, self.height() as usize);
        let at = |x: usize, y: usize| f64::from(self.gray.get_pixel(x as u32, y as u32).0[0]);

        let mut responses = Vec::with_capacity(width * height);
        for y in 0..height {
            let (up, down) = (reflect_101(y, -1, height), reflect_101(y, 1, height));
            for x in 0..width {
                let (left, right) = (reflect_101(x, -1, width), reflect_101(x, 1, width));
                let response =
                    at(x, up) + at(x, down) + at(left, y) + at(right, y) - 4.0 * at(x, y);
                responses.push(response);
            }
        }

        let count = responses.len() as f64;
        let mean = responses.iter().sum::<f64>() / count;
        responses.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / count
    }

    fn pixel_count(&self) -> f64 {
        f64::from(self.width()) * f64::from(self.height())
    }
}

/// Index of the neighbour at `offset` (±1) from `index`, mirrored at the borders without
/// repeating the edge pixel.
fn reflect_101(index: usize, offset: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let target = index as isize + offset;
    if target < 0 {
        (-target) as usize
    } else if target as usize >= len {
        2 * len - 2 - target as usize
    } else {
        target as usize
    }
}
