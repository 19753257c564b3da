//! Image quality gate for donation photos.
//!
//! A submitted photo is decoded into an [`ImageSample`] and scored on two pixel statistics:
//!
//! - **Brightness**: mean luminance of the grayscale grid.
//! - **Sharpness**: variance of the discrete Laplacian of the grayscale grid. Flat or blurred
//!   photos have almost no edge response and therefore a low variance.
//!
//! The pass/fail thresholds live in [`QualityPolicy`] so they can be tuned without touching the
//! decode or scoring code.

pub mod error;
pub mod gate;
pub mod sample;
pub mod synthetic;

pub use error::*;
pub use gate::*;
pub use sample::*;
