use super::{DecodeError, ImageSample};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Pass/fail thresholds applied to a scored sample.
///
/// Both comparisons are strict: a photo passes only when its brightness is *above*
/// `min_brightness` and its sharpness is *above* `min_sharpness`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPolicy {
    /// Minimum mean luminance (0-255).
    pub min_brightness: f64,
    /// Minimum Laplacian variance.
    pub min_sharpness: f64,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            min_brightness: 40.0,
            min_sharpness: 100.0,
        }
    }
}

impl QualityPolicy {
    pub fn accepts(&self, brightness: f64, sharpness: f64) -> bool {
        brightness > self.min_brightness && sharpness > self.min_sharpness
    }
}

/// Outcome of scoring one photo. Read-only once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityVerdict {
    passed: bool,
    brightness_score: u8,
    blur_score: f64,
}

impl QualityVerdict {
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Mean luminance truncated to an integer.
    pub fn brightness_score(&self) -> u8 {
        self.brightness_score
    }

    /// Laplacian variance. Low values mean a flat or blurred photo.
    pub fn blur_score(&self) -> f64 {
        self.blur_score
    }
}

/// Scores donation photos against a [`QualityPolicy`].
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    policy: QualityPolicy,
}

impl QualityGate {
    pub fn new(policy: QualityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &QualityPolicy {
        &self.policy
    }

    /// Decodes `image_bytes` and scores the result.
    ///
    /// # Errors
    /// Returns [`DecodeError`] when the bytes are not a readable image. A malformed upload is a
    /// final answer; it is never retried.
    pub fn evaluate(&self, image_bytes: &[u8]) -> Result<QualityVerdict, DecodeError> {
        let sample = ImageSample::decode(image_bytes)?;
        Ok(self.inspect(&sample))
    }

    /// Scores an already decoded sample.
    pub fn inspect(&self, sample: &ImageSample) -> QualityVerdict {
        let brightness = sample.mean_luminance();
        let sharpness = sample.laplacian_variance();
        debug!(
            width = sample.width(),
            height = sample.height(),
            mean_rgb = ?sample.mean_rgb(),
            "Sample scored"
        );

        let verdict = QualityVerdict {
            passed: self.policy.accepts(brightness, sharpness),
            brightness_score: brightness as u8,
            blur_score: sharpness,
        };
        info!(
            passed = verdict.passed,
            brightness = verdict.brightness_score,
            blur = verdict.blur_score,
            "Quality verdict"
        );
        verdict
    }
}
