/// Laplacian sharpness scoring
///
/// The score is the mean squared 4-neighbour Laplacian of a grayscale view
/// of the image. Grayscale is the truncating integer mean of R, G and B.
/// Border pixels are skipped when accumulating but still counted in the
/// divisor; thresholds are calibrated against exactly this normalization.
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

#[inline]
fn gray_at(raw: &[u8], width: usize, x: usize, y: usize) -> i64 {
    let i = (y * width + x) * 3;
    (raw[i] as i64 + raw[i + 1] as i64 + raw[i + 2] as i64) / 3
}

/// Compute the blur/focus score of an RGB image. Larger is sharper.
pub fn laplacian_sharpness(image: &RgbImage) -> f64 {
    let (w, h) = image.dimensions();
    let (width, height) = (w as usize, h as usize);
    let total = width * height;
    if total == 0 {
        return 0.0;
    }
    if width < 3 || height < 3 {
        return 0.0;
    }

    let raw = image.as_raw();
    let mut sum = 0.0f64;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = gray_at(raw, width, x, y);
            let up = gray_at(raw, width, x, y - 1);
            let down = gray_at(raw, width, x, y + 1);
            let left = gray_at(raw, width, x - 1, y);
            let right = gray_at(raw, width, x + 1, y);

            let laplacian = (up + down + left + right) - 4 * center;
            sum += (laplacian * laplacian) as f64;
        }
    }

    sum / total as f64
}

/// Result of scoring one capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharpnessVerdict {
    pub score: f64,
    pub accepted: bool,
}

/// Applies the minimum-score threshold to Laplacian scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpnessEvaluator {
    min_score: f64,
}

impl SharpnessEvaluator {
    pub fn new(min_score: f64) -> Self {
        Self { min_score }
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    pub fn accepts(&self, score: f64) -> bool {
        score >= self.min_score
    }

    pub fn evaluate(&self, image: &RgbImage) -> SharpnessVerdict {
        let score = laplacian_sharpness(image);
        log::debug!(
            "Sharpness {:.3} against threshold {:.3} ({}x{})",
            score,
            self.min_score,
            image.width(),
            image.height()
        );
        SharpnessVerdict {
            score,
            accepted: self.accepts(score),
        }
    }

    /// Score any decoded image; non-RGB layouts are converted first.
    pub fn evaluate_dynamic(&self, image: &DynamicImage) -> SharpnessVerdict {
        match image {
            DynamicImage::ImageRgb8(rgb) => self.evaluate(rgb),
            other => self.evaluate(&other.to_rgb8()),
        }
    }
}

impl Default for SharpnessEvaluator {
    fn default() -> Self {
        Self::new(10.0)
    }
}
