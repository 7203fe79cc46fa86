//! Image preprocessing for the twin network.
//!
//! Every image, probe or gallery, goes through the same path: decode,
//! bilinear resize to 100x100, scale channels to [0, 1]. The model
//! consumes NHWC tensors.
//!
//! The resize samples two neighbours per axis at half-pixel centres with
//! no antialiasing, in f32 throughout, so a model exported from the
//! training graph sees the same tensors it was trained on.

use image::RgbImage;
use ndarray::{Array3, Array4, Axis};
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
pub const INPUT_SIZE: usize = 100;
pub const INPUT_CHANNELS: usize = 3;
const PIXEL_SCALE: f32 = 255.0;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image has zero size")]
    Empty,
}

/// A 100x100x3 image with channel values in [0, 1].
///
/// Only constructible through the preprocessing functions, so the shape
/// and value range always hold.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedImage {
    pixels: Array3<f32>,
}

impl PreprocessedImage {
    /// Decode an image file and preprocess it.
    pub fn from_path(path: &Path) -> Result<Self, PreprocessError> {
        let img = image::open(path).map_err(|source| PreprocessError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_rgb(&img.to_rgb8())
    }

    /// Preprocess an already-decoded RGB image of any resolution.
    pub fn from_rgb(img: &RgbImage) -> Result<Self, PreprocessError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(PreprocessError::Empty);
        }

        let (width, height) = (img.width() as usize, img.height() as usize);
        let cols = sample_taps(width, INPUT_SIZE);
        let rows = sample_taps(height, INPUT_SIZE);

        let mut pixels = Array3::<f32>::zeros((INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS));
        for (y, &(y0, y1, fy)) in rows.iter().enumerate() {
            for (x, &(x0, x1, fx)) in cols.iter().enumerate() {
                let tl = img.get_pixel(x0 as u32, y0 as u32);
                let tr = img.get_pixel(x1 as u32, y0 as u32);
                let bl = img.get_pixel(x0 as u32, y1 as u32);
                let br = img.get_pixel(x1 as u32, y1 as u32);

                for c in 0..INPUT_CHANNELS {
                    let top = lerp(tl[c] as f32, tr[c] as f32, fx);
                    let bottom = lerp(bl[c] as f32, br[c] as f32, fx);
                    pixels[[y, x, c]] = lerp(top, bottom, fy) / PIXEL_SCALE;
                }
            }
        }

        Ok(Self { pixels })
    }

    /// The image as a single-item NHWC batch `[1, 100, 100, 3]`.
    pub fn to_batch(&self) -> Array4<f32> {
        self.pixels.clone().insert_axis(Axis(0))
    }

    pub fn pixels(&self) -> &Array3<f32> {
        &self.pixels
    }
}

/// Source taps for each output coordinate along one axis:
/// `(lower, upper, weight of upper)`.
fn sample_taps(in_size: usize, out_size: usize) -> Vec<(usize, usize, f32)> {
    let scale = in_size as f32 / out_size as f32;
    (0..out_size)
        .map(|out| {
            let src = ((out as f32 + 0.5) * scale - 0.5).max(0.0);
            let lower = (src.floor() as usize).min(in_size - 1);
            let upper = (lower + 1).min(in_size - 1);
            (lower, upper, src - src.floor())
        })
        .collect()
}

// Exact at both ends, so interpolated values never leave [a, b].
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
