//! Frame type and pixel handling — YUYV conversion, cropping, probe snapshots.

use image::RgbImage;
use serde::Deserialize;
use std::path::Path;

/// A captured RGB camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

/// Rectangle cut out of every captured frame before display and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CropRegion {
    /// 250x250 window at (200, 120) of a 640x480 capture.
    fn default() -> Self {
        Self {
            x: 200,
            y: 120,
            width: 250,
            height: 250,
        }
    }
}

impl Frame {
    /// RGB value at (x, y). Caller guarantees bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Copy out the given region.
    pub fn crop(&self, region: &CropRegion) -> Result<Frame, FrameError> {
        let fits_x = region.x.checked_add(region.width).is_some_and(|r| r <= self.width);
        let fits_y = region.y.checked_add(region.height).is_some_and(|b| b <= self.height);
        if region.width == 0 || region.height == 0 || !fits_x || !fits_y {
            return Err(FrameError::CropOutOfBounds {
                region: *region,
                width: self.width,
                height: self.height,
            });
        }

        let src_stride = self.width as usize * 3;
        let row_len = region.width as usize * 3;
        let mut data = Vec::with_capacity(row_len * region.height as usize);
        for row in region.y..region.y + region.height {
            let start = row as usize * src_stride + region.x as usize * 3;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }

        Ok(Frame {
            data,
            width: region.width,
            height: region.height,
            timestamp: self.timestamp,
            sequence: self.sequence,
        })
    }

    /// View the frame as an `image` buffer.
    pub fn to_rgb_image(&self) -> Result<RgbImage, FrameError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            FrameError::InvalidLength {
                expected: (self.width * self.height * 3) as usize,
                actual: self.data.len(),
            },
        )
    }

    /// Write the frame to `path`, replacing any existing file. The format
    /// follows the file extension.
    pub fn save(&self, path: &Path) -> Result<(), FrameError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FrameError::Save(e.to_string()))?;
        }
        self.to_rgb_image()?
            .save(path)
            .map_err(|e| FrameError::Save(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), width = self.width, height = self.height, "frame saved");
        Ok(())
    }
}

/// Convert packed YUYV (4:2:2) to RGB using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U/V.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    Ok(rgb)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    let r = y + 1.402 * v;
    let g = y - 0.344_136 * u - 0.714_136 * v;
    let b = y + 1.772 * u;
    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("crop {region:?} does not fit a {width}x{height} frame")]
    CropOutOfBounds {
        region: CropRegion,
        width: u32,
        height: u32,
    },
    #[error("failed to save frame: {0}")]
    Save(String),
}
