//! faceid-hw — Camera capture for face verification.
//!
//! Provides V4L2-based webcam access and the RGB frame type shared by
//! the live view and the verification pipeline.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, FrameSource, PixelFormat};
pub use frame::{CropRegion, Frame, FrameError};
