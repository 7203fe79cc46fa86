use crate::config::Config;
use faceid_core::model::{load_model, ModelError};
use faceid_core::{VerificationResult, Verifier, VerifyError};
use faceid_hw::{Camera, CameraError, CropRegion, Frame, FrameError, FrameSource};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("verification error: {0}")]
    Verify(#[from] VerifyError),
}

/// Application-lifetime context: the one owner of the camera and the model.
///
/// The live view and verification both go through `&self`/`&mut self`
/// here, so every camera read is scoped to a single call.
pub struct Engine<S: FrameSource = Camera> {
    source: S,
    verifier: Verifier,
    crop: CropRegion,
    probe_path: PathBuf,
    gallery_dir: PathBuf,
}

impl Engine<Camera> {
    /// Open the camera and load the model. Fails fast if either is unavailable.
    pub fn open(config: &Config) -> Result<Self, EngineError> {
        let camera = Camera::open(&config.camera_device)?;
        tracing::info!(
            device = %config.camera_device,
            width = camera.width,
            height = camera.height,
            fourcc = ?camera.fourcc,
            "camera opened"
        );
        camera.warm_up(config.warmup_frames);

        let model = load_model(&config.model_path, config.head_path.as_deref())?;
        let verifier = Verifier::new(model, config.thresholds())?;

        Ok(Self::new(
            camera,
            verifier,
            config.crop,
            config.probe_path.clone(),
            config.gallery_dir.clone(),
        ))
    }
}

/// Verify a probe file without touching the camera.
pub fn verify_file(config: &Config, probe: &Path) -> Result<VerificationResult, EngineError> {
    let model = load_model(&config.model_path, config.head_path.as_deref())?;
    let mut verifier = Verifier::new(model, config.thresholds())?;
    Ok(verifier.verify(probe, &config.gallery_dir)?)
}

impl<S: FrameSource> Engine<S> {
    pub fn new(
        source: S,
        verifier: Verifier,
        crop: CropRegion,
        probe_path: PathBuf,
        gallery_dir: PathBuf,
    ) -> Self {
        Self {
            source,
            verifier,
            crop,
            probe_path,
            gallery_dir,
        }
    }

    /// Read one frame and cut out the configured region.
    pub fn capture(&self) -> Result<Frame, EngineError> {
        let frame = self.source.capture_frame()?;
        Ok(frame.crop(&self.crop)?)
    }

    /// Save a fresh cropped frame to `path`.
    pub fn snapshot(&self, path: &Path) -> Result<Frame, EngineError> {
        let frame = self.capture()?;
        frame.save(path)?;
        tracing::info!(path = %path.display(), "snapshot saved");
        Ok(frame)
    }

    /// Capture a probe, overwrite the probe file, compare against the gallery.
    pub fn verify(&mut self) -> Result<VerificationResult, EngineError> {
        let frame = self.capture()?;
        frame.save(&self.probe_path)?;
        tracing::debug!(
            probe = %self.probe_path.display(),
            sequence = frame.sequence,
            "probe captured"
        );
        Ok(self.verifier.verify(&self.probe_path, &self.gallery_dir)?)
    }

    /// Release the camera.
    pub fn shutdown(self) {
        self.source.close();
    }
}
