use anyhow::{Context, Result};
use faceid_core::types::{DEFAULT_DETECTION_THRESHOLD, DEFAULT_VERIFICATION_THRESHOLD};
use faceid_core::Thresholds;
use faceid_hw::CropRegion;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
///
/// Built from defaults, then an optional TOML file, then `FACEID_*`
/// environment variables (highest precedence).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Siamese ONNX model, or the shared encoder when `head_path` is set.
    pub model_path: PathBuf,
    /// JSON dense head for split encoder + head exports.
    pub head_path: Option<PathBuf>,
    /// Directory of reference images.
    pub gallery_dir: PathBuf,
    /// Snapshot file overwritten on every verification.
    pub probe_path: PathBuf,
    /// Per-pair score cutoff for a positive match.
    pub detection_threshold: f32,
    /// Positive-match ratio cutoff for a verified identity.
    pub verification_threshold: f32,
    /// Region cut out of each captured frame.
    pub crop: CropRegion,
    /// Live view refresh interval in milliseconds.
    pub tick_ms: u64,
    /// Number of frames to discard after opening the camera.
    pub warmup_frames: usize,
    /// Where the interactive UI writes its log files.
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let app_data = PathBuf::from("application_data");
        Self {
            camera_device: "/dev/video0".to_string(),
            model_path: PathBuf::from("siamese_model.onnx"),
            head_path: None,
            gallery_dir: app_data.join("verification_images"),
            probe_path: app_data.join("input_image").join("input_image.jpg"),
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
            verification_threshold: DEFAULT_VERIFICATION_THRESHOLD,
            crop: CropRegion::default(),
            tick_ms: 1000 / 33,
            warmup_frames: 4,
            log_dir: default_data_dir().join("logs"),
        }
    }
}

impl Config {
    /// Load configuration. `path` (or `FACEID_CONFIG`) names an optional TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("FACEID_CONFIG").ok().map(PathBuf::from));

        let mut config = match file {
            Some(file) => Self::from_file(&file)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `FACEID_*` overrides from `lookup`. Unparseable numbers are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("FACEID_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        if let Some(v) = lookup("FACEID_MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACEID_HEAD_PATH") {
            self.head_path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = lookup("FACEID_GALLERY_DIR") {
            self.gallery_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACEID_PROBE_PATH") {
            self.probe_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACEID_LOG_DIR") {
            self.log_dir = PathBuf::from(v);
        }
        self.detection_threshold =
            parsed(&lookup, "FACEID_DETECTION_THRESHOLD", self.detection_threshold);
        self.verification_threshold =
            parsed(&lookup, "FACEID_VERIFICATION_THRESHOLD", self.verification_threshold);
        self.tick_ms = parsed(&lookup, "FACEID_TICK_MS", self.tick_ms);
        self.warmup_frames = parsed(&lookup, "FACEID_WARMUP_FRAMES", self.warmup_frames);
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            detection: self.detection_threshold,
            verification: self.verification_threshold,
        }
    }

    pub fn tick(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_ms.max(1))
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("faceid")
}
