//! Probe-vs-gallery verification.

use crate::gallery::{Gallery, GalleryError};
use crate::model::{ModelError, SimilarityModel};
use crate::preprocess::{PreprocessError, PreprocessedImage};
use crate::types::{Thresholds, VerificationResult};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("gallery is empty: no reference images to compare against")]
    EmptyGallery,
    #[error("{name} threshold {value} is outside [0, 1]")]
    InvalidThreshold { name: &'static str, value: f32 },
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Turn raw per-image scores into a decision.
///
/// `detections` counts scores strictly above the detection threshold
/// (NaN never counts). The result is verified only when the ratio strictly
/// exceeds the verification threshold.
pub fn decide(scores: &[f32], thresholds: &Thresholds) -> Result<VerificationResult, VerifyError> {
    if let Some((name, value)) = thresholds.out_of_range() {
        return Err(VerifyError::InvalidThreshold { name, value });
    }
    if scores.is_empty() {
        return Err(VerifyError::EmptyGallery);
    }

    let detections = scores.iter().filter(|&&s| s > thresholds.detection).count();
    let ratio = detections as f32 / scores.len() as f32;

    Ok(VerificationResult {
        scores: scores.to_vec(),
        detections,
        gallery_size: scores.len(),
        ratio,
        verified: ratio > thresholds.verification,
    })
}

/// Owns the similarity model and the decision thresholds.
pub struct Verifier {
    model: Box<dyn SimilarityModel>,
    thresholds: Thresholds,
}

impl Verifier {
    pub fn new(model: Box<dyn SimilarityModel>, thresholds: Thresholds) -> Result<Self, VerifyError> {
        if let Some((name, value)) = thresholds.out_of_range() {
            return Err(VerifyError::InvalidThreshold { name, value });
        }
        Ok(Self { model, thresholds })
    }

    /// Compare the probe image file against every image in `gallery_dir`.
    ///
    /// The gallery is re-listed on every call since it is managed outside
    /// this process.
    pub fn verify(
        &mut self,
        probe_path: &Path,
        gallery_dir: &Path,
    ) -> Result<VerificationResult, VerifyError> {
        let gallery = Gallery::open(gallery_dir)?;
        if gallery.is_empty() {
            return Err(VerifyError::EmptyGallery);
        }

        let probe = PreprocessedImage::from_path(probe_path)?;
        self.verify_preprocessed(&probe, &gallery)
    }

    /// Score an already-preprocessed probe against a listed gallery.
    pub fn verify_preprocessed(
        &mut self,
        probe: &PreprocessedImage,
        gallery: &Gallery,
    ) -> Result<VerificationResult, VerifyError> {
        let mut scores = Vec::with_capacity(gallery.len());
        for path in gallery.images() {
            let reference = PreprocessedImage::from_path(path)?;
            let score = self.model.score(probe, &reference)?;
            tracing::debug!(image = %path.display(), score, "scored gallery image");
            scores.push(score);
        }

        let result = decide(&scores, &self.thresholds)?;

        tracing::info!(detections = result.detections, "detection");
        tracing::info!(ratio = result.ratio, "verification");
        tracing::info!(verified = result.verified, "verified");

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn scores(positives: usize, total: usize) -> Vec<f32> {
        (0..total)
            .map(|i| if i < positives { 0.995 } else { 0.5 })
            .collect()
    }

    #[test]
    fn test_decide_48_of_50_verified() {
        let result = decide(&scores(48, 50), &Thresholds::default()).unwrap();
        assert_eq!(result.detections, 48);
        assert_eq!(result.gallery_size, 50);
        assert!((result.ratio - 0.96).abs() < 1e-6);
        assert!(result.verified);
    }

    #[test]
    fn test_decide_40_of_50_unverified() {
        let result = decide(&scores(40, 50), &Thresholds::default()).unwrap();
        assert_eq!(result.detections, 40);
        assert!((result.ratio - 0.80).abs() < 1e-6);
        assert!(!result.verified);
    }

    #[test]
    fn test_decide_ratio_equal_to_threshold_is_unverified() {
        // 44 / 50 == 0.88 exactly
        let result = decide(&scores(44, 50), &Thresholds::default()).unwrap();
        assert_eq!(result.ratio, 0.88);
        assert!(!result.verified);
    }

    #[test]
    fn test_decide_score_equal_to_detection_threshold_not_counted() {
        let result = decide(&[0.99, 0.99, 0.991], &Thresholds::default()).unwrap();
        assert_eq!(result.detections, 1);
    }

    #[test]
    fn test_decide_nan_never_counts() {
        let result = decide(&[f32::NAN, 1.0], &Thresholds::default()).unwrap();
        assert_eq!(result.detections, 1);
        assert_eq!(result.ratio, 0.5);
    }

    #[test]
    fn test_decide_ratio_always_in_unit_interval() {
        for total in 1..=20 {
            for positives in 0..=total {
                let result = decide(&scores(positives, total), &Thresholds::default()).unwrap();
                assert!((0.0..=1.0).contains(&result.ratio));
                assert_eq!(result.ratio, positives as f32 / total as f32);
            }
        }
    }

    #[test]
    fn test_decide_empty_gallery_is_error() {
        assert!(matches!(
            decide(&[], &Thresholds::default()),
            Err(VerifyError::EmptyGallery)
        ));
    }

    #[test]
    fn test_decide_rejects_bad_thresholds() {
        let t = Thresholds { detection: 0.99, verification: 1.2 };
        assert!(matches!(
            decide(&[1.0], &t),
            Err(VerifyError::InvalidThreshold { name: "verification", .. })
        ));
    }

    /// Scores a pair by how close the mean intensities are.
    struct MeanModel;

    impl SimilarityModel for MeanModel {
        fn score(
            &mut self,
            probe: &PreprocessedImage,
            reference: &PreprocessedImage,
        ) -> Result<f32, ModelError> {
            let a = probe.pixels().mean().unwrap_or(0.0);
            let b = reference.pixels().mean().unwrap_or(0.0);
            Ok(1.0 - (a - b).abs())
        }
    }

    fn write_solid(path: &Path, value: u8, size: u32) {
        RgbImage::from_pixel(size, size, Rgb([value, value, value]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_verify_against_gallery_directory() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = dir.path().join("verification_images");
        std::fs::create_dir(&gallery).unwrap();
        for i in 0..9 {
            write_solid(&gallery.join(format!("match_{i}.png")), 128, 64);
        }
        write_solid(&gallery.join("other.png"), 0, 64);

        let probe = dir.path().join("input_image.png");
        write_solid(&probe, 128, 250);

        let mut verifier = Verifier::new(Box::new(MeanModel), Thresholds::default()).unwrap();
        let result = verifier.verify(&probe, &gallery).unwrap();

        assert_eq!(result.gallery_size, 10);
        assert_eq!(result.detections, 9);
        assert!((result.ratio - 0.9).abs() < 1e-6);
        assert!(result.verified);
    }

    #[test]
    fn test_verify_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = dir.path().join("gallery");
        std::fs::create_dir(&gallery).unwrap();
        for (i, v) in [10u8, 120, 130, 250].iter().enumerate() {
            write_solid(&gallery.join(format!("{i}.png")), *v, 40);
        }
        let probe = dir.path().join("probe.png");
        write_solid(&probe, 125, 80);

        let mut verifier = Verifier::new(Box::new(MeanModel), Thresholds::default()).unwrap();
        let first = verifier.verify(&probe, &gallery).unwrap();
        let second = verifier.verify(&probe, &gallery).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_empty_gallery() {
        let dir = tempfile::tempdir().unwrap();
        let probe = dir.path().join("probe.png");
        write_solid(&probe, 100, 10);

        let empty = tempfile::tempdir().unwrap();
        std::fs::write(empty.path().join("README.txt"), b"not a gallery image").unwrap();

        let mut verifier = Verifier::new(Box::new(MeanModel), Thresholds::default()).unwrap();
        let err = verifier.verify(&probe, empty.path()).unwrap_err();
        assert!(matches!(err, VerifyError::EmptyGallery));
    }

    #[test]
    fn test_verify_corrupt_gallery_image_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = dir.path().join("gallery");
        std::fs::create_dir(&gallery).unwrap();
        write_solid(&gallery.join("good.png"), 100, 20);
        std::fs::write(gallery.join("bad.jpg"), b"truncated").unwrap();
        let probe = dir.path().join("probe.png");
        write_solid(&probe, 100, 20);

        let mut verifier = Verifier::new(Box::new(MeanModel), Thresholds::default()).unwrap();
        let err = verifier.verify(&probe, &gallery).unwrap_err();
        assert!(matches!(err, VerifyError::Preprocess(PreprocessError::Decode { .. })));
    }

    #[test]
    fn test_verifier_rejects_bad_thresholds() {
        let t = Thresholds { detection: -0.5, verification: 0.88 };
        assert!(Verifier::new(Box::new(MeanModel), t).is_err());
    }
}
