use serde::{Deserialize, Serialize};
use std::fmt;

/// Default per-pair score cutoff above which a comparison counts as a positive match.
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.99;
/// Default cutoff on the positive-match ratio above which the identity is verified.
pub const DEFAULT_VERIFICATION_THRESHOLD: f32 = 0.88;

/// Face embedding vector produced by the twin network's shared encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The two cutoffs that turn raw similarity scores into a decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub detection: f32,
    pub verification: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            detection: DEFAULT_DETECTION_THRESHOLD,
            verification: DEFAULT_VERIFICATION_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Returns the name of the first threshold outside [0, 1], if any.
    pub fn out_of_range(&self) -> Option<(&'static str, f32)> {
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        if !in_range(self.detection) {
            Some(("detection", self.detection))
        } else if !in_range(self.verification) {
            Some(("verification", self.verification))
        } else {
            None
        }
    }
}

/// Aggregate outcome of comparing one probe against a gallery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    /// Raw similarity score per gallery image, in gallery order.
    pub scores: Vec<f32>,
    /// Number of scores strictly above the detection threshold.
    pub detections: usize,
    pub gallery_size: usize,
    /// `detections / gallery_size`, always in [0, 1].
    pub ratio: f32,
    pub verified: bool,
}

/// Text shown in the verification label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VerificationStatus {
    #[default]
    Uninitiated,
    Verified,
    Unverified,
    Failed(String),
}

impl From<&VerificationResult> for VerificationStatus {
    fn from(result: &VerificationResult) -> Self {
        if result.verified {
            Self::Verified
        } else {
            Self::Unverified
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitiated => f.write_str("Verification Uninitiated"),
            Self::Verified => f.write_str("Verified"),
            Self::Unverified => f.write_str("Unverified"),
            Self::Failed(reason) => write!(f, "Verification Failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = Thresholds::default();
        assert_eq!(t.detection, 0.99);
        assert_eq!(t.verification, 0.88);
        assert!(t.out_of_range().is_none());
    }

    #[test]
    fn test_thresholds_out_of_range() {
        let t = Thresholds { detection: 1.5, verification: 0.5 };
        assert_eq!(t.out_of_range(), Some(("detection", 1.5)));

        let t = Thresholds { detection: 0.5, verification: -0.1 };
        assert_eq!(t.out_of_range(), Some(("verification", -0.1)));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(VerificationStatus::default().to_string(), "Verification Uninitiated");
        assert_eq!(VerificationStatus::Verified.to_string(), "Verified");
        assert_eq!(VerificationStatus::Unverified.to_string(), "Unverified");
        assert_eq!(
            VerificationStatus::Failed("empty gallery".into()).to_string(),
            "Verification Failed: empty gallery"
        );
    }

    #[test]
    fn test_status_from_result() {
        let result = VerificationResult {
            scores: vec![1.0],
            detections: 1,
            gallery_size: 1,
            ratio: 1.0,
            verified: true,
        };
        assert_eq!(VerificationStatus::from(&result), VerificationStatus::Verified);
    }
}
