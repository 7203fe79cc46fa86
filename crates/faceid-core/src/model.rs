//! Twin-network similarity models via ONNX Runtime.
//!
//! Two export layouts are supported:
//!
//! - [`SiameseModel`]: the whole network in one graph. Two NHWC image
//!   inputs, one sigmoid score out.
//! - [`TwinModel`]: only the shared encoder in ONNX. Each image is embedded
//!   separately, the embeddings go through [`l1_distance`], and a dense
//!   sigmoid head loaded from JSON produces the score.

use crate::distance::{l1_distance, DistanceError};
use crate::preprocess::PreprocessedImage;
use crate::types::Embedding;
use ort::session::Session;
use ort::value::TensorRef;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("failed to read dense head {path}: {reason}")]
    InvalidHead { path: String, reason: String },
    #[error("model has {actual} inputs, expected {expected}")]
    InputCount { expected: usize, actual: usize },
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("dense head expects {expected} features, embedding has {actual}")]
    HeadMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Distance(#[from] DistanceError),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Strategy for scoring a (probe, reference) pair.
pub trait SimilarityModel {
    /// Similarity score for one pair. Higher = more similar.
    fn score(
        &mut self,
        probe: &PreprocessedImage,
        reference: &PreprocessedImage,
    ) -> Result<f32, ModelError>;
}

fn open_session(model_path: &Path) -> Result<Session, ModelError> {
    if !model_path.exists() {
        return Err(ModelError::ModelNotFound(model_path.display().to_string()));
    }

    let session = Session::builder()?
        .with_intra_threads(2)?
        .commit_from_file(model_path)?;

    tracing::info!(
        path = %model_path.display(),
        inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
        outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
        "loaded ONNX model"
    );

    Ok(session)
}

/// Full twin network exported as a single graph.
pub struct SiameseModel {
    session: Session,
}

impl SiameseModel {
    pub fn load(model_path: &Path) -> Result<Self, ModelError> {
        let session = open_session(model_path)?;
        let inputs = session.inputs().len();
        if inputs != 2 {
            return Err(ModelError::InputCount { expected: 2, actual: inputs });
        }
        Ok(Self { session })
    }
}

impl SimilarityModel for SiameseModel {
    fn score(
        &mut self,
        probe: &PreprocessedImage,
        reference: &PreprocessedImage,
    ) -> Result<f32, ModelError> {
        let probe = probe.to_batch();
        let reference = reference.to_batch();

        let outputs = self.session.run(ort::inputs![
            TensorRef::from_array_view(probe.view())?,
            TensorRef::from_array_view(reference.view())?
        ])?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::InferenceFailed(format!("score extraction: {e}")))?;

        data.first()
            .copied()
            .ok_or_else(|| ModelError::InferenceFailed("model returned an empty score tensor".into()))
    }
}

/// Final `Dense(1, sigmoid)` layer of the twin network.
#[derive(Debug, Clone, Deserialize)]
pub struct DenseHead {
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl DenseHead {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let invalid = |reason: String| ModelError::InvalidHead {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let head: DenseHead = serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;
        if head.weights.is_empty() {
            return Err(invalid("weights are empty".into()));
        }
        Ok(head)
    }

    /// `sigmoid(w · features + b)`.
    pub fn apply(&self, features: &Embedding) -> Result<f32, ModelError> {
        if features.len() != self.weights.len() {
            return Err(ModelError::HeadMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            });
        }
        let logit: f32 = self
            .weights
            .iter()
            .zip(features.values.iter())
            .map(|(w, x)| w * x)
            .sum::<f32>()
            + self.bias;
        Ok(sigmoid(logit))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Shared encoder in ONNX plus L1 distance and a dense head.
pub struct TwinModel {
    encoder: Session,
    head: DenseHead,
}

impl TwinModel {
    pub fn load(encoder_path: &Path, head_path: &Path) -> Result<Self, ModelError> {
        let encoder = open_session(encoder_path)?;
        let inputs = encoder.inputs().len();
        if inputs != 1 {
            return Err(ModelError::InputCount { expected: 1, actual: inputs });
        }
        let head = DenseHead::load(head_path)?;
        tracing::info!(
            path = %head_path.display(),
            features = head.weights.len(),
            "loaded dense head"
        );
        Ok(Self { encoder, head })
    }

    /// Run the shared encoder on one image.
    pub fn embed(&mut self, image: &PreprocessedImage) -> Result<Embedding, ModelError> {
        let input = image.to_batch();
        let outputs = self
            .encoder
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::InferenceFailed(format!("embedding extraction: {e}")))?;

        Ok(Embedding {
            values: data.to_vec(),
        })
    }
}

impl SimilarityModel for TwinModel {
    fn score(
        &mut self,
        probe: &PreprocessedImage,
        reference: &PreprocessedImage,
    ) -> Result<f32, ModelError> {
        let probe = self.embed(probe)?;
        let reference = self.embed(reference)?;
        let distance = l1_distance(&probe, &reference)?;
        self.head.apply(&distance)
    }
}

/// Load whichever layout the paths describe: a dense head path selects
/// [`TwinModel`], otherwise the model file is treated as a full [`SiameseModel`].
pub fn load_model(
    model_path: &Path,
    head_path: Option<&Path>,
) -> Result<Box<dyn SimilarityModel>, ModelError> {
    match head_path {
        Some(head) => Ok(Box::new(TwinModel::load(model_path, head)?)),
        None => Ok(Box::new(SiameseModel::load(model_path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(20.0) > 0.99);
        assert!(sigmoid(-20.0) < 0.01);
    }

    #[test]
    fn test_dense_head_apply() {
        let head = DenseHead { weights: vec![1.0, -1.0], bias: 0.0 };
        let score = head.apply(&Embedding { values: vec![2.0, 2.0] }).unwrap();
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_dense_head_zero_distance_scores_high() {
        // Trained heads learn negative weights: small distance → high similarity.
        let head = DenseHead { weights: vec![-4.0; 8], bias: 6.0 };
        let same = head.apply(&Embedding { values: vec![0.0; 8] }).unwrap();
        let far = head.apply(&Embedding { values: vec![1.0; 8] }).unwrap();
        assert!(same > 0.99);
        assert!(far < 0.01);
    }

    #[test]
    fn test_dense_head_mismatch() {
        let head = DenseHead { weights: vec![1.0; 4], bias: 0.0 };
        let err = head.apply(&Embedding { values: vec![1.0; 3] }).unwrap_err();
        assert!(matches!(err, ModelError::HeadMismatch { expected: 4, actual: 3 }));
    }

    #[test]
    fn test_dense_head_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.json");
        std::fs::write(&path, r#"{"weights": [0.5, -0.25], "bias": 0.1}"#).unwrap();

        let head = DenseHead::load(&path).unwrap();
        assert_eq!(head.weights, vec![0.5, -0.25]);
        assert!((head.bias - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_dense_head_load_rejects_empty_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.json");
        std::fs::write(&path, r#"{"weights": [], "bias": 0.0}"#).unwrap();

        assert!(matches!(DenseHead::load(&path), Err(ModelError::InvalidHead { .. })));
    }

    #[test]
    fn test_missing_model_file() {
        let err = SiameseModel::load(Path::new("/nonexistent/siamese.onnx")).err().unwrap();
        assert!(matches!(err, ModelError::ModelNotFound(_)));

        let err = load_model(Path::new("/nonexistent/encoder.onnx"), Some(Path::new("head.json")))
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::ModelNotFound(_)));
    }
}
