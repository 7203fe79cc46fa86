//! L1 distance between twin-network embeddings.

use crate::types::Embedding;
use ndarray::ArrayView1;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DistanceError {
    #[error("embedding shape mismatch: {left} vs {right}")]
    ShapeMismatch { left: usize, right: usize },
}

/// Element-wise absolute difference `|a - b|` of two equal-length embeddings.
pub fn l1_distance(a: &Embedding, b: &Embedding) -> Result<Embedding, DistanceError> {
    if a.len() != b.len() {
        return Err(DistanceError::ShapeMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let a = ArrayView1::from(&a.values[..]);
    let b = ArrayView1::from(&b.values[..]);
    let diff = (&a - &b).mapv(f32::abs);

    Ok(Embedding {
        values: diff.to_vec(),
    })
}
