//! faceid-core — Twin-network face verification engine.
//!
//! Preprocesses probe and gallery images, scores each pair with a
//! Siamese similarity model via ONNX Runtime, and thresholds the scores
//! into a verified/unverified decision.

pub mod distance;
pub mod gallery;
pub mod model;
pub mod preprocess;
pub mod types;
pub mod verify;

pub use distance::l1_distance;
pub use gallery::Gallery;
pub use model::{load_model, SiameseModel, SimilarityModel, TwinModel};
pub use preprocess::PreprocessedImage;
pub use types::{Embedding, Thresholds, VerificationResult, VerificationStatus};
pub use verify::{decide, Verifier, VerifyError};
