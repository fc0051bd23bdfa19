//! Pipeline error type
//!
//! Only fatal failures live here. Running out of attempts without an
//! acceptable candidate is a normal outcome and is never an error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The uploaded bytes are not a decodable image
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The resized image could not be re-encoded
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// The generation backend faulted
    #[error("inference failed: {0}")]
    Inference(String),

    /// Rejected by strict request validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PipelineError {
    /// Wrap any backend error, keeping its full context chain
    pub fn inference(err: impl std::fmt::Display) -> Self {
        Self::Inference(format!("{err:#}"))
    }
}
