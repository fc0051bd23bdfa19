//! Core pipeline for foodreview
//!
//! This crate turns a food photo and a dish name into a short, upbeat
//! customer review using a vision-language model. It owns image
//! normalization, prompt construction, the bounded retry loop that insists
//! the dish is named, and the repeated-word cleanup. The model itself is
//! abstracted behind [`GenerationClient`].

pub mod dedupe;
pub mod error;
pub mod generation;
pub mod preprocess;
pub mod prompt;
pub mod retry;
pub mod service;
pub mod types;

pub use error::{PipelineError, Result};
pub use generation::GenerationClient;
pub use service::{ReviewService, ServiceConfig};
pub use types::*;
