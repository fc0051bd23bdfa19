//! Review orchestration
//!
//! normalize image -> build prompt -> retry until the dish is named -> dedupe

use crate::dedupe::dedupe;
use crate::error::{PipelineError, Result};
use crate::generation::GenerationClient;
use crate::preprocess::normalize;
use crate::prompt;
use crate::retry::{run_until_accepted, RetryOutcome};
use crate::types::{Ratings, Review, ReviewRequest, ValidationPolicy, DEFAULT_MAX_ATTEMPTS};
use std::sync::Arc;

/// Tunables for [`ReviewService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Generation calls per request before returning the fallback
    pub max_attempts: usize,
    pub validation: ValidationPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            validation: ValidationPolicy::Lenient,
        }
    }
}

/// Produces reviews using one shared generation backend
#[derive(Clone)]
pub struct ReviewService {
    client: Arc<dyn GenerationClient>,
    config: ServiceConfig,
}

impl ReviewService {
    /// Wrap an already initialized backend
    pub fn new(client: Arc<dyn GenerationClient>, config: ServiceConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.client.name()
    }

    /// Run the full pipeline for one request
    ///
    /// Running out of attempts yields [`Review::Fallback`]. Only undecodable
    /// images, backend faults and (under strict validation) bad input are
    /// errors.
    pub async fn produce_review(&self, request: &ReviewRequest) -> Result<Review> {
        tracing::info!(
            food_name = %request.food_name,
            delivery = request.ratings.delivery,
            taste = request.ratings.taste,
            quantity = request.ratings.quantity,
            price = request.ratings.price,
            image_bytes = request.image.len(),
            backend = self.client.name(),
            "Received review request"
        );

        if self.config.validation == ValidationPolicy::Strict {
            validate(request)?;
        }

        let image = normalize(&request.image)?;
        let prompt = prompt::build(&request.food_name, image);

        let outcome = run_until_accepted(
            self.client.as_ref(),
            &prompt,
            &request.food_name,
            self.config.max_attempts,
        )
        .await?;

        let attempts = outcome.attempts();
        let review = match outcome {
            RetryOutcome::Accepted { candidate, .. } => {
                Review::Generated(dedupe(candidate.as_str()))
            }
            RetryOutcome::Exhausted { .. } => Review::Fallback,
        };

        tracing::info!(
            attempts,
            fallback = review.is_fallback(),
            "Review produced"
        );
        Ok(review)
    }
}

/// Strict-mode checks, applied before any work is done
pub fn validate(request: &ReviewRequest) -> Result<()> {
    if request.food_name.trim().is_empty() {
        return Err(PipelineError::InvalidRequest(
            "food name must not be empty".to_string(),
        ));
    }
    validate_ratings(&request.ratings)
}

fn validate_ratings(ratings: &Ratings) -> Result<()> {
    for (name, value) in ratings.iter() {
        if !(1..=5).contains(&value) {
            return Err(PipelineError::InvalidRequest(format!(
                "{name} rating must be between 1 and 5, got {value}"
            )));
        }
    }
    Ok(())
}
