//! HTTP routes and handlers

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use core_pipeline::{PipelineError, Ratings, ReviewRequest, ReviewService};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

/// Largest accepted image upload
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Whole-body limit: the image plus room for the text fields
const MAX_BODY_SIZE: usize = MAX_IMAGE_SIZE + 64 * 1024;

pub struct AppState {
    service: ReviewService,
    /// Bounds how many pipelines share the model at once
    permits: Semaphore,
}

impl AppState {
    pub fn new(service: ReviewService, max_concurrent_reviews: usize) -> Self {
        Self {
            service,
            permits: Semaphore::new(max_concurrent_reviews),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/generate-review/", post(generate_review))
        .route("/review", post(generate_review))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn generate_review(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ReviewResponse>, ApiError> {
    let request = read_review_form(multipart).await?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("review", %request_id);

    async move {
        let _permit = state
            .permits
            .acquire()
            .await
            .map_err(|_| ApiError::Unavailable)?;

        let review = state.service.produce_review(&request).await.map_err(|e| {
            tracing::error!("Review generation failed: {}", e);
            ApiError::from(e)
        })?;

        Ok::<_, ApiError>(Json(ReviewResponse {
            review: review.to_string(),
        }))
    }
    .instrument(span)
    .await
}

/// Collect the review fields from a multipart form
///
/// Accepts both `food_name`/`delivery`/... and the mobile client's
/// `foodName`/`deliveryRating`/... field names. Unknown fields are ignored.
async fn read_review_form(mut multipart: Multipart) -> Result<ReviewRequest, ApiError> {
    let mut food_name: Option<String> = None;
    let mut delivery: Option<i64> = None;
    let mut taste: Option<i64> = None;
    let mut quantity: Option<i64> = None;
    let mut price: Option<i64> = None;
    let mut image: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "food_name" | "foodName" => food_name = Some(field.text().await?),
            "delivery" | "deliveryRating" => {
                delivery = Some(parse_rating(&name, field.text().await?)?);
            }
            "taste" | "tasteRating" => {
                taste = Some(parse_rating(&name, field.text().await?)?);
            }
            "quantity" | "quantityRating" => {
                quantity = Some(parse_rating(&name, field.text().await?)?);
            }
            "price" | "priceRating" => {
                price = Some(parse_rating(&name, field.text().await?)?);
            }
            "image" => {
                let data = field.bytes().await?;
                if data.len() > MAX_IMAGE_SIZE {
                    return Err(ApiError::image_too_large());
                }
                image = Some(data.to_vec());
            }
            _ => {}
        }
    }

    Ok(ReviewRequest {
        food_name: required(food_name, "food_name")?,
        ratings: Ratings {
            delivery: required(delivery, "delivery")?,
            taste: required(taste, "taste")?,
            quantity: required(quantity, "quantity")?,
            price: required(price, "price")?,
        },
        image: required(image, "image")?,
    })
}

fn parse_rating(name: &str, raw: String) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{name} must be an integer, got {raw:?}")))
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("Missing {name} field")))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ReviewResponse {
    review: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Multipart(MultipartError),
    Pipeline(PipelineError),
    Unavailable,
}

impl ApiError {
    fn image_too_large() -> Self {
        ApiError::BadRequest(format!(
            "Image too large. Max size is {} bytes",
            MAX_IMAGE_SIZE
        ))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        // The body limit trips before the per-field check for big uploads
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::image_too_large()
        } else {
            ApiError::Multipart(err)
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Multipart(err) => (err.status(), err.body_text()),
            ApiError::Pipeline(PipelineError::InvalidRequest(message)) => {
                (StatusCode::BAD_REQUEST, message)
            }
            ApiError::Pipeline(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server is shutting down".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
