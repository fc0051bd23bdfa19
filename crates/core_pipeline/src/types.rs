//! Core types for the review pipeline
//!
//! Request, prompt, candidate and review types shared by the pipeline
//! stages, the model backends and the HTTP server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side length, in pixels, of the square image sent to the model
pub const NORMALIZED_SIZE: u32 = 256;

/// Number of generation attempts before falling back
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Returned when no attempt produced an acceptable candidate
pub const FALLBACK_REVIEW: &str = "음식에 대한 리뷰를 생성할 수 없습니다.";

/// Media type every normalized image is re-encoded to
pub const NORMALIZED_MEDIA_TYPE: &str = "image/jpeg";

/// The four star ratings a customer gives an order.
///
/// Ratings are required inputs but the pipeline only logs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    pub delivery: i64,
    pub taste: i64,
    pub quantity: i64,
    pub price: i64,
}

impl Ratings {
    /// Iterate `(name, value)` pairs in a fixed order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, i64)> {
        [
            ("delivery", self.delivery),
            ("taste", self.taste),
            ("quantity", self.quantity),
            ("price", self.price),
        ]
        .into_iter()
    }
}

/// One review request: what was ordered, how it was rated, and a photo of it
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    /// Name of the dish; generated reviews must mention it verbatim
    pub food_name: String,
    pub ratings: Ratings,
    /// Raw image bytes in any decodable container format
    pub image: Vec<u8>,
}

/// How strictly a [`ReviewRequest`] is checked before any inference runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Accept every request as-is (an empty food name accepts any output)
    #[default]
    Lenient,
    /// Reject blank food names and ratings outside 1..=5
    Strict,
}

/// A text-safe image reference: `data:<media type>;base64,<payload>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageDataUri(String);

impl ImageDataUri {
    /// Build a data URI from a media type and an already base64-encoded payload
    pub fn new(media_type: &str, base64_payload: &str) -> Self {
        Self(format!("data:{media_type};base64,{base64_payload}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The media type between `data:` and `;base64`
    pub fn media_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(media, _)| media)
            .unwrap_or_default()
    }

    /// The base64 payload without the `data:...;base64,` header
    pub fn base64_payload(&self) -> &str {
        self.0
            .split_once(',')
            .map(|(_, payload)| payload)
            .unwrap_or_default()
    }
}

impl fmt::Display for ImageDataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One part of a multimodal message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Image { image: ImageDataUri },
    Text { text: String },
}

/// A chat message made of ordered content parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// The complete multimodal prompt for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub messages: Vec<PromptMessage>,
}

impl Prompt {
    /// First image referenced anywhere in the prompt
    pub fn image(&self) -> Option<&ImageDataUri> {
        self.parts().find_map(|part| match part {
            ContentPart::Image { image } => Some(image),
            ContentPart::Text { .. } => None,
        })
    }

    /// All text parts joined with newlines
    pub fn text(&self) -> String {
        self.parts()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn parts(&self) -> impl Iterator<Item = &ContentPart> {
        self.messages.iter().flat_map(|m| m.content.iter())
    }
}

/// One untrusted model output from a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate(pub String);

impl Candidate {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Literal substring test; an empty needle always matches
    pub fn mentions(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Fixed sampling parameters for every generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 128,
            temperature: 0.7,
        }
    }
}

/// Final pipeline output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Review {
    /// A deduplicated candidate that mentioned the food
    Generated(String),
    /// No attempt mentioned the food
    Fallback,
}

impl Review {
    pub fn as_str(&self) -> &str {
        match self {
            Review::Generated(text) => text,
            Review::Fallback => FALLBACK_REVIEW,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Review::Fallback)
    }
}

impl fmt::Display for Review {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
