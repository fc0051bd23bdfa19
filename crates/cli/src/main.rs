//! foodreview CLI
//!
//! Command-line access to the review pipeline: generate a review for a
//! local photo, inspect the normalized image, or clean up text.
//!
//! Copyright (c) 2025 Michael A Wright

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_pipeline::{
    dedupe::dedupe, preprocess, Ratings, ReviewRequest, ReviewService, ServiceConfig,
    ValidationPolicy, DEFAULT_MAX_ATTEMPTS,
};
use llm_bridge::vision::DEFAULT_VISION_MODEL;
use llm_bridge::{Backend, BackendConfig, OllamaConfig, OpenAiCompatConfig};
use std::io::Read;
use std::path::{Path, PathBuf};

#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "foodreview")]
#[command(about = "Generate upbeat delivery-food reviews from a photo", long_about = None)]
#[command(version, long_version = env!("FOODREVIEW_LONG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a review for a food photo
    Review {
        /// Image file (JPEG, PNG, GIF, WebP, BMP)
        #[arg(short, long)]
        image: PathBuf,

        /// Name of the dish; the review must mention it
        #[arg(short, long)]
        food_name: String,

        /// Delivery rating
        #[arg(long, default_value_t = 5)]
        delivery: i64,

        /// Taste rating
        #[arg(long, default_value_t = 5)]
        taste: i64,

        /// Quantity rating
        #[arg(long, default_value_t = 5)]
        quantity: i64,

        /// Price rating
        #[arg(long, default_value_t = 5)]
        price: i64,

        /// Backend: ollama or openai
        #[arg(short, long, default_value = "ollama")]
        backend: String,

        /// Model server URL (defaults depend on the backend)
        #[arg(short, long)]
        url: Option<String>,

        /// Model name (defaults depend on the backend)
        #[arg(short, long)]
        model: Option<String>,

        /// Generation attempts before falling back
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        max_attempts: usize,

        /// Reject blank food names and ratings outside 1..=5
        #[arg(long)]
        strict: bool,

        /// Print {"review": ...} instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Resize an image to the model input and print it as a data URI
    Normalize {
        /// Image file
        #[arg(short, long)]
        image: PathBuf,

        /// Write the 256x256 JPEG here instead of printing the data URI
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove repeated words from text (reads stdin when no text is given)
    Dedupe {
        /// Text to clean
        text: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing on stderr so stdout stays clean for piping
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    tracing::debug!(
        version = built_info::PKG_VERSION,
        target = built_info::TARGET,
        rustc = built_info::RUSTC_VERSION,
        "foodreview starting"
    );

    let cli = Cli::parse();

    match cli.command {
        Commands::Review {
            image,
            food_name,
            delivery,
            taste,
            quantity,
            price,
            backend,
            url,
            model,
            max_attempts,
            strict,
            json,
        } => {
            let backend = backend_config(backend.parse()?, url, model);
            let client = llm_bridge::connect(&backend)?;
            let service = ReviewService::new(
                client,
                ServiceConfig {
                    max_attempts,
                    validation: if strict {
                        ValidationPolicy::Strict
                    } else {
                        ValidationPolicy::Lenient
                    },
                },
            );

            let request = ReviewRequest {
                food_name,
                ratings: Ratings {
                    delivery,
                    taste,
                    quantity,
                    price,
                },
                image: read_image(&image)?,
            };

            let review = service.produce_review(&request).await?;

            if json {
                println!("{}", serde_json::json!({ "review": review.as_str() }));
            } else {
                println!("{}", review);
            }
            Ok(())
        }
        Commands::Normalize { image, output } => {
            let raw = read_image(&image)?;
            match output {
                Some(path) => {
                    let jpeg = preprocess::normalize_to_jpeg(&raw)?;
                    std::fs::write(&path, &jpeg)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote {} ({} bytes)", path.display(), jpeg.len());
                }
                None => println!("{}", preprocess::normalize(&raw)?),
            }
            Ok(())
        }
        Commands::Dedupe { text } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            println!("{}", dedupe(&text));
            Ok(())
        }
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))
}

/// Apply `--url` and `--model` to the chosen backend's defaults
fn backend_config(backend: Backend, url: Option<String>, model: Option<String>) -> BackendConfig {
    let mut ollama = OllamaConfig::default();
    let mut openai = OpenAiCompatConfig::default();

    match backend {
        Backend::Ollama => {
            if let Some(url) = url {
                ollama.base_url = url;
            }
        }
        Backend::OpenAi => {
            if let Some(url) = url {
                openai.base_url = url;
            }
            if let Some(model) = &model {
                openai.model = model.clone();
            }
            openai.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
    }

    BackendConfig {
        backend,
        ollama,
        openai,
        ollama_model: model.unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
    }
}
