//! Build script for foodreview CLI
//!
//! Writes `built.rs` for the startup log line and a one-line long version
//! string for `foodreview --version`.

use std::env;

fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");

    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string());
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let built_at = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC");

    println!(
        "cargo:rustc-env=FOODREVIEW_LONG_VERSION={} ({} {}, built {})",
        version, target, profile, built_at
    );
}
