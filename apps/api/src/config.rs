use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openrouter_api_key: String,
    /// Model used when an order does not specify one.
    pub default_model: String,
    /// Where finished PDFs/DOCX files are placed for pickup.
    pub artifacts_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://scribo.db".to_string()),
            openrouter_api_key: require_env("OPENROUTER_API_KEY")?,
            default_model: std::env::var("DEFAULT_MODEL")
                .unwrap_or_else(|_| "google/gemini-2.5-flash-lite".to_string()),
            artifacts_dir: PathBuf::from(
                std::env::var("ARTIFACTS_DIR").unwrap_or_else(|_| "artifacts".to_string()),
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
