use std::env;
use std::str::FromStr;

use crate::error::{PlatewiseError, Result};

/// Application configuration loaded from environment variables.
/// Secrets are required; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    // Summarizer
    pub gemini_api_key: String,
    pub gemini_model: String,

    // Review source
    pub apify_api_token: String,
    pub lookup_max_reviews: u32,
    pub search_max_places: u32,
    pub search_max_reviews: u32,
    pub scrape_language: String,

    // HTTP
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            gemini_api_key: required_env("GEMINI_API_KEY")?,
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            apify_api_token: required_env("APIFY_API_TOKEN")?,
            lookup_max_reviews: parsed_env("LOOKUP_MAX_REVIEWS", 25)?,
            search_max_places: parsed_env("SEARCH_MAX_PLACES", 15)?,
            search_max_reviews: parsed_env("SEARCH_MAX_REVIEWS", 20)?,
            scrape_language: env::var("SCRAPE_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
            allowed_origins: split_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            match val.get(..n) {
                Some(head) if !val.is_empty() => format!("{}...({} chars)", head, val.len()),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  GEMINI_API_KEY: {}", preview(&self.gemini_api_key));
        tracing::info!("  GEMINI_MODEL: {}", self.gemini_model);
        tracing::info!("  APIFY_API_TOKEN: {}", preview(&self.apify_api_token));
        tracing::info!(
            "  scrape limits: lookup_reviews={} search_places={} search_reviews={} language={}",
            self.lookup_max_reviews,
            self.search_max_places,
            self.search_max_reviews,
            self.scrape_language
        );
        if self.allowed_origins.is_empty() {
            tracing::info!("  ALLOWED_ORIGINS: <any>");
        } else {
            tracing::info!("  ALLOWED_ORIGINS: {}", self.allowed_origins.join(", "));
        }
    }
}

fn required_env(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PlatewiseError::Config(format!(
            "{key} environment variable is required"
        ))),
    }
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| PlatewiseError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
