use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::pipeline::CoordinatorSettings;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// JSON template to load instead of the bundled Harvard default.
    pub template_path: Option<PathBuf>,
    pub ats_target_years: f32,
    pub rewrite_timeout: Duration,
    pub cache_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let ats_target_years: f32 = parse_env("ATS_TARGET_YEARS", 5.0)?;
        if !(ats_target_years.is_finite() && ats_target_years > 0.0) {
            anyhow::bail!("ATS_TARGET_YEARS must be a positive number, got {ats_target_years}");
        }

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            template_path: std::env::var("TEMPLATE_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            ats_target_years,
            rewrite_timeout: Duration::from_millis(parse_env("REWRITE_TIMEOUT_MS", 20_000)?),
            cache_capacity: parse_env("CACHE_CAPACITY", 256)?,
        })
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            rewrite_timeout: self.rewrite_timeout,
            target_years: self.ats_target_years,
            cache_capacity: self.cache_capacity,
            as_of: None,
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}
