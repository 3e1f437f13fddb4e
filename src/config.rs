use serde::Deserialize;
use std::time::Duration;

use crate::models::ProfileDefaults;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub decision_engine_url: String,
    /// Deadline for the decision engine call. `None` waits indefinitely.
    pub decision_engine_timeout: Option<Duration>,
    pub profile_defaults_path: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            decision_engine_url: std::env::var("DECISION_ENGINE_URL")
                .map_err(|_| anyhow::anyhow!("DECISION_ENGINE_URL environment variable required"))
                .and_then(|url| validate_engine_url(&url).map(|_| url))?,
            decision_engine_timeout: std::env::var("DECISION_ENGINE_TIMEOUT_SECS")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|secs| {
                    secs.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                        anyhow::anyhow!("DECISION_ENGINE_TIMEOUT_SECS must be a whole number")
                    })
                })
                .transpose()?,
            profile_defaults_path: std::env::var("PROFILE_DEFAULTS_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            database_url_prefix(&config.database_url)
        );
        tracing::debug!("Decision engine URL: {}", config.decision_engine_url);
        match config.decision_engine_timeout {
            Some(timeout) => tracing::debug!("Decision engine timeout: {:?}", timeout),
            None => tracing::debug!("Decision engine timeout: none"),
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Loads the profile defaults once, from `PROFILE_DEFAULTS_PATH` when set.
    pub fn load_profile_defaults(&self) -> anyhow::Result<ProfileDefaults> {
        match &self.profile_defaults_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("Failed to read profile defaults from {}: {}", path, e)
                })?;
                let defaults: ProfileDefaults = serde_json::from_str(&raw).map_err(|e| {
                    anyhow::anyhow!("Invalid profile defaults in {}: {}", path, e)
                })?;
                tracing::info!("Profile defaults loaded from {}", path);
                Ok(defaults)
            }
            None => Ok(ProfileDefaults::default()),
        }
    }
}

// First 20 characters, never split inside a multi-byte character
fn database_url_prefix(url: &str) -> String {
    url.chars().take(20).collect()
}

fn validate_engine_url(raw: &str) -> anyhow::Result<()> {
    if raw.trim().is_empty() {
        anyhow::bail!("DECISION_ENGINE_URL cannot be empty");
    }
    let parsed = url::Url::parse(raw)
        .map_err(|e| anyhow::anyhow!("DECISION_ENGINE_URL is not a valid URL: {}", e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("DECISION_ENGINE_URL must start with http:// or https://");
    }
    Ok(())
}
