use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Where session records live between the two halves of a confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionBackend {
    Memory { ttl_secs: u64 },
    Redis { url: String, ttl_secs: u64 },
}

/// Credentials and endpoints for the S3 + Postgres artifact backend.
#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub database_url: String,
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Where generated LaTeX artifacts are written.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactBackend {
    Memory,
    S3(S3Settings),
    /// No artifact service. Saves fail with `ArtifactError::NotConfigured`.
    Disabled,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub template_path: PathBuf,
    pub sessions: SessionBackend,
    pub artifacts: ArtifactBackend,
}

const DEFAULT_TEMPLATE_PATH: &str = "templates/resume.tex";
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            template_path: std::env::var("TEMPLATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_TEMPLATE_PATH)),
            sessions: session_backend_from_env()?,
            artifacts: artifact_backend_from_env()?,
        })
    }
}

fn session_backend_from_env() -> Result<SessionBackend> {
    let kind = std::env::var("SESSION_BACKEND").unwrap_or_else(|_| "memory".to_string());
    let ttl_secs = parse_ttl(std::env::var("SESSION_TTL_SECS").ok().as_deref())?;
    match kind.to_ascii_lowercase().as_str() {
        "memory" => Ok(SessionBackend::Memory { ttl_secs }),
        "redis" => Ok(SessionBackend::Redis {
            url: require_env("REDIS_URL")?,
            ttl_secs,
        }),
        other => bail!("SESSION_BACKEND must be 'memory' or 'redis', got '{other}'"),
    }
}

fn artifact_backend_from_env() -> Result<ArtifactBackend> {
    let kind = std::env::var("ARTIFACT_BACKEND").unwrap_or_else(|_| "memory".to_string());
    match kind.to_ascii_lowercase().as_str() {
        "memory" => Ok(ArtifactBackend::Memory),
        "none" => Ok(ArtifactBackend::Disabled),
        "s3" => Ok(ArtifactBackend::S3(S3Settings {
            database_url: require_env("DATABASE_URL")?,
            bucket: require_env("S3_BUCKET")?,
            endpoint: require_env("S3_ENDPOINT")?,
            access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
        })),
        other => bail!("ARTIFACT_BACKEND must be 'memory', 's3' or 'none', got '{other}'"),
    }
}

fn parse_ttl(raw: Option<&str>) -> Result<u64> {
    match raw {
        None => Ok(DEFAULT_SESSION_TTL_SECS),
        Some(value) => {
            let ttl = value
                .trim()
                .parse::<u64>()
                .context("SESSION_TTL_SECS must be a whole number of seconds")?;
            if ttl == 0 {
                bail!("SESSION_TTL_SECS must be greater than zero");
            }
            Ok(ttl)
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
