//! Configuration module
//!
//! Settings are resolved once at startup through a [`ParameterSource`]. The
//! default source reads process environment variables (after loading `.env`);
//! tests and alternative secret providers plug in their own source.

use std::collections::HashMap;
use std::env;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_PROJECT_NAME: &str = "CRM SaaS";
const DEFAULT_API_V1_STR: &str = "/api/v1";
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 60;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;
const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Resolves named parameters to string values.
pub trait ParameterSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads parameters from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl ParameterSource for EnvSource {
    fn get(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

/// Fixed in-memory parameters.
#[derive(Debug, Default, Clone)]
pub struct MapSource(HashMap<String, String>);

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl ParameterSource for MapSource {
    fn get(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Which key-value backend persists records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => Err(anyhow::anyhow!(
                "Unknown STORE_BACKEND '{}'. Expected 'memory' or 'postgres'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub project_name: String,
    pub api_v1_str: String,
    pub cors_origins: Vec<String>,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub identity_signing_secret: String,
    pub access_token_expire_minutes: i64,
    /// Remote key discovery. When unset, the local identity provider's keys are used.
    pub jwks_url: Option<String>,
    /// `None` refreshes keys only when a token names an unknown key id
    pub jwks_cache_ttl_seconds: Option<u64>,
    pub token_audience: Option<String>,
    pub token_issuer: Option<String>,
    pub http_concurrency_limit: usize,
    pub max_body_bytes: usize,
    pub log_format: LogFormat,
}

impl Config {
    /// Load `.env` (if present) and read settings from the environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_source(&EnvSource)
    }

    pub fn from_source(source: &dyn ParameterSource) -> Result<Self, anyhow::Error> {
        let var = |name: &str| source.get(name).filter(|v| !v.trim().is_empty());

        let server_port = var("PORT")
            .unwrap_or_else(|| DEFAULT_PORT.to_string())
            .parse()
            .unwrap_or(DEFAULT_PORT);

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let store_backend = var("STORE_BACKEND")
            .unwrap_or_else(|| "memory".to_string())
            .parse()?;

        let identity_signing_secret = var("IDENTITY_SIGNING_SECRET").ok_or_else(|| {
            anyhow::anyhow!("IDENTITY_SIGNING_SECRET environment variable is required")
        })?;

        let jwks_url = var("JWKS_URL").or_else(|| {
            match (var("AWS_REGION"), var("COGNITO_USER_POOL_ID")) {
                (Some(region), Some(pool)) => Some(format!(
                    "https://cognito-idp.{}.amazonaws.com/{}/.well-known/jwks.json",
                    region, pool
                )),
                _ => None,
            }
        });

        let log_format = match var("LOG_FORMAT").map(|f| f.to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Ok(Config {
            server_port,
            environment,
            project_name: var("PROJECT_NAME").unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            api_v1_str: var("API_V1_STR").unwrap_or_else(|| DEFAULT_API_V1_STR.to_string()),
            cors_origins,
            store_backend,
            database_url: var("DATABASE_URL"),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            identity_signing_secret,
            access_token_expire_minutes: var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(ACCESS_TOKEN_EXPIRE_MINUTES),
            jwks_url,
            jwks_cache_ttl_seconds: var("JWKS_CACHE_TTL_SECONDS").and_then(|v| v.parse().ok()),
            token_audience: var("TOKEN_AUDIENCE"),
            token_issuer: var("TOKEN_ISSUER"),
            http_concurrency_limit: var("HTTP_CONCURRENCY_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT),
            max_body_bytes: var("MAX_BODY_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_BODY_BYTES),
            log_format,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server_port == 0 {
            anyhow::bail!("PORT must be greater than 0");
        }

        if self.identity_signing_secret.len() < MIN_SIGNING_SECRET_LEN {
            anyhow::bail!(
                "IDENTITY_SIGNING_SECRET must be at least {} characters long",
                MIN_SIGNING_SECRET_LEN
            );
        }

        if self.access_token_expire_minutes <= 0 {
            anyhow::bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be greater than 0");
        }

        if !self.api_v1_str.starts_with('/') {
            anyhow::bail!("API_V1_STR must start with '/'");
        }

        if self.store_backend == StoreBackend::Postgres {
            match &self.database_url {
                None => anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres"),
                Some(url)
                    if !url.starts_with("postgres://") && !url.starts_with("postgresql://") =>
                {
                    anyhow::bail!("DATABASE_URL must be a PostgreSQL connection string")
                }
                Some(_) => {}
            }
            if self.db_max_connections == 0 {
                anyhow::bail!("DB_MAX_CONNECTIONS must be greater than 0");
            }
        }

        if let Some(url) = &self.jwks_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("JWKS_URL must be an http(s) URL");
            }
            if self.is_production() && url.starts_with("http://") {
                anyhow::bail!("JWKS_URL must use https in production");
            }
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            anyhow::bail!(
                "ALLOWED_ORIGINS cannot contain '*' in production. Set explicit origins."
            );
        }

        if self.http_concurrency_limit == 0 {
            anyhow::bail!("HTTP_CONCURRENCY_LIMIT must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("MAX_BODY_BYTES must be greater than 0");
        }

        Ok(())
    }
}
