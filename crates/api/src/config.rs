//! Application configuration loaded from environment variables.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `APP_ENV`: `production` hides internal error detail (default `development`)
/// - `PUBLIC_URL`: base of links sent to users (default `http://localhost:3000`)
/// - `REGISTRATION_DEADLINE_MS`, `STEP_TIMEOUT_MS`: saga time limits
/// - `SAGA_RECOVERY_INTERVAL_MS`, `SAGA_IDLE_AFTER_MS`, `ORPHAN_GRACE_SECS`:
///   background sweep over interrupted registrations
/// - `PAYSTACK_SECRET_KEY`, `PAYSTACK_BASE_URL`
/// - `FLUTTERWAVE_SECRET_KEY`, `FLUTTERWAVE_SECRET_HASH`, `FLUTTERWAVE_BASE_URL`
/// - `PAYMENT_DEFAULT_PROVIDER`, `PAYMENT_CALLBACK_URL`
/// - `ALLOW_PROVIDER_SNIFFING`: match webhooks that name no provider by their body (default `true`)
/// - `DATABASE_URL`: PostgreSQL saga log; in-memory when unset
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub environment: Environment,
    pub public_url: String,
    pub registration_deadline: Duration,
    pub step_timeout: Duration,
    pub recovery_interval: Duration,
    pub saga_idle_after: Duration,
    pub orphan_grace: Duration,
    pub paystack_secret_key: Option<String>,
    pub paystack_base_url: Option<String>,
    pub flutterwave_secret_key: Option<String>,
    pub flutterwave_secret_hash: Option<String>,
    pub flutterwave_base_url: Option<String>,
    pub default_payment_provider: Option<String>,
    pub payment_callback_url: Option<String>,
    pub allow_provider_sniffing: bool,
    pub database_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: text("HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "PORT")?.unwrap_or(defaults.port),
            log_level: text("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match text("LOG_FORMAT").map(|v| v.to_ascii_lowercase()).as_deref() {
                None | Some("text") | Some("pretty") => LogFormat::Text,
                Some("json") => LogFormat::Json,
                Some(other) => return Err(invalid("LOG_FORMAT", other, "expected text or json")),
            },
            environment: match text("APP_ENV").map(|v| v.to_ascii_lowercase()).as_deref() {
                Some("production") | Some("prod") => Environment::Production,
                _ => Environment::Development,
            },
            public_url: text("PUBLIC_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url),
            registration_deadline: millis(&lookup, "REGISTRATION_DEADLINE_MS")?
                .unwrap_or(defaults.registration_deadline),
            step_timeout: millis(&lookup, "STEP_TIMEOUT_MS")?.unwrap_or(defaults.step_timeout),
            recovery_interval: millis(&lookup, "SAGA_RECOVERY_INTERVAL_MS")?
                .unwrap_or(defaults.recovery_interval),
            saga_idle_after: millis(&lookup, "SAGA_IDLE_AFTER_MS")?
                .unwrap_or(defaults.saga_idle_after),
            orphan_grace: parse::<u64, _>(&lookup, "ORPHAN_GRACE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.orphan_grace),
            paystack_secret_key: text("PAYSTACK_SECRET_KEY"),
            paystack_base_url: text("PAYSTACK_BASE_URL"),
            flutterwave_secret_key: text("FLUTTERWAVE_SECRET_KEY"),
            flutterwave_secret_hash: text("FLUTTERWAVE_SECRET_HASH"),
            flutterwave_base_url: text("FLUTTERWAVE_BASE_URL"),
            default_payment_provider: text("PAYMENT_DEFAULT_PROVIDER"),
            payment_callback_url: text("PAYMENT_CALLBACK_URL"),
            allow_provider_sniffing: parse(&lookup, "ALLOW_PROVIDER_SNIFFING")?
                .unwrap_or(defaults.allow_provider_sniffing),
            database_url: text("DATABASE_URL"),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            environment: Environment::Development,
            public_url: "http://localhost:3000".to_string(),
            registration_deadline: Duration::from_secs(30),
            step_timeout: Duration::from_secs(10),
            recovery_interval: Duration::from_secs(60),
            saga_idle_after: Duration::from_secs(120),
            orphan_grace: Duration::from_secs(3600),
            paystack_secret_key: None,
            paystack_base_url: None,
            flutterwave_secret_key: None,
            flutterwave_secret_hash: None,
            flutterwave_base_url: None,
            default_payment_provider: None,
            payment_callback_url: None,
            allow_provider_sniffing: true,
            database_url: None,
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| invalid(key, &raw, e)),
    }
}

fn millis<F>(lookup: &F, key: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parse::<u64, _>(lookup, key)?.map(Duration::from_millis))
}
