use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEVELOPMENT_NONCE_SECRET: &str = "grant-insight-development-secret";
const DEFAULT_NONCE_LIFETIME_SECS: u64 = 86_400;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub diagnosis: DiagnosisConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let diagnosis = DiagnosisConfig::from_env(environment)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            diagnosis,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Settings for the diagnosis endpoints: token signing, error detail and grant data source.
#[derive(Debug, Clone)]
pub struct DiagnosisConfig {
    pub nonce_secret: String,
    pub nonce_lifetime_secs: u64,
    /// Exposes storage error detail in error envelopes.
    pub debug: bool,
    pub grants_csv: Option<PathBuf>,
    /// Shared secret the authenticating proxy sends alongside `x-user-id`.
    /// Without it every caller is treated as an anonymous session.
    pub trusted_proxy_secret: Option<String>,
}

impl DiagnosisConfig {
    fn from_env(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let nonce_secret = match env::var("APP_NONCE_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingNonceSecret)
            }
            _ => DEVELOPMENT_NONCE_SECRET.to_string(),
        };

        let nonce_lifetime_secs = match env::var("APP_NONCE_LIFETIME_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs >= 2)
                .ok_or(ConfigError::InvalidNonceLifetime)?,
            Err(_) => DEFAULT_NONCE_LIFETIME_SECS,
        };

        let debug = match env::var("APP_DEBUG") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidDebugFlag)?,
            Err(_) => false,
        };

        let grants_csv = env::var("APP_GRANTS_CSV")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let trusted_proxy_secret = env::var("APP_TRUSTED_PROXY_SECRET")
            .ok()
            .map(|secret| secret.trim().to_string())
            .filter(|secret| !secret.is_empty());

        Ok(Self {
            nonce_secret,
            nonce_lifetime_secs,
            debug,
            grants_csv,
            trusted_proxy_secret,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingNonceSecret,
    InvalidNonceLifetime,
    InvalidDebugFlag,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingNonceSecret => {
                write!(f, "APP_NONCE_SECRET must be set in production")
            }
            ConfigError::InvalidNonceLifetime => {
                write!(f, "APP_NONCE_LIFETIME_SECS must be an integer of at least 2")
            }
            ConfigError::InvalidDebugFlag => write!(f, "APP_DEBUG must be a boolean flag"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::MissingNonceSecret
            | ConfigError::InvalidNonceLifetime
            | ConfigError::InvalidDebugFlag => None,
        }
    }
}
