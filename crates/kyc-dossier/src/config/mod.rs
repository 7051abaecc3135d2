use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

const DEV_AUTH_SECRET: &str = "kyc-dossier-dev-secret";
/// One minute up to one year.
const TOKEN_TTL_MINUTES: RangeInclusive<i64> = 1..=525_600;

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
    pub store: StoreConfig,
    pub registries: RegistryConfig,
    pub narrative: NarrativeConfig,
    pub auth: AuthConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let cors_origins = var_or("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let log_level = var_or("APP_LOG_LEVEL", "info");
        let log_format = LogFormat::from_str(&var_or("APP_LOG_FORMAT", "compact"))?;

        let store = StoreConfig {
            url: optional_var("STORE_URL"),
            key: optional_var("STORE_KEY"),
        };
        if store.url.is_some() && store.key.is_none() {
            return Err(ConfigError::MissingValue { key: "STORE_KEY" });
        }

        let registries = RegistryConfig {
            primary_url: var_or("REGISTRY_PRIMARY_URL", "https://brasilapi.com.br/api/cnpj/v1"),
            secondary_url: var_or("REGISTRY_SECONDARY_URL", "https://www.receitaws.com.br/v1/cnpj"),
            postal_url: var_or("POSTAL_LOOKUP_URL", "https://viacep.com.br/ws"),
            sanctions_url: var_or(
                "SANCTIONS_API_URL",
                "https://api.portaldatransparencia.gov.br/api-de-dados",
            ),
            sanctions_api_key: optional_var("SANCTIONS_API_KEY"),
        };

        let narrative = NarrativeConfig {
            api_key: optional_var("NARRATIVE_API_KEY"),
            model: var_or("NARRATIVE_MODEL", "gemini-2.5-flash"),
            api_url: var_or(
                "NARRATIVE_API_URL",
                "https://generativelanguage.googleapis.com/v1beta/models",
            ),
        };

        let secret = match optional_var("AUTH_SECRET") {
            Some(secret) => secret,
            None if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingValue { key: "AUTH_SECRET" })
            }
            None => DEV_AUTH_SECRET.to_string(),
        };
        let auth = AuthConfig {
            secret,
            algorithm: parse_algorithm(&var_or("AUTH_ALGORITHM", "HS256"))?,
            token_ttl_minutes: parse_number_within(
                "AUTH_TOKEN_TTL_MINUTES",
                "10080",
                TOKEN_TTL_MINUTES,
            )?,
        };

        let batch = BatchConfig {
            delay: Duration::from_millis(parse_number("BATCH_DELAY_MS", "2000")?),
        };

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                cors_origins,
            },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            store,
            registries,
            narrative,
            auth,
            batch,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(key, default);
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}

fn parse_number_within<T>(
    key: &'static str,
    default: &str,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd,
{
    let parsed = parse_number(key, default)?;
    if range.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(ConfigError::InvalidNumber {
            key,
            value: var_or(key, default),
        })
    }
}

fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    match Algorithm::from_str(value.trim()) {
        Ok(algorithm @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(algorithm),
        _ => Err(ConfigError::UnsupportedAlgorithm {
            value: value.to_string(),
        }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat {
                value: value.to_string(),
            }),
        }
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// PostgREST-compatible store; both unset selects the in-process store.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub primary_url: String,
    pub secondary_url: String,
    pub postal_url: String,
    pub sanctions_url: String,
    pub sanctions_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub delay: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidLogFormat { value: String },
    UnsupportedAlgorithm { value: String },
    MissingValue { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a number, got '{value}'")
            }
            ConfigError::InvalidLogFormat { value } => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json', got '{value}'")
            }
            ConfigError::UnsupportedAlgorithm { value } => {
                write!(f, "AUTH_ALGORITHM must be HS256, HS384 or HS512, got '{value}'")
            }
            ConfigError::MissingValue { key } => write!(f, "{key} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
