use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub assistant: AssistantConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assistant: AssistantConfig::from_env()?,
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

/// Catalog, vocabulary, ledger and reply backend settings.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// JSON or CSV listings file; the built-in sample catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    pub starting_balance: u32,
    pub max_listings: usize,
    pub locations: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub rules_path: Option<PathBuf>,
    /// Present only when an API key is configured.
    pub gemini: Option<GeminiConfig>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            starting_balance: 20,
            max_listings: 3,
            locations: None,
            features: None,
            rules_path: None,
            gemini: None,
        }
    }
}

impl AssistantConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let gemini = match non_empty_var("GOOGLE_GEMINI_API_KEY") {
            Some(api_key) => Some(GeminiConfig {
                api_key,
                model: non_empty_var("GEMINI_MODEL")
                    .unwrap_or_else(|| GeminiConfig::DEFAULT_MODEL.to_string()),
                base_url: non_empty_var("GEMINI_BASE_URL")
                    .unwrap_or_else(|| GeminiConfig::DEFAULT_BASE_URL.to_string()),
                timeout_secs: parse_var("GEMINI_TIMEOUT_SECS", GeminiConfig::DEFAULT_TIMEOUT_SECS)?,
            }),
            None => None,
        };

        Ok(Self {
            catalog_path: non_empty_var("ASSISTANT_CATALOG_PATH").map(PathBuf::from),
            starting_balance: parse_var("ASSISTANT_STARTING_BALANCE", defaults.starting_balance)?,
            max_listings: parse_var("ASSISTANT_MAX_LISTINGS", defaults.max_listings)?,
            locations: non_empty_var("ASSISTANT_LOCATIONS").map(|value| split_list(&value)),
            features: non_empty_var("ASSISTANT_FEATURES").map(|value| split_list(&value)),
            rules_path: non_empty_var("ASSISTANT_RULES_PATH").map(PathBuf::from),
            gemini,
        })
    }
}

/// Connection settings for the Gemini `generateContent` API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-flash";
    pub const DEFAULT_BASE_URL: &'static str =
        "https://generativelanguage.googleapis.com/v1beta/models";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { variable: name, value }),
        None => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a non-negative integer, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
