use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::triage::ranking::{RankingConfig, SortMode};
use crate::triage::rules::{RuleTableError, SymptomRuleTable};

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
    pub triage: TriageConfig,
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
            triage: TriageConfig::from_env()?,
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

/// Ranking bounds and optional data sources.
#[derive(Debug, Clone, Default)]
pub struct TriageConfig {
    pub ranking: RankingConfig,
    pub rules_path: Option<PathBuf>,
    pub directory_csv: Option<PathBuf>,
    pub feed_csv: Option<PathBuf>,
}

impl TriageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = RankingConfig::default();

        let top_n = match env::var("TRIAGE_TOP_N") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value >= 1 => value,
                _ => return Err(ConfigError::InvalidTopN),
            },
            Err(_) => defaults.top_n,
        };

        let backup_pool_size = match env::var("TRIAGE_BACKUP_POOL_SIZE") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidBackupPoolSize)?,
            Err(_) => defaults.backup_pool_size,
        };

        let sort_mode = match env::var("TRIAGE_SORT_MODE") {
            Ok(raw) => SortMode::parse(&raw).ok_or(ConfigError::InvalidSortMode(raw))?,
            Err(_) => defaults.sort_mode,
        };

        Ok(Self {
            ranking: RankingConfig {
                top_n,
                backup_pool_size,
                sort_mode,
            },
            rules_path: path_var("TRIAGE_RULES_PATH"),
            directory_csv: path_var("TRIAGE_DIRECTORY_CSV"),
            feed_csv: path_var("TRIAGE_FEED_CSV"),
        })
    }

    /// The configured rule table, or the reference table when none is set.
    pub fn load_rules(&self) -> Result<SymptomRuleTable, RuleTableError> {
        match &self.rules_path {
            Some(path) => SymptomRuleTable::from_path(path),
            None => Ok(SymptomRuleTable::standard()),
        }
    }
}

fn path_var(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTopN,
    InvalidBackupPoolSize,
    InvalidSortMode(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTopN => write!(f, "TRIAGE_TOP_N must be an integer >= 1"),
            ConfigError::InvalidBackupPoolSize => {
                write!(f, "TRIAGE_BACKUP_POOL_SIZE must be a non-negative integer")
            }
            ConfigError::InvalidSortMode(value) => write!(
                f,
                "TRIAGE_SORT_MODE '{value}' is not one of suitability, proximity"
            ),
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
