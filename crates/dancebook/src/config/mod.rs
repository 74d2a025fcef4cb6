use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::Duration;

use crate::workflows::attribution::AttributionConfig;

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
    pub attribution: AttributionSettings,
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

        let attribution = AttributionSettings {
            guest_delay_hours: delay_hours("APP_GUEST_DELAY_HOURS", 48)?,
            regular_delay_hours: delay_hours("APP_REGULAR_DELAY_HOURS", 72)?,
            senior_delay_hours: delay_hours("APP_SENIOR_DELAY_HOURS", 168)?,
            sweep_interval_seconds: positive_u64("APP_SWEEP_INTERVAL_SECONDS", 300)?,
        };
        attribution.validate()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            attribution,
        })
    }
}

fn delay_hours(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    let value = match env::var(var) {
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidDelay { var })?,
        Err(_) => default,
    };
    if value <= 0 {
        return Err(ConfigError::InvalidDelay { var });
    }
    Ok(value)
}

fn positive_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidDelay { var })?,
        Err(_) => default,
    };
    if value == 0 {
        return Err(ConfigError::InvalidDelay { var });
    }
    Ok(value)
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

/// Delay ladder and sweep cadence for the attribution engine.
#[derive(Debug, Clone)]
pub struct AttributionSettings {
    pub guest_delay_hours: i64,
    pub regular_delay_hours: i64,
    pub senior_delay_hours: i64,
    pub sweep_interval_seconds: u64,
}

impl AttributionSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.guest_delay_hours <= self.regular_delay_hours
            && self.regular_delay_hours <= self.senior_delay_hours
        {
            Ok(())
        } else {
            Err(ConfigError::InvalidDelayLadder)
        }
    }

    pub fn engine_config(&self) -> AttributionConfig {
        AttributionConfig {
            guest_delay: Duration::hours(self.guest_delay_hours),
            regular_delay: Duration::hours(self.regular_delay_hours),
            senior_delay: Duration::hours(self.senior_delay_hours),
            ..AttributionConfig::default()
        }
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDelay { var: &'static str },
    InvalidDelayLadder,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDelay { var } => {
                write!(f, "{var} must be a positive integer")
            }
            ConfigError::InvalidDelayLadder => write!(
                f,
                "delay ladder must satisfy guest <= regular <= senior"
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
