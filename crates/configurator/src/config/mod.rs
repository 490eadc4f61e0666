use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::engine::{EngineConfig, SolverBackend, SolverConfig};

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
    pub engine: EngineConfig,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        let mandatory_categories = var_or("APP_MANDATORY_CATEGORIES", "engine,transmission")
            .split(',')
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig {
                mandatory_categories,
                solver: solver_from_env()?,
            },
        })
    }
}

fn solver_from_env() -> Result<SolverConfig, ConfigError> {
    let raw = var_or("APP_SOLVER", "none");
    let backend = match raw.trim().to_ascii_lowercase().as_str() {
        "none" | "" => SolverBackend::None,
        "builtin" => SolverBackend::Builtin,
        "smtlib" => SolverBackend::SmtLib,
        _ => return Err(ConfigError::InvalidSolver { value: raw }),
    };

    let timeout_secs = var_or("APP_SOLVER_TIMEOUT_SECS", "5")
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidSolverTimeout)?;

    Ok(SolverConfig {
        backend,
        command: var_or("APP_SOLVER_COMMAND", "z3"),
        args: var_or("APP_SOLVER_ARGS", "-in")
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        timeout_secs,
    })
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

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSolver { value: String },
    InvalidSolverTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSolver { value } => write!(
                f,
                "APP_SOLVER must be one of none, builtin or smtlib (got '{value}')"
            ),
            ConfigError::InvalidSolverTimeout => {
                write!(f, "APP_SOLVER_TIMEOUT_SECS must be a whole number of seconds")
            }
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
