//! Evaluation engine for hierarchical product configurations.
//!
//! A configuration is a tree of selection points, each holding at most one chosen component.
//! The [`engine`] checks a configuration against its product's rules: price, logical and
//! arithmetic constraints, historical risk and missing-data warnings. [`service`] and
//! [`router`] expose it over a product source and HTTP.

pub mod config;
pub mod engine;
pub mod error;
pub mod product;
pub mod router;
pub mod service;
pub mod telemetry;

pub use config::{AppConfig, AppEnvironment, ConfigError, ServerConfig, TelemetryConfig};
pub use engine::{EngineConfig, EvaluationEngine, EvaluationInput, EvaluationResult};
pub use error::AppError;
pub use product::{ProductDefinition, ProductId};
pub use router::{evaluation_router, EvaluationRequest};
pub use service::{ConfigurationService, ConfigurationServiceError, ProductSource, SourceError};
