//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SidecarConfig (validated, immutable)
//!     → sections handed to the evaluators and servers at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; evaluators are built once per process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    GrpcConfig, HealthConfig, HttpConfig, LogFormat, LoggingConfig, ProbeConfig, ReadinessConfig,
    SidecarConfig,
};
pub use validation::ValidationError;
