//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the subscriber for the sidecar binary
//! - Let library components log through an injected `Dispatch`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment
//! - The library itself never installs a global subscriber

use std::future::Future;

use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing::Dispatch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Run `fut` under the injected dispatcher, or under the caller's one.
pub(crate) fn scoped<F: Future>(fut: F, dispatch: Option<&Dispatch>) -> WithDispatch<F> {
    match dispatch {
        Some(dispatch) => fut.with_subscriber(dispatch.clone()),
        None => fut.with_current_subscriber(),
    }
}

/// Install the global subscriber for the sidecar process.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config.level.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}
