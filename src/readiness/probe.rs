//! Readiness probe definitions.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use thiserror::Error;

use crate::BoxError;

/// A single readiness check.
#[async_trait]
pub trait ProbeCheck: Send + Sync {
    async fn check(&self) -> Result<(), BoxError>;
}

/// Why one probe attempt failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0}")]
    Failed(BoxError),

    #[error("probe panicked: {0}")]
    Panicked(String),
}

/// A named probe. Cloning shares the underlying check.
#[derive(Clone)]
pub struct Probe {
    name: Arc<str>,
    check: Arc<dyn ProbeCheck>,
}

impl Probe {
    pub fn new(name: impl Into<String>, check: impl ProbeCheck + 'static) -> Self {
        Self {
            name: Arc::from(name.into()),
            check: Arc::new(check),
        }
    }

    /// Probe from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::new(name, FnCheck(f))
    }

    /// Probe from a blocking closure, run on Tokio's blocking pool.
    pub fn blocking<F, E>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::new(name, BlockingCheck(Arc::new(f)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Run the check once; panics become [`ProbeError::Panicked`].
    pub async fn attempt(&self) -> Result<(), ProbeError> {
        match AssertUnwindSafe(self.check.check()).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Failed(e)),
            Err(payload) => Err(ProbeError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe").field("name", &self.name).finish()
    }
}

struct FnCheck<F>(F);

#[async_trait]
impl<F, Fut> ProbeCheck for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    async fn check(&self) -> Result<(), BoxError> {
        (self.0)().await
    }
}

struct BlockingCheck<F>(Arc<F>);

#[async_trait]
impl<F, E> ProbeCheck for BlockingCheck<F>
where
    F: Fn() -> Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError> + 'static,
{
    async fn check(&self) -> Result<(), BoxError> {
        let f = self.0.clone();
        match tokio::task::spawn_blocking(move || f().map_err(Into::into)).await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => Err(ProbeError::Panicked(panic_message(
                join_error.into_panic().as_ref(),
            ))
            .into()),
            Err(join_error) => Err(join_error.into()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
