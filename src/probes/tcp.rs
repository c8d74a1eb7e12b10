//! TCP connect probe.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time;

use crate::readiness::ProbeCheck;
use crate::BoxError;

/// Ready when a TCP connection to `address` opens within `timeout`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ProbeCheck for TcpProbe {
    async fn check(&self) -> Result<(), BoxError> {
        match time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(format!("connect to {} failed: {}", self.address, e).into()),
            Err(_) => Err(format!("connect to {} timed out after {:?}", self.address, self.timeout).into()),
        }
    }
}
