//! HTTP GET probe.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::readiness::ProbeCheck;
use crate::BoxError;

/// Ready when `GET url` answers with a 2xx status within `timeout`.
#[derive(Clone)]
pub struct HttpProbe {
    url: String,
    timeout: Duration,
    client: Client<HttpConnector, Body>,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            url: url.into(),
            timeout,
            client,
        }
    }
}

#[async_trait]
impl ProbeCheck for HttpProbe {
    async fn check(&self) -> Result<(), BoxError> {
        let request = Request::builder()
            .method("GET")
            .uri(&self.url)
            .header("user-agent", "healthz-readiness-probe")
            .body(Body::empty())?;

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(format!("GET {} returned {}", self.url, response.status()).into()),
            Ok(Err(e)) => Err(format!("GET {} failed: {}", self.url, e).into()),
            Err(_) => Err(format!("GET {} timed out after {:?}", self.url, self.timeout).into()),
        }
    }
}
