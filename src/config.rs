//! Gateway configuration

use std::time::Duration;

use url::Url;

use crate::error::{GatewayError, GatewayResult};

/// Configuration for one service's upstream connection
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// RPC endpoint to dial, e.g. `http://127.0.0.1:50051`
    pub endpoint: String,

    /// Connection establishment timeout
    pub connect_timeout: Option<Duration>,

    /// Per-request timeout applied by the transport
    pub request_timeout: Option<Duration>,
}

impl GatewayConfig {
    /// Create a configuration for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Some(Duration::from_secs(5)),
            request_timeout: None,
        }
    }

    /// Set the connection establishment timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Parse and sanity-check the endpoint before dialing
    pub fn endpoint_url(&self) -> GatewayResult<Url> {
        let url = Url::parse(&self.endpoint)
            .map_err(|err| GatewayError::Dial(format!("invalid endpoint {:?}: {}", self.endpoint, err)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(GatewayError::Dial(format!(
                "unsupported endpoint scheme {:?}",
                other
            ))),
        }
    }
}
