//! Bounded-retry connection to the tracking service

use movebridge_core::{ServiceError, TrackingService, DEFAULT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Connection attempts made before giving up
pub const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Pause between failed attempts, in milliseconds
pub const RETRY_DELAY_MS: u64 = 250;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectError {
    #[error("Failed to connect to the tracking service after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ServiceError },
}

/// Where the tracking service listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl std::fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

fn default_address() -> String {
    "localhost".to_string()
}

fn default_port() -> String {
    "9512".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_connect_attempts() -> u32 {
    MAX_CONNECT_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    RETRY_DELAY_MS
}

/// Opens one session with a tracking service backend
pub trait Connector {
    type Service: TrackingService;

    fn connect(&mut self, endpoint: &ServiceEndpoint) -> Result<Self::Service, ServiceError>;
}

/// Try to open a session up to `endpoint.connect_attempts` times.
///
/// A zero attempt count is treated as one.
pub async fn connect_with_retries<C: Connector>(
    connector: &mut C,
    endpoint: &ServiceEndpoint,
) -> Result<C::Service, ConnectError> {
    let attempts = endpoint.connect_attempts.max(1);
    info!(endpoint = %endpoint, "Attempting connection with tracking service");

    let mut last = ServiceError::Error;
    for attempt in 1..=attempts {
        info!(attempt = attempt, "Attempt {}", attempt);
        match connector.connect(endpoint) {
            Ok(service) => {
                info!(endpoint = %endpoint, attempt = attempt, "Connected to tracking service");
                return Ok(service);
            }
            Err(e) => {
                warn!(attempt = attempt, error = %e, "Connection attempt failed");
                last = e;
            }
        }
        if attempt < attempts && endpoint.retry_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(endpoint.retry_delay_ms)).await;
        }
    }

    Err(ConnectError::Exhausted { attempts, last })
}

#[cfg(test)]
mod tests {
    use super::*;
    use movebridge_core::SimulatedService;

    /// Fails a fixed number of times, then connects
    struct Flaky {
        failures_left: u32,
        calls: u32,
    }

    impl Connector for Flaky {
        type Service = SimulatedService;

        fn connect(&mut self, _endpoint: &ServiceEndpoint) -> Result<SimulatedService, ServiceError> {
            self.calls += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(ServiceError::Timeout);
            }
            Ok(SimulatedService::new())
        }
    }

    fn endpoint() -> ServiceEndpoint {
        ServiceEndpoint {
            retry_delay_ms: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connects_on_last_attempt() {
        let mut connector = Flaky {
            failures_left: 4,
            calls: 0,
        };
        assert!(connect_with_retries(&mut connector, &endpoint()).await.is_ok());
        assert_eq!(connector.calls, 5);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut connector = Flaky {
            failures_left: 10,
            calls: 0,
        };
        let err = connect_with_retries(&mut connector, &endpoint()).await.unwrap_err();
        assert_eq!(
            err,
            ConnectError::Exhausted {
                attempts: MAX_CONNECT_ATTEMPTS,
                last: ServiceError::Timeout,
            }
        );
        assert_eq!(connector.calls, MAX_CONNECT_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let mut connector = Flaky {
            failures_left: 0,
            calls: 0,
        };
        let endpoint = ServiceEndpoint {
            connect_attempts: 0,
            ..endpoint()
        };
        assert!(connect_with_retries(&mut connector, &endpoint).await.is_ok());
        assert_eq!(connector.calls, 1);
    }

    #[test]
    fn test_endpoint_defaults() {
        let endpoint: ServiceEndpoint = serde_json::from_str("{}").unwrap();
        assert_eq!(endpoint.to_string(), "localhost:9512");
        assert_eq!(endpoint.timeout_ms, 5000);
        assert_eq!(endpoint.connect_attempts, 5);
    }
}
