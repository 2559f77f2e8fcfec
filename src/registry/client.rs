//! HTTP client for registry requests
//!
//! Wraps `reqwest` with a timeout, a User-Agent and exponential backoff.
//! Timeouts, transport errors, 429s and undecodable bodies are retried;
//! 404 and other HTTP errors are returned immediately.

use crate::error::RegistryError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("depsync/", env!("CARGO_PKG_VERSION"));

const MAX_RETRIES: u32 = 3;

/// First backoff delay in milliseconds, doubled on every retry
const BASE_DELAY_MS: u64 = 100;

/// Outcome of a single attempt
enum Attempt<T> {
    Done(Result<T, RegistryError>),
    Retry(RegistryError),
}

/// HTTP client with retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RegistryError::network_error("", "HTTP client", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// GET `url` and decode the body as JSON, retrying transient failures
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<T, RegistryError> {
        let mut delay = BASE_DELAY_MS;
        let mut attempt = 0;

        loop {
            let error = match self.attempt(url, package, registry).await {
                Attempt::Done(result) => return result,
                Attempt::Retry(error) => error,
            };
            if attempt >= self.max_retries {
                return Err(error);
            }
            attempt += 1;
            debug!(package, attempt, delay_ms = delay, "retrying: {}", error);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            delay *= 2;
        }
    }

    async fn attempt<T: DeserializeOwned>(&self, url: &str, package: &str, registry: &str) -> Attempt<T> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Attempt::Retry(RegistryError::timeout(package, registry)),
            Err(e) => return Attempt::Retry(RegistryError::network_error(package, registry, e.to_string())),
        };

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Attempt::Retry(RegistryError::rate_limit_exceeded(registry)),
            StatusCode::NOT_FOUND => Attempt::Done(Err(RegistryError::package_not_found(package, registry))),
            status if !status.is_success() => Attempt::Done(Err(RegistryError::network_error(
                package,
                registry,
                format!("HTTP {}", status),
            ))),
            _ => match response.json::<T>().await {
                Ok(parsed) => Attempt::Done(Ok(parsed)),
                Err(e) => Attempt::Retry(RegistryError::InvalidResponse {
                    package: package.to_string(),
                    registry: registry.to_string(),
                    message: format!("failed to parse JSON: {}", e),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_new() {
        let client = HttpClient::new().unwrap();
        assert_eq!(client.max_retries(), MAX_RETRIES);
    }

    #[test]
    fn test_http_client_with_max_retries() {
        let client = HttpClient::new().unwrap().with_max_retries(0);
        assert_eq!(client.max_retries(), 0);
    }

    #[test]
    fn test_user_agent() {
        assert!(DEFAULT_USER_AGENT.starts_with("depsync/"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Port 9 (discard) on localhost is closed on test machines
        let client = HttpClient::with_config(Duration::from_secs(2), DEFAULT_USER_AGENT)
            .unwrap()
            .with_max_retries(0);
        let err = client
            .get_json::<serde_json::Value>("http://127.0.0.1:9/react", "react", "npm")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::NetworkError { .. } | RegistryError::Timeout { .. }
        ));
    }
}
