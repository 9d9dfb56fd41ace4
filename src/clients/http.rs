use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;

use super::ClientError;
use crate::config::CollaboratorConfig;
use crate::metrics::{CallOutcome, Metrics};
use crate::utils::{retry_on_transient, CircuitBreaker, CircuitBreakerError, RetryConfig};

// ============================================================================
// Shared Collaborator Transport
// ============================================================================
//
// One reqwest client per collaborator with its own timeout, retry policy and
// circuit breaker. The breaker sees one logical call (all retry attempts), so
// a single flaky request does not count several times against it.
//
// ============================================================================

pub(crate) struct CollaboratorHttp {
    name: &'static str,
    client: Client,
    base_url: String,
    retry: RetryConfig,
    breaker: CircuitBreaker,
    metrics: Arc<Metrics>,
}

impl std::fmt::Debug for CollaboratorHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaboratorHttp")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.retry.max_attempts)
            .finish()
    }
}

impl CollaboratorHttp {
    pub(crate) fn new(
        name: &'static str,
        config: &CollaboratorConfig,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::Config(format!("{name} base_url {base_url:?}: {e}")))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build {name} HTTP client: {e}")))?;

        let breaker = CircuitBreaker::new(name, (&config.circuit_breaker).into()).with_metrics(metrics.clone());

        Ok(Self {
            name,
            client,
            base_url,
            retry: (&config.retry).into(),
            breaker,
            metrics,
        })
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ClientError> {
        Url::parse(&format!("{}/{}", self.base_url, path.trim_start_matches('/')))
            .map_err(|e| ClientError::Config(format!("Failed to construct URL: {e}")))
    }

    /// GET `url` and decode the JSON body; 404 yields `Ok(None)`.
    pub(crate) async fn get_json<T>(
        &self,
        operation: &str,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        let started = Instant::now();
        let this = self;
        let url = &url;

        let result = self
            .breaker
            .call(retry_on_transient(&self.retry, operation, move |attempt| {
                if attempt > 1 {
                    this.metrics.record_retry_attempt(operation);
                }
                this.send_once::<T>(url.clone(), query)
            }))
            .await;

        let result = match result {
            Ok(body) => Ok(body),
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::warn!(collaborator = self.name, operation, "Request refused, circuit open");
                Err(ClientError::CircuitOpen {
                    collaborator: self.name.to_string(),
                })
            }
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        };

        let outcome = match &result {
            Ok(Some(_)) => CallOutcome::Success,
            Ok(None) => CallOutcome::NotFound,
            Err(e) if e.is_timeout() => CallOutcome::Timeout,
            Err(ClientError::CircuitOpen { .. }) => CallOutcome::CircuitOpen,
            Err(_) => CallOutcome::Error,
        };
        self.metrics
            .record_collaborator_call(self.name, outcome, started.elapsed().as_secs_f64());

        result
    }

    async fn send_once<T>(&self, url: Url, query: &[(&str, String)]) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(collaborator = self.name, url = %url, "Sending collaborator request");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ClientError::transport(self.name, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(collaborator = self.name, status = %status, error = %message, "Collaborator request failed");
            return Err(ClientError::api_error(status.as_u16(), message));
        }

        let body = response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::transport(self.name, e)
            } else {
                ClientError::InvalidResponse {
                    collaborator: self.name.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        Ok(Some(body))
    }
}

/// Spin up a throwaway HTTP server on an ephemeral port and return its base URL.
#[cfg(test)]
pub(crate) async fn serve<F>(routes: F) -> String
where
    F: Fn(&mut actix_web::web::ServiceConfig) + Send + Clone + 'static,
{
    use actix_web::{App, HttpServer};

    let server = HttpServer::new(move || App::new().configure(routes.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{addr}")
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str) -> CollaboratorConfig {
    use crate::config::{CircuitBreakerSettings, RetrySettings};

    CollaboratorConfig {
        base_url: base_url.to_string(),
        timeout_ms: 300,
        retry: RetrySettings {
            max_attempts: 2,
            initial_delay_ms: 5,
            max_delay_ms: 10,
            multiplier: 2.0,
        },
        circuit_breaker: CircuitBreakerSettings {
            failure_threshold: 2,
            reset_timeout_ms: 60_000,
            success_threshold: 1,
        },
    }
}
