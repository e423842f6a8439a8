//! Concrete [`Transport`] over `reqwest`, with bounded timeout and retry
//! with exponential backoff on transient failures.

use async_trait::async_trait;
use coe_adapters::{RequestInit, Transport, TransportError, TransportResponse};
use std::time::Duration;

pub struct HttpTransport {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpTransport {
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_retries: 2,
        })
    }

    fn is_retryable(status: u16) -> bool {
        status >= 500
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, url: &str, init: RequestInit) -> Result<TransportResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            tracing::debug!(url = coe_redaction::redact(url).as_str(), attempt, "issuing request");
            let mut builder = match init.method.as_str() {
                "GET" => self.client.get(url),
                other => self.client.request(
                    other.parse().map_err(|_| TransportError(format!("invalid method {other}")))?,
                    url,
                ),
            };
            for (name, value) in &init.headers {
                builder = builder.header(name, value);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if Self::is_retryable(status) && attempt < self.max_retries {
                        tracing::warn!(status, attempt, "retrying after server error");
                        attempt += 1;
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    let body = response
                        .text()
                        .await
                        .map_err(|e| TransportError(coe_redaction::redact(&e.to_string())))?;
                    return Ok(TransportResponse { status, body });
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tracing::warn!(error = %e, attempt, "retrying after transport error");
                        attempt += 1;
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(TransportError(coe_redaction::redact(&e.to_string())));
                }
            }
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        assert!(backoff(2) > backoff(1));
        assert!(backoff(1) > backoff(0));
    }

    #[tokio::test]
    async fn transport_reports_connection_errors() {
        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        let result = transport.call("http://127.0.0.1:1", RequestInit::get()).await;
        assert!(result.is_err());
    }
}
