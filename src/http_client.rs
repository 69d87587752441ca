use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::ProviderError;

/// Shared HTTP client for provider calls
///
/// Each request is sent once; there is no retry layer.
#[derive(Clone)]
pub struct HttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(max_connections: usize, connect_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// POST a JSON body with bearer auth and decode the JSON answer
    pub async fn post_json<B, T>(&self, url: &str, token: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(body);

        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    /// GET with bearer auth and decode the JSON answer
    pub async fn get_json<T>(&self, url: &str, token: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        let request = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json");

        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    /// Send a request and map any failure into a `ProviderError`
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let url = response.url().clone();

                if status.is_success() {
                    tracing::debug!(status = %status, url = %url, "Request successful");
                    return Ok(response);
                }

                let error_text = response.text().await.unwrap_or_default();
                tracing::debug!(
                    status = status.as_u16(),
                    url = %url,
                    response_body = %error_text,
                    "HTTP request failed with error response"
                );

                Err(ProviderError::Http {
                    status: status.as_u16(),
                    message: error_text,
                })
            }

            Err(e) => {
                let kind = error_kind(&e);
                tracing::debug!(error_kind = kind, error = %e, "HTTP request error");

                Err(ProviderError::Request {
                    kind,
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Categorize a transport error for display
fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}
