//! HTTP client wrapper for JSON POSTs to the processing service.
//!
//! Requests are sent once. A failed request fails the analysis run that made
//! it; nothing is retried.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};

/// Longest slice of an error body kept in [`CloudError::Status`]
const ERROR_BODY_LIMIT: usize = 500;

/// HTTP client for JSON endpoints.
pub struct HttpClient {
    client: Client,
    request_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// POST `body` as JSON and return the response body.
    ///
    /// Returns `Ok(None)` on HTTP 404, which the service uses for "no data
    /// for this request". Any other non-success status is an error.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        auth: &dyn CloudAuth,
    ) -> Result<Option<String>> {
        let mut auth_headers = Vec::new();
        auth.sign_request(url, "POST", &mut auth_headers)?;

        let mut req = self.client.post(url).json(body);
        for (key, value) in &auth_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        tracing::debug!(url, "POST");
        let resp = req
            .send()
            .await
            .map_err(|e| CloudError::Network(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CloudError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let text = resp
            .text()
            .await
            .map_err(|e| CloudError::Network(format!("reading response body: {e}")))?;
        Ok(Some(text))
    }

    /// Getter for the timeout duration.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
