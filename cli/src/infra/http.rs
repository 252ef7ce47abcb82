//! Infrastructure implementation of the `ApiTransport` port over reqwest.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{ApiRequest, ApiResponse, ApiTransport};
use crate::domain::action::HttpMethod;
use crate::domain::error::ActionError;

/// Default request timeout for module actions.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client; one per process so connections are pooled.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stagehand/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("cannot build HTTP client")?;
        Ok(Self { client })
    }
}

fn method(m: HttpMethod) -> reqwest::Method {
    match m {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

impl ApiTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ActionError> {
        let mut builder = self.client.request(method(request.method), &request.url);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %request.url, "sending action request");
        let response = builder
            .send()
            .await
            .map_err(|e| ActionError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ActionError::Network(e.to_string()))?;
        tracing::debug!(status, "action response received");
        Ok(ApiResponse { status, body })
    }
}
