use crate::error::{self, CommonRequestError};
use futures_util::{StreamExt, stream::BoxStream};
use reqwest::{RequestBuilder as ReqwestRequestBuilder, Response};
use serde::Serialize;
use std::collections::HashMap;

/// Body of a streaming response, chunk by chunk as it comes off the wire
pub type ByteStream = BoxStream<'static, Result<bytes::Bytes, CommonRequestError>>;

/// A JSON `POST` endpoint relative to the configured base URL
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub path: String,
    pub extra_headers: Option<HashMap<String, String>>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extra_headers: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers = self.extra_headers.unwrap_or_default();
        headers.insert(key.into(), value.into());
        self.extra_headers = Some(headers);
        self
    }
}

/// Configuration for request building
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub base_url: String,
    pub user_agent: Option<String>,
}

impl RequestConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: None,
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Generic request builder that handles common HTTP patterns
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    client: reqwest::Client,
    config: RequestConfig,
}

impl RequestBuilder {
    pub fn new(client: reqwest::Client, config: RequestConfig) -> Self {
        Self { client, config }
    }

    /// Full URL for an endpoint path, tolerant of stray slashes on either side
    pub fn url_for(&self, endpoint: &Endpoint) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.path.trim_start_matches('/')
        )
    }

    /// Build a reqwest `RequestBuilder` for the given endpoint
    pub fn build_request(&self, endpoint: &Endpoint) -> ReqwestRequestBuilder {
        let url = self.url_for(endpoint);
        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json");

        if let Some(ref headers) = endpoint.extra_headers {
            for (key, value) in headers {
                req = req.header(key, value);
            }
        }

        if let Some(ref user_agent) = self.config.user_agent {
            req = req.header("user-agent", user_agent);
        }

        req
    }

    /// Send a JSON body and hand back the response body as a byte stream.
    ///
    /// Resolves once the status line and headers have arrived. A non-success status is
    /// turned into [`CommonRequestError::Status`] without yielding any body chunk, so the
    /// caller can tell a rejected request apart from a failure in the middle of a stream.
    pub async fn open_stream<B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: &B,
    ) -> Result<ByteStream, CommonRequestError> {
        let payload = serde_json::to_value(body)?;
        if !payload.is_object() {
            return Err(CommonRequestError::RequestBuilder(format!(
                "Streaming body must be a JSON object, got {payload}"
            )));
        }

        log::debug!("POST {} (streaming)", self.url_for(endpoint));

        let response = self
            .build_request(endpoint)
            .json(&payload)
            .send()
            .await?;

        let response = Self::check_status(response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(CommonRequestError::from))
            .boxed())
    }

    /// Pass a successful response through, or read its body into a status error
    async fn check_status(res: Response) -> Result<Response, CommonRequestError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let bytes = res.bytes().await?;
        Err(error::parse_error_response(status, &bytes))
    }
}
