//! HTTP transport for the delivery protocol.
//!
//! The delivery protocol implements its own bounded redirect policy, so
//! the transport never follows redirects itself. It surfaces the status
//! code and the `Location` header and leaves the decision to the caller.

use async_trait::async_trait;
use thiserror::Error;

/// Response to a single POST: status code plus the `Location` header when
/// present.
#[derive(Debug, Clone)]
pub struct PostResponse {
    pub status: u16,
    pub location: Option<String>,
}

impl PostResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn is_redirect(&self) -> bool {
        self.status == 301 || self.status == 308
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

/// Posts one JSON payload and reports status + `Location` without
/// following redirects.
#[async_trait]
pub trait HttpPoster: Send + Sync {
    async fn post_json(&self, url: &str, body: &str) -> Result<PostResponse, HttpError>;
}

/// reqwest-backed transport with redirect following disabled.
pub struct ReqwestPoster {
    client: reqwest::Client,
}

impl ReqwestPoster {
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent("ble-senml-gateway")
            .build()
            .map_err(|e| HttpError::Request {
                url: String::new(),
                source: e,
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpPoster for ReqwestPoster {
    async fn post_json(&self, url: &str, body: &str) -> Result<PostResponse, HttpError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| HttpError::Request {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Ok(PostResponse { status, location })
    }
}
