use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{PortalError, Result};

/// Request seam between the portal views and the backend.
///
/// `endpoint` is relative to the API base unless it is an absolute
/// `http(s)://` URL.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn get(&self, endpoint: &str, bearer: Option<&str>) -> Result<Value>;

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value>;
}

pub type SharedTransport = Arc<dyn Transport>;

/// GET `endpoint` and decode the body into `T`.
pub async fn fetch_data<T: DeserializeOwned>(transport: &dyn Transport, endpoint: &str) -> Result<T> {
    let value = transport.get(endpoint, None).await?;
    Ok(serde_json::from_value(value)?)
}

/// POST `body` as JSON to `endpoint`, returning whatever the server answered.
pub async fn post_data<B: Serialize>(
    transport: &dyn Transport,
    endpoint: &str,
    body: &B,
) -> Result<Value> {
    let body = serde_json::to_value(body)?;
    transport.post(endpoint, body).await
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
        }
    }

    async fn read_json(response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortalError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn get(&self, endpoint: &str, bearer: Option<&str>) -> Result<Value> {
        let url = self.url(endpoint);
        log::debug!("GET {}", url);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        Self::read_json(response).await
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        let url = self.url(endpoint);
        log::debug!("POST {} with payload: {}", url, body);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;
        Self::read_json(response).await
    }
}
