//! HTTP implementation of [`CapabilityApi`] over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use topolive_core::{ApiError, CapabilityApi, ServiceInfo};

pub const SERVICE_PATH: &str = "/api";
pub const TOPOLOGY_PATH: &str = "/api/topology";

/// Client for the analyzer REST endpoints.
#[derive(Clone, Debug)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Network(err.to_string())
        }
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, body));
        }
        let bytes = resp.bytes().await.map_err(|e| self.map_send_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CapabilityApi for HttpApi {
    #[tracing::instrument(skip_all)]
    async fn service_info(&self) -> Result<ServiceInfo, ApiError> {
        let resp = self
            .client
            .get(self.url(SERVICE_PATH))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.read_json(resp).await
    }

    #[tracing::instrument(skip(self))]
    async fn topology_query(&self, query: &str) -> Result<Value, ApiError> {
        let resp = self
            .client
            .post(self.url(TOPOLOGY_PATH))
            .timeout(self.timeout)
            .json(&serde_json::json!({ "GremlinQuery": query }))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.read_json(resp).await
    }
}
