//! AWS Client
//!
//! HTTP-backed [`Transport`]. Requests are sent unsigned in the AWS JSON 1.1
//! format; point `endpoint` at a SigV4 signing proxy to reach real AWS.

use super::http::AwsHttpClient;
use super::service::{Service, Transport};
use crate::error::{Result, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Main AWS client
#[derive(Clone)]
pub struct AwsClient {
    pub http: AwsHttpClient,
    pub partition: String,
    /// Overrides every service endpoint when set
    pub endpoint: Option<Url>,
}

impl AwsClient {
    /// Create a new AWS client
    pub fn new(partition: &str, endpoint: Option<Url>, timeout: Duration) -> Result<Self> {
        let http = AwsHttpClient::new(timeout)?;

        Ok(Self {
            http,
            partition: partition.to_string(),
            endpoint,
        })
    }

    /// Resolve the URL a service call is sent to
    pub fn service_url(&self, service: Service) -> String {
        match &self.endpoint {
            Some(url) => url.as_str().to_string(),
            None => service.endpoint(&self.partition),
        }
    }
}

#[async_trait]
impl Transport for AwsClient {
    async fn call(
        &self,
        service: Service,
        operation: &str,
        params: &Value,
    ) -> std::result::Result<Value, TransportError> {
        let url = self.service_url(service);
        self.http.post_json(&url, service, operation, params).await
    }
}
