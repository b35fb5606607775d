//! Service catalogue
//!
//! Maps the services the tables use to their wire-level identity (JSON 1.1
//! target prefix and default endpoint) and defines the [`Transport`] seam.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// AWS services reachable through a [`Transport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    CostExplorer,
    Pricing,
    CloudFront,
    Route53,
}

impl Service {
    /// Short service name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Service::CostExplorer => "ce",
            Service::Pricing => "pricing",
            Service::CloudFront => "cloudfront",
            Service::Route53 => "route53",
        }
    }

    /// `X-Amz-Target` prefix for the JSON 1.1 protocol
    pub fn target_prefix(&self) -> &'static str {
        match self {
            Service::CostExplorer => "AWSInsightsIndexService",
            Service::Pricing => "AWSPriceListService",
            Service::CloudFront => "CloudFront2020_05_31",
            Service::Route53 => "AWSDnsV20130401",
        }
    }

    /// Full `X-Amz-Target` header value for an operation
    pub fn target(&self, operation: &str) -> String {
        format!("{}.{}", self.target_prefix(), operation)
    }

    /// Default endpoint for this service.
    ///
    /// Cost Explorer and the Price List API are only served from `us-east-1`;
    /// CloudFront and Route 53 are global.
    pub fn endpoint(&self, partition: &str) -> String {
        let suffix = dns_suffix(partition);
        match self {
            Service::CostExplorer => format!("https://ce.us-east-1.{}", suffix),
            Service::Pricing => format!("https://api.pricing.us-east-1.{}", suffix),
            Service::CloudFront => format!("https://cloudfront.{}", suffix),
            Service::Route53 => format!("https://route53.{}", suffix),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn dns_suffix(partition: &str) -> &'static str {
    match partition {
        "aws-cn" => "amazonaws.com.cn",
        _ => "amazonaws.com",
    }
}

/// Request/response transport to the provider.
///
/// Implementations perform exactly one provider call per invocation; retry
/// and timeout policy belong to the implementation, never to callers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        service: Service,
        operation: &str,
        params: &Value,
    ) -> Result<Value, TransportError>;
}
