//! HTTP utilities for AWS JSON 1.1 API calls

use super::service::Service;
use crate::error::{Error, Result, TransportError};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Content type of the AWS JSON 1.1 protocol
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut cut = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for AWS API calls
#[derive(Clone)]
pub struct AwsHttpClient {
    client: Client,
}

impl AwsHttpClient {
    /// Create a new HTTP client
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("awsq/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// POST a JSON 1.1 request and decode the response
    pub async fn post_json(
        &self,
        url: &str,
        service: Service,
        operation: &str,
        body: &Value,
    ) -> std::result::Result<Value, TransportError> {
        tracing::debug!("POST {} target={}", url, service.target(operation));

        let response = self
            .client
            .post(url)
            .header("X-Amz-Target", service.target(operation))
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| {
                TransportError::new(service.name(), operation, format!("failed to send request: {}", e))
            })?;

        let status = response.status();
        let header_code = response
            .headers()
            .get("x-amzn-ErrorType")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let text = response.text().await.map_err(|e| {
            TransportError::new(service.name(), operation, format!("failed to read response body: {}", e))
                .with_status(status.as_u16())
        })?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            return Err(decode_error(
                service,
                operation,
                status.as_u16(),
                header_code.as_deref(),
                &text,
            ));
        }

        if text.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        serde_json::from_str(&text).map_err(|e| {
            TransportError::new(service.name(), operation, format!("failed to parse response JSON: {}", e))
                .with_status(status.as_u16())
        })
    }
}

/// Build a [`TransportError`] from a non-success response.
///
/// The error code comes from the `x-amzn-ErrorType` header when present
/// (`Code:http://...`), otherwise from the body's `__type`
/// (`com.amazonaws.cloudfront#NoSuchDistribution`).
pub fn decode_error(
    service: Service,
    operation: &str,
    status: u16,
    header_code: Option<&str>,
    body: &str,
) -> TransportError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let code = header_code
        .map(|h| h.split(':').next().unwrap_or(h).to_string())
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|v| v.get("__type"))
                .and_then(|v| v.as_str())
                .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        })
        .filter(|c| !c.is_empty());

    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("API request failed: {}", status));

    let mut err = TransportError::new(service.name(), operation, message).with_status(status);
    if let Some(code) = code {
        err = err.with_code(code);
    }
    err
}

/// Format a transport error for display
/// Keeps the provider code, replaces the raw message with a hint per status
pub fn format_aws_error(error: &TransportError) -> String {
    let hint = match error.status {
        Some(401) | Some(403) => "Permission denied. Check your IAM permissions and signing proxy.",
        Some(404) => "Resource not found.",
        Some(429) => "Rate limit exceeded. Please try again later.",
        Some(400) => "Invalid request. Check your qualifiers.",
        Some(500) | Some(502) | Some(503) => "AWS service temporarily unavailable. Please try again.",
        Some(_) => "Request failed.",
        None => "Request failed. Check your network connection and try again.",
    };

    match &error.code {
        Some(code) => format!("{}.{}: {} ({})", error.service, error.operation, hint, code),
        None => format!("{}.{}: {}", error.service, error.operation, hint),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_from_type_field() {
        let body = r#"{"__type":"com.amazonaws.cloudfront#NoSuchDistribution","message":"gone"}"#;
        let err = decode_error(Service::CloudFront, "GetDistribution", 404, None, body);
        assert_eq!(err.code.as_deref(), Some("NoSuchDistribution"));
        assert_eq!(err.message, "gone");
        assert_eq!(err.status, Some(404));
    }

    #[test]
    fn test_decode_error_prefers_header() {
        let err = decode_error(
            Service::Pricing,
            "DescribeServices",
            400,
            Some("NotFoundException:http://internal.amazon.com/coral/"),
            "{}",
        );
        assert_eq!(err.code.as_deref(), Some("NotFoundException"));
    }

    #[test]
    fn test_decode_error_non_json_body() {
        let err = decode_error(Service::Route53, "ListHostedZones", 502, None, "<html>");
        assert_eq!(err.code, None);
        assert!(err.message.contains("502"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let body = "x".repeat(500);
        let out = sanitize_for_log(&body);
        assert!(out.contains("truncated, 500 bytes total"));
    }

    #[test]
    fn test_format_aws_error_keeps_code() {
        let err = TransportError::new("ce", "GetCostAndUsage", "raw details")
            .with_status(429)
            .with_code("ThrottlingException");
        let text = format_aws_error(&err);
        assert!(text.contains("Rate limit"));
        assert!(text.contains("ThrottlingException"));
        assert!(!text.contains("raw details"));
    }
}
