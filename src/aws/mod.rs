//! AWS API interaction module
//!
//! This module is the outbound boundary of the query engine. Tables never talk
//! to AWS directly; they describe calls as `(service, operation, params)` and
//! hand them to a [`Transport`].
//!
//! # Module Structure
//!
//! - [`service`] - Service catalogue and the [`Transport`] trait
//! - [`client`] - [`AwsClient`], the HTTP-backed transport
//! - [`http`] - AWS JSON 1.1 wire handling and error decoding
//!
//! # Example
//!
//! ```ignore
//! use awsq::aws::{AwsClient, Service, Transport};
//!
//! async fn example(client: &AwsClient) -> awsq::Result<()> {
//!     let zones = client
//!         .call(Service::Route53, "ListHostedZones", &serde_json::json!({}))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod service;

pub use client::AwsClient;
pub use service::{Service, Transport};
