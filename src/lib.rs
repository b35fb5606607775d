//! awsq - AWS resources as typed tables
//!
//! Cost Explorer, Price List, CloudFront and Route 53 data exposed as tables
//! with declared columns, queried with column qualifiers and streamed back as
//! rows.
//!
//! # Module Structure
//!
//! - [`aws`] - Service catalogue, the [`aws::Transport`] trait and its HTTP client
//! - [`table`] - Query engine: qualifiers, pagination, hydration, transforms
//! - [`tables`] - The AWS table declarations
//! - [`config`] - Persistent configuration and effective settings
//! - [`error`] - Library error types

pub mod aws;
pub mod config;
pub mod error;
pub mod table;
pub mod tables;

pub use error::{Error, Result, TransportError};

/// Version injected at compile time via AWSQ_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("AWSQ_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
