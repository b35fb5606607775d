//! Configuration Management
//!
//! Handles persistent configuration storage for awsq and resolves the
//! effective query settings.

use crate::table::{ForecastPolicy, LookbackPolicy, QuerySettings, TransformErrorPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_PARTITION: &str = "aws";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HYDRATE_CONCURRENCY: usize = 8;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default region
    #[serde(default)]
    pub region: Option<String>,
    /// AWS partition (aws, aws-cn, aws-us-gov)
    #[serde(default)]
    pub partition: Option<String>,
    /// Base URL all requests are sent to instead of the public endpoints,
    /// typically a local signing proxy
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Items hydrated concurrently per query
    #[serde(default)]
    pub hydrate_concurrency: Option<usize>,
    #[serde(default)]
    pub transform_errors: TransformErrorPolicy,
    #[serde(default)]
    pub lookback: LookbackPolicy,
    #[serde(default)]
    pub forecast: ForecastPolicy,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("awsq").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Parse config JSON, falling back to defaults on malformed input
    pub fn parse(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed config: {}", e);
            Self::default()
        })
    }

    /// Get effective region (CLI > environment > config > default)
    pub fn effective_region(&self, cli: Option<&str>) -> String {
        let env = std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .ok();
        resolve_region(cli, env.as_deref(), self.region.as_deref())
    }

    pub fn effective_partition(&self) -> String {
        self.partition
            .clone()
            .unwrap_or_else(|| DEFAULT_PARTITION.to_string())
    }

    /// Parsed endpoint override, if one is configured
    pub fn endpoint_url(&self, cli: Option<&str>) -> Result<Option<Url>> {
        cli.or(self.endpoint.as_deref())
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid endpoint URL '{}'", raw)))
            .transpose()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Validated settings for the query engine
    pub fn settings(&self, region: &str) -> Result<QuerySettings> {
        self.lookback.validate().context("invalid lookback policy")?;
        self.forecast.validate().context("invalid forecast policy")?;

        let hydrate_concurrency = self.hydrate_concurrency.unwrap_or(DEFAULT_HYDRATE_CONCURRENCY);
        if hydrate_concurrency == 0 {
            anyhow::bail!("hydrate_concurrency must be at least 1");
        }

        Ok(QuerySettings {
            partition: self.effective_partition(),
            region: region.to_string(),
            lookback: self.lookback,
            forecast: self.forecast,
            hydrate_concurrency,
            transform_errors: self.transform_errors,
        })
    }
}

fn resolve_region(cli: Option<&str>, env: Option<&str>, file: Option<&str>) -> String {
    [cli, env, file]
        .into_iter()
        .flatten()
        .find(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REGION)
        .to_string()
}
