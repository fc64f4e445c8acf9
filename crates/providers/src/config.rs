use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Where the two segmentation providers live and how to call them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ProviderConfig {
    /// Endpoint receiving the raw image and answering with labelled segments
    pub segmentation_url: String,
    /// Endpoint receiving an image plus a point and answering with candidates
    pub point_prompt_url: String,
    /// Per-call timeout in seconds
    #[schemars(range(min = 1))]
    pub timeout_secs: u64,
    /// Bearer token; never written back out
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Fetch segment rasters concurrently instead of one after another
    pub concurrent_fetch: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            segmentation_url: "http://localhost:8080/segment".to_string(),
            point_prompt_url: "http://localhost:8080/segment-point".to_string(),
            timeout_secs: 60,
            api_token: None,
            concurrent_fetch: true,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.timeout_secs == 0 {
            return Err(ProviderError::Config("timeout_secs must be positive".to_string()));
        }
        for url in [&self.segmentation_url, &self.point_prompt_url] {
            reqwest::Url::parse(url)
                .map_err(|e| ProviderError::Config(format!("invalid endpoint '{}': {}", url, e)))?;
        }
        Ok(())
    }
}
