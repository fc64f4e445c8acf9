//! In-memory providers for exercising the orchestrators without a network.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use mask::{Mask, PointPromptResponse};

use crate::{
    error::ProviderError,
    traits::{PointPrompt, PointPromptProvider, SegmentDescriptor, SegmentationProvider},
};

/// Encoded input image of the given size
pub(crate) fn input_image(width: u32, height: u32) -> Vec<u8> {
    mask::encode_to_image(&Mask::new(width, height)).expect("Should encode fixture image")
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockSegmentation {
    segments: Vec<SegmentDescriptor>,
    rasters: HashMap<String, Vec<u8>>,
    fail_listing: bool,
    listing_delay: Option<Duration>,
    fetch_delay: Option<Duration>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl MockSegmentation {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Announce a segment whose raster is `mask` encoded as PNG
    pub(crate) fn with_segment(self, label: &str, mask: &Mask) -> Self {
        let png = mask::encode_to_image(mask).expect("Should encode segment");
        self.with_raw_segment(label, png)
    }

    /// Announce a segment whose raster is served verbatim
    pub(crate) fn with_raw_segment(mut self, label: &str, bytes: Vec<u8>) -> Self {
        let uri = format!("mock://segments/{}", self.segments.len());
        self.segments.push(SegmentDescriptor {
            label: label.to_string(),
            mask: uri.clone(),
            score: Some(0.9),
        });
        self.rasters.insert(uri, bytes);
        self
    }

    /// Announce a segment whose raster URI resolves to nothing
    pub(crate) fn with_missing_segment(mut self, label: &str) -> Self {
        self.segments.push(SegmentDescriptor {
            label: label.to_string(),
            mask: "mock://segments/missing".to_string(),
            score: None,
        });
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub(crate) fn with_listing_delay(mut self, delay: Duration) -> Self {
        self.listing_delay = Some(delay);
        self
    }

    pub(crate) fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// URIs requested through `fetch_mask`, in call order
    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().expect("Should lock").clone()
    }
}

#[async_trait]
impl SegmentationProvider for MockSegmentation {
    async fn segment(&self, _image: &[u8]) -> Result<Vec<SegmentDescriptor>, ProviderError> {
        if let Some(delay) = self.listing_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_listing {
            return Err(ProviderError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.segments.clone())
    }

    async fn fetch_mask(&self, uri: &str) -> Result<Vec<u8>, ProviderError> {
        self.fetched.lock().expect("Should lock").push(uri.to_string());
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.rasters.get(uri).cloned().ok_or(ProviderError::Status {
            status: 404,
            body: uri.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockPointPrompt {
    response: Option<PointPromptResponse>,
    delay: Option<Duration>,
    prompts: Arc<Mutex<Vec<PointPrompt>>>,
}

impl MockPointPrompt {
    pub(crate) fn answering(response: PointPromptResponse) -> Self {
        Self {
            response: Some(response),
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn prompts(&self) -> Vec<PointPrompt> {
        self.prompts.lock().expect("Should lock").clone()
    }
}

#[async_trait]
impl PointPromptProvider for MockPointPrompt {
    async fn segment_point(
        &self,
        _image: &[u8],
        prompt: PointPrompt,
    ) -> Result<PointPromptResponse, ProviderError> {
        self.prompts.lock().expect("Should lock").push(prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone().ok_or(ProviderError::InvalidResponse(
            "mock has no response".to_string(),
        ))
    }
}
