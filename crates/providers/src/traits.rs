use async_trait::async_trait;
use mask::PointPromptResponse;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One labelled region as announced by the segmentation provider.
///
/// The raster itself is not part of the listing; `mask` is a URI that
/// [`SegmentationProvider::fetch_mask`] resolves to encoded image bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub label: String,
    pub mask: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Whether a click marks the object (foreground) or excludes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointLabel {
    Foreground,
    Background,
}

impl PointLabel {
    /// Wire value expected by point-prompt providers
    pub fn as_wire(self) -> u8 {
        match self {
            Self::Foreground => 1,
            Self::Background => 0,
        }
    }
}

/// A single click in pixel coordinates of the input image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointPrompt {
    pub x: u32,
    pub y: u32,
    pub label: PointLabel,
}

impl PointPrompt {
    pub fn foreground(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            label: PointLabel::Foreground,
        }
    }
}

/// Provider that lists labelled segments for a whole image
#[async_trait]
pub trait SegmentationProvider: Send + Sync {
    /// List the segments found in `image` (encoded image bytes)
    async fn segment(&self, image: &[u8]) -> Result<Vec<SegmentDescriptor>, ProviderError>;

    /// Resolve a segment's mask URI to encoded raster bytes
    async fn fetch_mask(&self, uri: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Provider that proposes candidate masks for one click
#[async_trait]
pub trait PointPromptProvider: Send + Sync {
    async fn segment_point(
        &self,
        image: &[u8],
        prompt: PointPrompt,
    ) -> Result<PointPromptResponse, ProviderError>;
}
