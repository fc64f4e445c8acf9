//! # Mask Providers
//!
//! The network side of the mask engine: async traits for the two external
//! segmentation services, reqwest clients implementing them, and the
//! request-level orchestrators that wrap the synchronous `mask` pipeline.
//!
//! - [`AutoMasker`] lists labelled segments, fetches the relevant rasters
//!   and runs the automatic pipeline. It fails open: any provider problem
//!   yields the fallback region.
//! - [`PointMasker`] asks for candidates at one click and selects the best.
//!
//! ```rust,no_run
//! use mask::AutoMaskPipeline;
//! use providers::{AutoMasker, HttpSegmentationClient, ProviderConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig::default();
//! let masker = AutoMasker::new(HttpSegmentationClient::new(&config)?, AutoMaskPipeline::default())
//!     .with_provider_config(&config);
//!
//! let image = std::fs::read("kitchen.jpg")?;
//! let output = masker.generate(&image).await?;
//! println!("{:.1}% covered", output.report.coverage_pct);
//! # Ok(())
//! # }
//! ```

use std::{future::Future, io::Cursor, time::Duration};

use mask::MaskError;

pub mod auto;
pub mod config;
pub mod error;
pub mod http;
pub mod point;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_utils;

pub use auto::AutoMasker;
pub use config::ProviderConfig;
pub use error::{PointMaskError, ProviderError};
pub use http::{HttpPointPromptClient, HttpSegmentationClient};
pub use point::PointMasker;
pub use traits::{
    PointLabel, PointPrompt, PointPromptProvider, SegmentDescriptor, SegmentationProvider,
};

/// Width and height of an encoded input image, read from its header
pub fn input_dimensions(image: &[u8]) -> Result<(u32, u32), MaskError> {
    let (width, height) = image::ImageReader::new(Cursor::new(image))
        .with_guessed_format()
        .map_err(|e| MaskError::Validation(format!("unreadable input image: {}", e)))?
        .into_dimensions()
        .map_err(|e| MaskError::Validation(format!("unreadable input image: {}", e)))?;
    if width == 0 || height == 0 {
        return Err(MaskError::Validation("input image has no pixels".to_string()));
    }
    Ok((width, height))
}

/// Await a provider call, mapping an elapsed deadline to [`ProviderError::Timeout`]
pub(crate) async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ProviderError::Timeout(limit))?
}
