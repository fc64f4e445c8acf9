use std::time::Duration;

use mask::{select_point_mask, MaskError, SelectedMask};
use tracing::info;

use crate::{
    config::ProviderConfig,
    error::PointMaskError,
    input_dimensions,
    traits::{PointPrompt, PointPromptProvider},
    with_deadline,
};

/// Point-prompt route against a live provider.
///
/// Unlike [`crate::AutoMasker`] there is no fallback: provider failures and
/// empty candidate lists are returned to the caller.
pub struct PointMasker<P> {
    provider: P,
    call_timeout: Duration,
}

impl<P: PointPromptProvider> PointMasker<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            call_timeout: ProviderConfig::default().timeout(),
        }
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub async fn generate(
        &self,
        image: &[u8],
        prompt: PointPrompt,
    ) -> Result<SelectedMask, PointMaskError> {
        let (width, height) = input_dimensions(image)?;
        if prompt.x >= width || prompt.y >= height {
            return Err(PointMaskError::Validation(format!(
                "point ({}, {}) lies outside the {}x{} image",
                prompt.x, prompt.y, width, height
            )));
        }

        let response =
            with_deadline(self.call_timeout, self.provider.segment_point(image, prompt)).await?;
        if !response.mask_details.is_empty() {
            let shape = response.dimensions()?;
            if shape != (width, height) {
                return Err(MaskError::DimensionMismatch {
                    expected: (width, height),
                    actual: shape,
                }
                .into());
            }
        }
        let selected = select_point_mask(&response)?;

        info!(
            candidates = response.mask_details.len(),
            index = selected.index,
            stability_score = selected.stability_score,
            coverage_pct = selected.mask.coverage_pct(),
            "Point-prompt mask selected"
        );
        Ok(selected)
    }
}
