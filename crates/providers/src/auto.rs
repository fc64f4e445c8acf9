use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use mask::{
    decode_provider_mask, AutoMaskOutput, AutoMaskPipeline, FallbackReason, LabelMatcher,
    LabeledSegment, MaskError,
};
use tracing::{debug, info, warn};

use crate::{
    config::ProviderConfig,
    input_dimensions,
    traits::{SegmentDescriptor, SegmentationProvider},
    with_deadline,
};

/// Automatic route against a live segmentation provider.
///
/// Every provider call carries a timeout. Any provider failure ends in the
/// pipeline's fallback region rather than an error; only an unreadable
/// input image is rejected.
pub struct AutoMasker<P> {
    provider: P,
    pipeline: Arc<AutoMaskPipeline>,
    call_timeout: Duration,
    concurrent_fetch: bool,
}

impl<P: SegmentationProvider> AutoMasker<P> {
    pub fn new(provider: P, pipeline: AutoMaskPipeline) -> Self {
        let defaults = ProviderConfig::default();
        Self {
            provider,
            pipeline: Arc::new(pipeline),
            call_timeout: defaults.timeout(),
            concurrent_fetch: defaults.concurrent_fetch,
        }
    }

    /// Take the timeout and fetch strategy from a provider configuration
    pub fn with_provider_config(self, config: &ProviderConfig) -> Self {
        self.with_timeout(config.timeout())
            .with_concurrent_fetch(config.concurrent_fetch)
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_concurrent_fetch(mut self, concurrent: bool) -> Self {
        self.concurrent_fetch = concurrent;
        self
    }

    pub fn pipeline(&self) -> &AutoMaskPipeline {
        self.pipeline.as_ref()
    }

    /// Produce the inpainting mask for an encoded input image
    pub async fn generate(&self, image: &[u8]) -> Result<AutoMaskOutput, MaskError> {
        let (width, height) = input_dimensions(image)?;

        let listed = match with_deadline(self.call_timeout, self.provider.segment(image)).await {
            Ok(listed) => listed,
            Err(e) => {
                warn!(error = %e, "Segmentation provider failed");
                return Ok(self.pipeline.fallback(width, height, FallbackReason::ProviderFailure));
            }
        };

        let total = listed.len();
        let relevant: Vec<SegmentDescriptor> = listed
            .into_iter()
            .filter(|segment| self.pipeline.matcher().matches(&segment.label))
            .collect();
        info!(total, relevant = relevant.len(), "Segments listed");

        if relevant.is_empty() {
            return Ok(self.pipeline.fallback(width, height, FallbackReason::NoMatchingSegments));
        }

        let requested = relevant.len();
        let segments = self.fetch_segments(relevant).await;
        if segments.is_empty() {
            warn!(requested, "No matched segment could be fetched or decoded");
            return Ok(self.pipeline.fallback(width, height, FallbackReason::ProviderFailure));
        }

        // Labelling and dilation are CPU-bound; keep them off the async workers
        let pipeline = Arc::clone(&self.pipeline);
        match tokio::task::spawn_blocking(move || pipeline.run(segments, width, height)).await {
            Ok(output) => Ok(output),
            Err(e) => {
                warn!(error = %e, "Mask pipeline task failed");
                Ok(self.pipeline.fallback(width, height, FallbackReason::ProviderFailure))
            }
        }
    }

    async fn fetch_segments(&self, relevant: Vec<SegmentDescriptor>) -> Vec<LabeledSegment> {
        if self.concurrent_fetch {
            let fetches: Vec<_> = relevant
                .into_iter()
                .map(|segment| self.fetch_segment(segment))
                .collect();
            join_all(fetches)
                .await
                .into_iter()
                .flatten()
                .collect()
        } else {
            let mut segments = Vec::with_capacity(relevant.len());
            for segment in relevant {
                segments.extend(self.fetch_segment(segment).await);
            }
            segments
        }
    }

    /// Fetch and decode one raster; failures drop the segment
    async fn fetch_segment(&self, segment: SegmentDescriptor) -> Option<LabeledSegment> {
        let bytes = match with_deadline(self.call_timeout, self.provider.fetch_mask(&segment.mask)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(label = %segment.label, error = %e, "Skipping segment, fetch failed");
                return None;
            }
        };

        let decoded = match tokio::task::spawn_blocking(move || decode_provider_mask(&bytes)).await {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(label = %segment.label, error = %e, "Skipping segment, decode task failed");
                return None;
            }
        };
        match decoded {
            Ok(mask) => {
                debug!(label = %segment.label, foreground = mask.foreground_count(), "Segment decoded");
                Some(LabeledSegment {
                    label: segment.label,
                    mask,
                    score: segment.score,
                })
            }
            Err(e) => {
                warn!(label = %segment.label, error = %e, "Skipping segment, undecodable raster");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{input_image, MockSegmentation};
    use mask::Mask;

    /// Pipeline with no cleaning so fused pixels can be counted exactly
    fn bare_pipeline() -> AutoMaskPipeline {
        AutoMaskPipeline::builder().build()
    }

    #[tokio::test]
    async fn test_fuses_matching_segments_only() {
        let provider = MockSegmentation::new()
            .with_segment("countertop", &Mask::filled_rect(100, 100, 0, 10, 0, 10))
            .with_segment("wall", &Mask::filled_rect(100, 100, 0, 100, 0, 50))
            .with_segment("Kitchen Island", &Mask::filled_rect(100, 100, 50, 60, 50, 60));
        let masker = AutoMasker::new(provider.clone(), bare_pipeline());

        let output = masker
            .generate(&input_image(100, 100))
            .await
            .expect("Should produce a mask");

        assert_eq!(output.fallback_reason(), None);
        assert_eq!(output.report.white_pixel_count, 200);
        assert_eq!(output.report.classes_used, vec!["countertop", "Kitchen Island"]);
        assert_eq!(provider.fetched(), vec!["mock://segments/0", "mock://segments/2"]);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let masker = AutoMasker::new(MockSegmentation::new().failing(), bare_pipeline());
        let output = masker
            .generate(&input_image(100, 100))
            .await
            .expect("Should fail open");

        assert_eq!(output.fallback_reason(), Some(FallbackReason::ProviderFailure));
        assert_eq!(output.report.classes_used, vec!["roi_fallback_provider_error"]);
        assert_eq!(output.mask.dimensions(), (100, 100));
        assert!(output.mask.get(50, 99));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_timeout_falls_back() {
        let provider = MockSegmentation::new()
            .with_segment("countertop", &Mask::filled_rect(100, 100, 0, 10, 0, 10))
            .with_listing_delay(Duration::from_secs(120));
        let masker = AutoMasker::new(provider, bare_pipeline()).with_timeout(Duration::from_secs(5));

        let output = masker
            .generate(&input_image(100, 100))
            .await
            .expect("Should fail open");
        assert_eq!(output.fallback_reason(), Some(FallbackReason::ProviderFailure));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_drops_every_segment() {
        let provider = MockSegmentation::new()
            .with_segment("countertop", &Mask::filled_rect(100, 100, 0, 10, 0, 10))
            .with_fetch_delay(Duration::from_secs(120));
        let masker = AutoMasker::new(provider, bare_pipeline()).with_timeout(Duration::from_secs(5));

        let output = masker
            .generate(&input_image(100, 100))
            .await
            .expect("Should fail open");
        assert_eq!(output.fallback_reason(), Some(FallbackReason::ProviderFailure));
    }

    #[tokio::test]
    async fn test_undecodable_segment_is_skipped() {
        let provider = MockSegmentation::new()
            .with_raw_segment("sink", b"definitely not a png".to_vec())
            .with_missing_segment("stove")
            .with_segment("cabinet", &Mask::filled_rect(100, 100, 0, 20, 0, 20));
        let masker = AutoMasker::new(provider, bare_pipeline());

        let output = masker
            .generate(&input_image(100, 100))
            .await
            .expect("Should produce a mask");
        assert_eq!(output.fallback_reason(), None);
        assert_eq!(output.report.classes_used, vec!["cabinet"]);
        assert_eq!(output.report.white_pixel_count, 400);
    }

    #[tokio::test]
    async fn test_all_segments_undecodable_falls_back() {
        let provider = MockSegmentation::new().with_raw_segment("sink", vec![0, 1, 2, 3]);
        let masker = AutoMasker::new(provider, bare_pipeline());

        let output = masker
            .generate(&input_image(64, 48))
            .await
            .expect("Should fail open");
        assert_eq!(output.fallback_reason(), Some(FallbackReason::ProviderFailure));
        assert_eq!(output.mask.dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn test_no_relevant_labels_falls_back_without_fetching() {
        let provider = MockSegmentation::new()
            .with_segment("wall", &Mask::filled_rect(100, 100, 0, 100, 0, 50))
            .with_segment("floor", &Mask::filled_rect(100, 100, 0, 100, 50, 100));
        let masker = AutoMasker::new(provider.clone(), bare_pipeline());

        let output = masker
            .generate(&input_image(100, 100))
            .await
            .expect("Should fail open");
        assert_eq!(output.fallback_reason(), Some(FallbackReason::NoMatchingSegments));
        assert_eq!(output.report.classes_used, vec!["roi_fallback"]);
        assert!(provider.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_and_concurrent_fetch_agree() {
        let provider = MockSegmentation::new()
            .with_segment("countertop", &Mask::filled_rect(80, 60, 0, 30, 30, 60))
            .with_segment("backsplash", &Mask::filled_rect(80, 60, 20, 80, 20, 40))
            .with_segment("sink", &Mask::filled_rect(80, 60, 40, 50, 40, 50));
        let image = input_image(80, 60);

        let concurrent = AutoMasker::new(provider.clone(), bare_pipeline())
            .with_concurrent_fetch(true)
            .generate(&image)
            .await
            .expect("Should produce a mask");
        let sequential = AutoMasker::new(provider, bare_pipeline())
            .with_concurrent_fetch(false)
            .generate(&image)
            .await
            .expect("Should produce a mask");

        assert_eq!(concurrent.mask, sequential.mask);
        assert_eq!(concurrent.report, sequential.report);
    }

    #[tokio::test]
    async fn test_default_pipeline_cleans_specks() {
        let mut speckled = Mask::filled_rect(100, 100, 10, 90, 60, 90);
        speckled.set(2, 2, true);
        let provider = MockSegmentation::new().with_segment("countertop", &speckled);
        let masker = AutoMasker::new(provider, AutoMaskPipeline::default());

        let output = masker
            .generate(&input_image(100, 100))
            .await
            .expect("Should produce a mask");
        assert_eq!(output.fallback_reason(), None);
        assert!(!output.mask.get(2, 2));
        assert!(output.mask.get(50, 75));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_work_runs_off_the_async_workers() {
        let provider = MockSegmentation::new()
            .with_segment("countertop", &Mask::filled_rect(120, 90, 10, 70, 40, 80))
            .with_segment("sink", &Mask::filled_rect(120, 90, 80, 100, 40, 60));
        let masker = Arc::new(AutoMasker::new(provider, AutoMaskPipeline::default()));
        let image = input_image(120, 90);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let masker = Arc::clone(&masker);
                let image = image.clone();
                tokio::spawn(async move { masker.generate(&image).await })
            })
            .collect();

        let mut outputs = Vec::new();
        for handle in handles {
            let output = handle
                .await
                .expect("Should join")
                .expect("Should produce a mask");
            outputs.push(output);
        }
        for output in &outputs {
            assert_eq!(output.fallback_reason(), None);
            assert_eq!(output.mask.dimensions(), (120, 90));
            assert_eq!(output.mask, outputs[0].mask);
        }
    }

    #[tokio::test]
    async fn test_segment_of_wrong_size_is_ignored() {
        let provider = MockSegmentation::new()
            .with_segment("sink", &Mask::filled_rect(50, 50, 0, 40, 0, 40))
            .with_segment("cabinet", &Mask::filled_rect(100, 100, 0, 20, 0, 20));
        let masker = AutoMasker::new(provider, bare_pipeline());

        let output = masker
            .generate(&input_image(100, 100))
            .await
            .expect("Should produce a mask");
        assert_eq!(output.mask.dimensions(), (100, 100));
        assert_eq!(output.report.classes_used, vec!["cabinet"]);
        assert_eq!(output.report.white_pixel_count, 400);
    }

    #[tokio::test]
    async fn test_rejects_unreadable_input() {
        let masker = AutoMasker::new(MockSegmentation::new(), bare_pipeline());
        assert!(matches!(
            masker.generate(b"garbage").await,
            Err(MaskError::Validation(_))
        ));
    }

    #[test]
    fn test_provider_config_is_applied() {
        let config = ProviderConfig {
            timeout_secs: 7,
            concurrent_fetch: false,
            ..ProviderConfig::default()
        };
        let masker = AutoMasker::new(MockSegmentation::new(), bare_pipeline())
            .with_provider_config(&config);
        assert_eq!(masker.call_timeout, Duration::from_secs(7));
        assert!(!masker.concurrent_fetch);
    }
}
