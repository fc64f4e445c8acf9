pub mod builder;

use tracing::{info, warn};

use crate::{
    codec,
    config::AutoMaskConfig,
    error::Result,
    fallback::RoiBand,
    fusion,
    traits::{LabelMatcher, MaskProcessor},
    types::{CoverageReport, FallbackReason, LabeledSegment, Mask},
};

/// Final mask of the automatic route together with its diagnostics
#[derive(Debug, Clone)]
pub struct AutoMaskOutput {
    pub mask: Mask,
    pub report: CoverageReport,
}

impl AutoMaskOutput {
    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        self.report.fallback
    }

    /// PNG for the image synthesis provider
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        codec::encode_to_image(&self.mask)
    }
}

/// Automatic detection route: fuse → clean → safety gates → fallback.
///
/// Never fails; the worst case is the heuristic region tagged as a fallback.
pub struct AutoMaskPipeline {
    matcher: Box<dyn LabelMatcher>,
    processors: Vec<Box<dyn MaskProcessor>>,
    max_coverage_pct: f64,
    fallback_roi: RoiBand,
}

impl AutoMaskPipeline {
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        matcher: Box<dyn LabelMatcher>,
        processors: Vec<Box<dyn MaskProcessor>>,
        max_coverage_pct: f64,
        fallback_roi: RoiBand,
    ) -> Self {
        Self {
            matcher,
            processors,
            max_coverage_pct,
            fallback_roi,
        }
    }

    /// Validate the configuration and build the standard pipeline from it
    pub fn from_config(config: &AutoMaskConfig) -> Result<Self> {
        config.validate()?;
        Ok(builder::PipelineBuilder::from_config(config).build())
    }

    pub fn matcher(&self) -> &dyn LabelMatcher {
        self.matcher.as_ref()
    }

    /// Heuristic region for a `width x height` frame, tagged with `reason`
    pub fn fallback(&self, width: u32, height: u32, reason: FallbackReason) -> AutoMaskOutput {
        let mask = self.fallback_roi.to_mask(width, height);
        let report = CoverageReport::for_fallback(&mask, reason);
        warn!(
            reason = %reason,
            width,
            height,
            coverage_pct = report.coverage_pct,
            "Falling back to heuristic region"
        );
        AutoMaskOutput { mask, report }
    }

    /// Apply the cleaning steps in order
    pub fn postprocess(&self, mask: Mask) -> Result<Mask> {
        self.processors
            .iter()
            .try_fold(mask, |mask, processor| processor.process(mask))
    }

    fn exceeds_coverage(&self, mask: &Mask) -> bool {
        mask.coverage_pct() > self.max_coverage_pct
    }

    /// Clean an already fused mask and enforce the safety gates
    pub fn refine(&self, fused: Mask, classes_used: Vec<String>) -> AutoMaskOutput {
        let (width, height) = fused.dimensions();

        if self.exceeds_coverage(&fused) {
            return self.fallback(width, height, FallbackReason::OverCoverage);
        }

        let cleaned = match self.postprocess(fused) {
            Ok(mask) => mask,
            Err(e) => {
                warn!(error = %e, "Post-processing failed, treating mask as empty");
                return self.fallback(width, height, FallbackReason::EmptyAfterPostprocess);
            }
        };

        if cleaned.is_blank() {
            return self.fallback(width, height, FallbackReason::EmptyAfterPostprocess);
        }
        if self.exceeds_coverage(&cleaned) {
            return self.fallback(width, height, FallbackReason::OverCoverage);
        }

        let report = CoverageReport::measure(&cleaned, classes_used);
        info!(
            coverage_pct = report.coverage_pct,
            classes = ?report.classes_used,
            "Detected mask accepted"
        );
        AutoMaskOutput {
            mask: cleaned,
            report,
        }
    }

    /// Run the whole route over decoded provider segments of a
    /// `width x height` frame. The output mask is always frame-sized;
    /// segments of any other size are skipped.
    pub fn run<I>(&self, segments: I, width: u32, height: u32) -> AutoMaskOutput
    where
        I: IntoIterator<Item = LabeledSegment>,
    {
        match fusion::fuse_into_frame(segments, self.matcher.as_ref(), width, height) {
            Ok(outcome) => self.refine(outcome.mask, outcome.classes_used),
            Err(reason) => self.fallback(width, height, reason),
        }
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let steps: Vec<&str> = self.processors.iter().map(|p| p.name()).collect();
        format!(
            "AutoMaskPipeline: steps [{}], max coverage {:.1}%",
            steps.join(" -> "),
            self.max_coverage_pct
        )
    }
}

impl Default for AutoMaskPipeline {
    fn default() -> Self {
        builder::PipelineBuilder::from_config(&AutoMaskConfig::default()).build()
    }
}
