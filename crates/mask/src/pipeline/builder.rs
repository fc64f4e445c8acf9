use crate::{
    algorithms::{BoxDilation, HoleFiller, SmallComponentFilter},
    config::AutoMaskConfig,
    fallback::RoiBand,
    fusion::LabelVocabulary,
    pipeline::AutoMaskPipeline,
    traits::{LabelMatcher, MaskProcessor},
};

/// Builder for [`AutoMaskPipeline`] with a fluent API.
///
/// Cleaning steps always run as: remove small components, fill holes,
/// custom processors, dilate. The order of builder calls does not matter.
pub struct PipelineBuilder {
    matcher: Option<Box<dyn LabelMatcher>>,
    min_component_size: Option<usize>,
    fill_holes: bool,
    extra_processors: Vec<Box<dyn MaskProcessor>>,
    dilation_radius: Option<u32>,
    max_coverage_pct: f64,
    fallback_roi: RoiBand,
}

impl PipelineBuilder {
    /// A builder with no cleaning steps and default gates
    pub fn new() -> Self {
        Self {
            matcher: None,
            min_component_size: None,
            fill_holes: false,
            extra_processors: Vec::new(),
            dilation_radius: None,
            max_coverage_pct: 90.0,
            fallback_roi: RoiBand::default(),
        }
    }

    pub fn from_config(config: &AutoMaskConfig) -> Self {
        Self::new()
            .with_label_matcher(config.labels.clone())
            .with_min_component_size(config.min_component_size)
            .with_hole_filling(config.fill_holes)
            .with_dilation(config.dilation_radius)
            .with_max_coverage(config.max_coverage_pct)
            .with_fallback_roi(config.fallback_roi)
    }

    /// Set the label matcher (replaces any existing one)
    pub fn with_label_matcher<M>(mut self, matcher: M) -> Self
    where
        M: LabelMatcher + 'static,
    {
        self.matcher = Some(Box::new(matcher));
        self
    }

    pub fn with_min_component_size(mut self, min_size: usize) -> Self {
        self.min_component_size = Some(min_size);
        self
    }

    pub fn with_hole_filling(mut self, enabled: bool) -> Self {
        self.fill_holes = enabled;
        self
    }

    /// Dilation radius in pixels; 0 removes the step
    pub fn with_dilation(mut self, radius: u32) -> Self {
        self.dilation_radius = (radius > 0).then_some(radius);
        self
    }

    /// Add a custom step, run after hole filling and before dilation
    pub fn add_processor<P>(mut self, processor: P) -> Self
    where
        P: MaskProcessor + 'static,
    {
        self.extra_processors.push(Box::new(processor));
        self
    }

    pub fn with_max_coverage(mut self, pct: f64) -> Self {
        self.max_coverage_pct = pct;
        self
    }

    pub fn with_fallback_roi(mut self, band: RoiBand) -> Self {
        self.fallback_roi = band;
        self
    }

    pub fn build(self) -> AutoMaskPipeline {
        let mut processors: Vec<Box<dyn MaskProcessor>> = Vec::new();
        if let Some(min_size) = self.min_component_size {
            processors.push(Box::new(SmallComponentFilter { min_size }));
        }
        if self.fill_holes {
            processors.push(Box::new(HoleFiller));
        }
        processors.extend(self.extra_processors);
        if let Some(radius) = self.dilation_radius {
            processors.push(Box::new(BoxDilation { radius }));
        }

        let matcher = self
            .matcher
            .unwrap_or_else(|| Box::new(LabelVocabulary::default()));

        AutoMaskPipeline::new(matcher, processors, self.max_coverage_pct, self.fallback_roi)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
