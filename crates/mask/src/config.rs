use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{MaskError, Result},
    fallback::RoiBand,
    fusion::LabelVocabulary,
};

/// Tunables of the automatic detection route.
///
/// The defaults reproduce the kitchen-fixture tuning; other object classes
/// will want their own vocabulary, band and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AutoMaskConfig {
    /// Components smaller than this many pixels are discarded
    pub min_component_size: usize,
    /// Promote enclosed background to foreground
    pub fill_holes: bool,
    /// Square dilation radius in pixels applied last; 0 disables it
    pub dilation_radius: u32,
    /// Masks covering more than this percentage of the frame are rejected
    #[schemars(range(min = 0.0, max = 100.0))]
    pub max_coverage_pct: f64,
    /// Region used when detection fails
    pub fallback_roi: RoiBand,
    /// Labels that make up the renovation target
    pub labels: LabelVocabulary,
}

impl Default for AutoMaskConfig {
    fn default() -> Self {
        Self {
            min_component_size: 350,
            fill_holes: true,
            dilation_radius: 6,
            max_coverage_pct: 90.0,
            fallback_roi: RoiBand::default(),
            labels: LabelVocabulary::default(),
        }
    }
}

impl AutoMaskConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.max_coverage_pct.is_finite() || !(0.0..=100.0).contains(&self.max_coverage_pct) {
            return Err(MaskError::Config(format!(
                "max_coverage_pct must be within [0, 100], got {}",
                self.max_coverage_pct
            )));
        }
        self.fallback_roi.validate()?;
        if self.labels.exact.is_empty() && self.labels.keywords.is_empty() {
            return Err(MaskError::Config("label vocabulary is empty".to_string()));
        }
        Ok(())
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AutoMaskConfig)
    }
}
