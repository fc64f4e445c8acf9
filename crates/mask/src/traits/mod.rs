use crate::{error::Result, types::Mask};

/// A single Mask → Mask cleaning step
pub trait MaskProcessor: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Transform the mask, consuming it
    fn process(&self, mask: Mask) -> Result<Mask>;
}

/// Decides whether a provider label belongs to the renovation target
pub trait LabelMatcher: Send + Sync {
    fn matches(&self, label: &str) -> bool;
}
