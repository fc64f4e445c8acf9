//! Label selection and union of provider segments into one working mask.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::Result,
    traits::LabelMatcher,
    types::{FallbackReason, LabeledSegment, Mask},
};

/// Two-tier label vocabulary: exact canonical labels, then keyword containment.
///
/// Comparison is case-insensitive and ignores surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LabelVocabulary {
    /// Labels accepted verbatim, e.g. `"countertop"`
    pub exact: Vec<String>,
    /// Substrings that accept a label, e.g. `"island"` accepts `"kitchen island bench"`
    pub keywords: Vec<String>,
}

impl LabelVocabulary {
    pub fn new<E, K>(exact: E, keywords: K) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            exact: exact.into_iter().map(|s| s.into().trim().to_lowercase()).collect(),
            keywords: keywords.into_iter().map(|s| s.into().trim().to_lowercase()).collect(),
        }
    }

    /// Kitchen fixtures and fittings
    pub fn kitchen() -> Self {
        Self::new(
            [
                "cabinet",
                "cabinets",
                "countertop",
                "counter",
                "sink",
                "kitchen island",
                "stove",
                "oven",
                "range hood",
                "refrigerator",
                "dishwasher",
                "microwave",
                "backsplash",
                "faucet",
            ],
            [
                "cabinet",
                "counter",
                "island",
                "sink",
                "stove",
                "oven",
                "cooktop",
                "hood",
                "fridge",
                "refrigerator",
                "dishwasher",
                "microwave",
                "backsplash",
                "faucet",
                "drawer",
            ],
        )
    }
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self::kitchen()
    }
}

impl LabelMatcher for LabelVocabulary {
    fn matches(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return false;
        }
        self.exact.iter().any(|e| e.trim().to_lowercase() == label)
            || self
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .any(|k| !k.is_empty() && label.contains(&k))
    }
}

/// Pixelwise OR of two equally sized masks
pub fn union(a: &Mask, b: &Mask) -> Result<Mask> {
    let mut out = a.clone();
    out.union_with(b)?;
    Ok(out)
}

/// Result of fusing the relevant segments
#[derive(Debug, Clone)]
pub struct FusionOutcome {
    pub mask: Mask,
    /// Matched labels in fusion order, without duplicates
    pub classes_used: Vec<String>,
    /// Matched labels that were dropped, e.g. for a dimension mismatch
    pub skipped: Vec<String>,
}

/// Union every segment whose label the matcher accepts.
///
/// The first accepted segment fixes the dimensions; later segments with
/// different dimensions are skipped rather than resized. Returns
/// [`FallbackReason::NoMatchingSegments`] when nothing was fused.
pub fn fuse<I, M>(segments: I, matcher: &M) -> std::result::Result<FusionOutcome, FallbackReason>
where
    I: IntoIterator<Item = LabeledSegment>,
    M: LabelMatcher + ?Sized,
{
    fuse_segments(segments, matcher, None)
}

/// Like [`fuse`], but every accepted segment must be `width x height`, so
/// the fused mask always matches the frame.
///
/// When segments matched but none had the frame's dimensions the provider
/// output is unusable and [`FallbackReason::ProviderFailure`] is returned.
pub fn fuse_into_frame<I, M>(
    segments: I,
    matcher: &M,
    width: u32,
    height: u32,
) -> std::result::Result<FusionOutcome, FallbackReason>
where
    I: IntoIterator<Item = LabeledSegment>,
    M: LabelMatcher + ?Sized,
{
    fuse_segments(segments, matcher, Some((width, height)))
}

fn fuse_segments<I, M>(
    segments: I,
    matcher: &M,
    frame: Option<(u32, u32)>,
) -> std::result::Result<FusionOutcome, FallbackReason>
where
    I: IntoIterator<Item = LabeledSegment>,
    M: LabelMatcher + ?Sized,
{
    let mut fused: Option<Mask> = None;
    let mut classes_used: Vec<String> = Vec::new();
    let mut skipped = Vec::new();

    for segment in segments {
        if !matcher.matches(&segment.label) {
            debug!(label = %segment.label, "Ignoring unrelated segment");
            continue;
        }

        let expected = frame.or_else(|| fused.as_ref().map(Mask::dimensions));
        if let Some(expected) = expected.filter(|&e| e != segment.mask.dimensions()) {
            warn!(
                label = %segment.label,
                expected = ?expected,
                actual = ?segment.mask.dimensions(),
                "Skipping segment with mismatched dimensions"
            );
            skipped.push(segment.label);
            continue;
        }

        match fused.as_mut() {
            None => fused = Some(segment.mask),
            Some(acc) => {
                if let Err(e) = acc.union_with(&segment.mask) {
                    warn!(label = %segment.label, error = %e, "Skipping segment");
                    skipped.push(segment.label);
                    continue;
                }
            }
        }

        if !classes_used.contains(&segment.label) {
            classes_used.push(segment.label);
        }
    }

    let Some(mask) = fused else {
        return Err(if skipped.is_empty() {
            FallbackReason::NoMatchingSegments
        } else {
            FallbackReason::ProviderFailure
        });
    };
    debug!(classes = ?classes_used, skipped = skipped.len(), "Fused segments");
    Ok(FusionOutcome {
        mask,
        classes_used,
        skipped,
    })
}
