//! Choosing one mask out of the point-prompt provider's candidates.

use std::cmp::Ordering;

use tracing::debug;

use crate::{
    codec::decode_point_prompt_mask,
    error::{MaskError, Result},
    types::{CandidateMask, CoverageReport, Mask, PointPromptResponse},
};

const MISSING_SCORE: f64 = -1.0;

/// Tag reported for masks produced by this route
pub const POINT_PROMPT_CLASS: &str = "point_prompt";

fn score(value: Option<f64>) -> f64 {
    value.filter(|v| !v.is_nan()).unwrap_or(MISSING_SCORE)
}

/// Ordering that puts the better candidate first: higher stability, then higher IoU
pub fn compare_candidates(a: &CandidateMask, b: &CandidateMask) -> Ordering {
    score(b.stability_score)
        .total_cmp(&score(a.stability_score))
        .then_with(|| score(b.iou).total_cmp(&score(a.iou)))
}

/// Index of the best candidate; the earliest wins a complete tie
pub fn best_candidate(candidates: &[CandidateMask]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| compare_candidates(a, b))
        .map(|(index, _)| index)
}

/// The winning candidate, decoded
#[derive(Debug, Clone)]
pub struct SelectedMask {
    pub index: usize,
    pub mask: Mask,
    pub stability_score: f64,
    pub iou: f64,
}

impl SelectedMask {
    pub fn report(&self) -> CoverageReport {
        CoverageReport::measure(&self.mask, vec![POINT_PROMPT_CLASS.to_string()])
    }
}

/// Pick and decode the best candidate. No morphological cleaning is applied.
pub fn select_point_mask(response: &PointPromptResponse) -> Result<SelectedMask> {
    let index = best_candidate(&response.mask_details).ok_or(MaskError::NoCandidates)?;
    let (width, height) = response.dimensions()?;
    let candidate = &response.mask_details[index];

    debug!(
        index,
        candidates = response.mask_details.len(),
        stability_score = ?candidate.stability_score,
        iou = ?candidate.iou,
        "Selected point-prompt candidate"
    );

    let mask = decode_point_prompt_mask(&candidate.encoded_payload, width, height)?;
    Ok(SelectedMask {
        index,
        mask,
        stability_score: score(candidate.stability_score),
        iou: score(candidate.iou),
    })
}
