//! # Inpainting Mask Engine
//!
//! Builds the binary masks that tell an inpainting model which pixels to
//! regenerate (1) and which to preserve (0).
//!
//! Two routes end in a single [`Mask`]:
//!
//! - **Automatic detection**: labelled provider segments are filtered by a
//!   vocabulary, unioned, cleaned (small components removed, holes filled,
//!   dilated) and checked against coverage gates. Anything suspicious falls
//!   back to a heuristic region, so this route never fails.
//! - **Point prompt**: the provider's candidates for one click are ranked by
//!   stability score then IoU and the winner is decoded as-is.
//!
//! Everything here is synchronous and CPU-only; fetching rasters from the
//! providers lives in the `providers` crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mask::{AutoMaskPipeline, LabeledSegment, codec};
//!
//! let pipeline = AutoMaskPipeline::default();
//!
//! let bytes = std::fs::read("countertop.png")?;
//! let segment = LabeledSegment {
//!     label: "countertop".to_string(),
//!     mask: codec::decode_provider_mask(&bytes)?,
//!     score: None,
//! };
//! let (width, height) = segment.mask.dimensions();
//!
//! let output = pipeline.run(vec![segment], width, height);
//! std::fs::write("inpaint_mask.png", output.encode_png()?)?;
//! println!("{:?}", output.report);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust
//! use mask::{AutoMaskPipeline, LabelVocabulary};
//!
//! let pipeline = AutoMaskPipeline::builder()
//!     .with_label_matcher(LabelVocabulary::new(["bathtub"], ["vanity", "shower"]))
//!     .with_min_component_size(200)
//!     .with_hole_filling(true)
//!     .with_dilation(4)
//!     .build();
//! assert!(pipeline.info().contains("dilate"));
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod codec;
pub mod config;
pub mod fusion;
pub mod fallback;
pub mod pipeline;
pub mod selector;

// Re-exports for convenience
pub use error::{DecodeError, MaskError, Result};
pub use types::{
    CandidateMask, CoverageReport, FallbackReason, LabeledSegment, Mask, PointPromptResponse,
};
pub use traits::*;
pub use algorithms::*;
pub use codec::{decode_point_prompt_mask, decode_provider_mask, encode_to_image};
pub use config::AutoMaskConfig;
pub use fusion::{fuse, fuse_into_frame, union, FusionOutcome, LabelVocabulary};
pub use fallback::{fallback_roi, RoiBand};
pub use pipeline::{builder::PipelineBuilder, AutoMaskOutput, AutoMaskPipeline};
pub use selector::{select_point_mask, SelectedMask};

#[cfg(test)]
mod tests {
    use super::*;

    /// xorshift-driven masks with a mix of specks, blobs and rings
    fn sample_masks() -> Vec<Mask> {
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let mut masks = Vec::new();
        for (width, height, density) in [(1, 1, 2), (7, 5, 2), (23, 17, 3), (40, 31, 5), (64, 64, 9)] {
            for _ in 0..4 {
                let pixels = (0..width * height)
                    .map(|_| u8::from(next() % density == 0))
                    .collect();
                masks.push(Mask::from_pixels(width, height, pixels).expect("Should be valid"));
            }
        }

        let mut ring = Mask::filled_rect(30, 30, 5, 25, 5, 25);
        for y in 8..22 {
            for x in 8..22 {
                ring.set(x, y, false);
            }
        }
        masks.push(ring);
        masks
    }

    #[test]
    fn test_fill_holes_is_idempotent() {
        for mask in sample_masks() {
            let once = fill_holes(&mask);
            assert_eq!(fill_holes(&once), once);
            assert!(mask.is_subset_of(&once));
        }
    }

    #[test]
    fn test_remove_small_components_is_idempotent() {
        for mask in sample_masks() {
            for threshold in [0, 1, 2, 5, 30, 350] {
                let once = remove_small_components(&mask, threshold);
                assert_eq!(remove_small_components(&once, threshold), once);
                assert!(once.is_subset_of(&mask));
            }
        }
    }

    #[test]
    fn test_dilation_grows_monotonically() {
        for mask in sample_masks() {
            assert_eq!(dilate(&mask, 0), mask);
            let mut previous = mask.clone();
            for radius in 1..=5 {
                let grown = dilate(&mask, radius);
                assert!(previous.is_subset_of(&grown), "radius {}", radius);
                previous = grown;
            }
        }
    }

    #[test]
    fn test_union_laws() {
        let masks: Vec<Mask> = sample_masks()
            .into_iter()
            .filter(|m| m.dimensions() == (64, 64))
            .collect();
        for a in &masks {
            for b in &masks {
                let ab = union(a, b).expect("Should union");
                assert_eq!(ab, union(b, a).expect("Should union"));
                for c in &masks {
                    let left = union(a, &union(b, c).expect("Should union")).expect("Should union");
                    let right = union(&ab, c).expect("Should union");
                    assert_eq!(left, right);
                }
            }
        }
    }

    #[test]
    fn test_coverage_within_bounds() {
        for mask in sample_masks() {
            let report = CoverageReport::measure(&mask, vec![]);
            assert!((0.0..=100.0).contains(&report.coverage_pct));
            assert!(report.white_pixel_count <= report.total_pixel_count);
        }
    }

    #[test]
    fn test_point_prompt_round_trip_on_samples() {
        for mask in sample_masks() {
            let payload = codec::encode_point_prompt_mask(&mask).expect("Should encode");
            let decoded = decode_point_prompt_mask(&payload, mask.width(), mask.height())
                .expect("Should decode");
            assert_eq!(decoded, mask);
        }
    }
}
