//! Heuristic region of interest used whenever detection is missing or untrustworthy.
//!
//! This is not a detector: it assumes the target fixtures sit in the
//! lower-middle of a typical photo.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{MaskError, Result},
    types::Mask,
};

/// Fractional band `[x_start, x_end) x [y_start, y_end)` of the frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoiBand {
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
}

impl Default for RoiBand {
    fn default() -> Self {
        Self {
            x_start: 0.15,
            x_end: 0.85,
            y_start: 0.40,
            y_end: 1.00,
        }
    }
}

/// Pixel range whose indices fall inside `[start * dim, end * dim)`, widened
/// to at least one pixel when the raster is non-empty.
fn pixel_span(start: f64, end: f64, dim: u32) -> (u32, u32) {
    // absorbs representation error such as 0.15 * 100.0 = 15.000000000000002
    const EPS: f64 = 1e-9;
    let edge = |frac: f64| ((frac * dim as f64) - EPS).ceil().clamp(0.0, dim as f64) as u32;

    let (mut lo, mut hi) = (edge(start), edge(end));
    if hi <= lo && dim > 0 {
        hi = (lo + 1).min(dim);
        lo = hi - 1;
    }
    (lo, hi)
}

impl RoiBand {
    pub fn validate(&self) -> Result<()> {
        let ok = |start: f64, end: f64| {
            start.is_finite() && end.is_finite() && 0.0 <= start && start < end && end <= 1.0
        };
        if !ok(self.x_start, self.x_end) || !ok(self.y_start, self.y_end) {
            return Err(MaskError::Config(format!(
                "fallback band must satisfy 0 <= start < end <= 1, got {:?}",
                self
            )));
        }
        Ok(())
    }

    pub fn to_mask(&self, width: u32, height: u32) -> Mask {
        let (x0, x1) = pixel_span(self.x_start, self.x_end, width);
        let (y0, y1) = pixel_span(self.y_start, self.y_end, height);
        Mask::filled_rect(width, height, x0, x1, y0, y1)
    }
}

/// The default band: 15–85% horizontally, 40–100% vertically
pub fn fallback_roi(width: u32, height: u32) -> Mask {
    RoiBand::default().to_mask(width, height)
}
