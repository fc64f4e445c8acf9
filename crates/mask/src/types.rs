use image::{GrayImage, Luma};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::error::{MaskError, Result};

/// Binary raster marking pixels to regenerate (1) or preserve (0).
///
/// Row-major, origin top-left. Every element is exactly 0 or 1 and the
/// buffer always holds `width * height` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Mask {
    /// Create an all-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap an existing 0/1 buffer, validating its length and domain
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(MaskError::Validation(format!(
                "expected {} pixels for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        if let Some(bad) = pixels.iter().find(|&&p| p > 1) {
            return Err(MaskError::Validation(format!(
                "pixel value {} is not 0 or 1",
                bad
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Mask with foreground on the half-open rectangle `[x0, x1) x [y0, y1)`.
    /// Bounds are clamped to the raster.
    pub fn filled_rect(width: u32, height: u32, x0: u32, x1: u32, y0: u32, y1: u32) -> Self {
        let mut mask = Self::new(width, height);
        let (x1, y1) = (x1.min(width), y1.min(height));
        for y in y0.min(y1)..y1 {
            let row = y as usize * width as usize;
            mask.pixels[row + x0.min(x1) as usize..row + x1 as usize].fill(1);
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Whether `(x, y)` is foreground. Out-of-bounds reads are background.
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.pixels[self.index(x, y)] == 1
    }

    /// Set `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.pixels[idx] = u8::from(foreground);
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn foreground_count(&self) -> u64 {
        self.pixels.iter().filter(|&&p| p == 1).count() as u64
    }

    pub fn total_count(&self) -> u64 {
        self.pixels.len() as u64
    }

    /// Foreground share of the raster in percent, `0.0` for an empty raster
    pub fn coverage_pct(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }
        self.foreground_count() as f64 / total as f64 * 100.0
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }

    /// Pixelwise OR of `other` into `self`
    pub fn union_with(&mut self, other: &Mask) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(MaskError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        for (dst, &src) in self.pixels.iter_mut().zip(&other.pixels) {
            *dst |= src;
        }
        Ok(())
    }

    /// Every foreground pixel of `self` is also foreground in `other`
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.dimensions() == other.dimensions()
            && self
                .pixels
                .iter()
                .zip(&other.pixels)
                .all(|(&a, &b)| a <= b)
    }

    /// Binarize a grayscale raster: any non-zero pixel is foreground
    pub fn from_gray_image(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.pixels().map(|p| u8::from(p[0] != 0)).collect(),
        }
    }

    /// Render as a 0/255 grayscale raster
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }
}

/// A labelled region returned by the segmentation provider, with its
/// raster already fetched and decoded.
#[derive(Debug, Clone)]
pub struct LabeledSegment {
    pub label: String,
    pub mask: Mask,
    pub score: Option<f64>,
}

/// One candidate from the point-prompt provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMask {
    /// base64(deflate(one byte per pixel))
    #[serde(rename = "segmentation")]
    pub encoded_payload: String,
    #[serde(default)]
    pub stability_score: Option<f64>,
    #[serde(default)]
    pub iou: Option<f64>,
    #[serde(default)]
    pub area: Option<f64>,
}

/// Point-prompt provider response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPromptResponse {
    /// `[height, width]` of every candidate raster
    pub shapes: Vec<f64>,
    pub mask_details: Vec<CandidateMask>,
}

impl PointPromptResponse {
    /// Validated `(width, height)` of the candidate rasters
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        let (height, width) = match self.shapes.as_slice() {
            [h, w, ..] => (*h, *w),
            _ => (f64::NAN, f64::NAN),
        };
        let valid = |v: f64| v.is_finite() && v >= 1.0 && v.fract() == 0.0 && v <= u32::MAX as f64;
        if !valid(width) || !valid(height) {
            return Err(MaskError::InvalidShape { width, height });
        }
        Ok((width as u32, height as u32))
    }
}

/// Why the pipeline returned the heuristic region instead of a detection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema,
    Display, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FallbackReason {
    /// No provider label matched the vocabulary
    NoMatchingSegments,
    /// Post-processing removed every foreground pixel
    EmptyAfterPostprocess,
    /// The mask covers implausibly much of the frame
    OverCoverage,
    /// The provider call failed, timed out or returned garbage
    ProviderFailure,
}

impl FallbackReason {
    /// Tag reported in [`CoverageReport::classes_used`]
    pub fn tag(self) -> &'static str {
        match self {
            Self::NoMatchingSegments => "roi_fallback",
            Self::EmptyAfterPostprocess => "roi_fallback_empty",
            Self::OverCoverage => "roi_fallback_overcoverage",
            Self::ProviderFailure => "roi_fallback_provider_error",
        }
    }
}

/// Diagnostics attached to a final mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub white_pixel_count: u64,
    pub total_pixel_count: u64,
    pub coverage_pct: f64,
    pub classes_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
}

impl CoverageReport {
    pub fn measure(mask: &Mask, classes_used: Vec<String>) -> Self {
        Self {
            white_pixel_count: mask.foreground_count(),
            total_pixel_count: mask.total_count(),
            coverage_pct: mask.coverage_pct(),
            classes_used,
            fallback: None,
        }
    }

    pub fn for_fallback(mask: &Mask, reason: FallbackReason) -> Self {
        Self {
            fallback: Some(reason),
            ..Self::measure(mask, vec![reason.tag().to_string()])
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}
