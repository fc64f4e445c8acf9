use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::{error::Result, traits::MaskProcessor, types::Mask};

/// Promote every background pixel not 4-connected to the border to foreground
pub fn fill_holes(mask: &Mask) -> Mask {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }

    // Background becomes the labelled region
    let inverted = GrayImage::from_fn(width, height, |x, y| {
        Luma([if mask.get(x, y) { 0 } else { 255 }])
    });
    let labels = connected_components(&inverted, Connectivity::Four, Luma([0u8]));
    let label_count = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;

    let mut touches_border = vec![false; label_count + 1];
    for x in 0..width {
        touches_border[labels.get_pixel(x, 0)[0] as usize] = true;
        touches_border[labels.get_pixel(x, height - 1)[0] as usize] = true;
    }
    for y in 0..height {
        touches_border[labels.get_pixel(0, y)[0] as usize] = true;
        touches_border[labels.get_pixel(width - 1, y)[0] as usize] = true;
    }

    let mut filled = mask.clone();
    let mut promoted = 0usize;
    for (dst, label) in filled.pixels_mut().iter_mut().zip(labels.pixels()) {
        let label = label[0] as usize;
        if label != 0 && !touches_border[label] {
            *dst = 1;
            promoted += 1;
        }
    }

    debug!(promoted_pixels = promoted, "Filled enclosed holes");
    filled
}

#[derive(Debug, Clone, Default)]
pub struct HoleFiller;

impl MaskProcessor for HoleFiller {
    fn name(&self) -> &'static str {
        "fill_holes"
    }

    fn process(&self, mask: Mask) -> Result<Mask> {
        Ok(fill_holes(&mask))
    }
}
