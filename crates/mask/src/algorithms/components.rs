use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::{error::Result, traits::MaskProcessor, types::Mask};

/// Clear every 4-connected foreground component smaller than `min_size` pixels
pub fn remove_small_components(mask: &Mask, min_size: usize) -> Mask {
    if min_size <= 1 || mask.total_count() == 0 {
        return mask.clone();
    }

    let labels = connected_components(&mask.to_gray_image(), Connectivity::Four, Luma([0u8]));
    let label_count = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;

    let mut sizes = vec![0usize; label_count + 1];
    for label in labels.pixels() {
        sizes[label[0] as usize] += 1;
    }

    let mut cleaned = mask.clone();
    let mut removed = 0usize;
    for (dst, label) in cleaned.pixels_mut().iter_mut().zip(labels.pixels()) {
        let label = label[0] as usize;
        if label != 0 && sizes[label] < min_size {
            *dst = 0;
            removed += 1;
        }
    }

    debug!(components = label_count, removed_pixels = removed, min_size, "Removed small components");
    cleaned
}

/// Processor wrapper around [`remove_small_components`]
#[derive(Debug, Clone)]
pub struct SmallComponentFilter {
    pub min_size: usize,
}

impl Default for SmallComponentFilter {
    fn default() -> Self {
        Self { min_size: 350 }
    }
}

impl MaskProcessor for SmallComponentFilter {
    fn name(&self) -> &'static str {
        "remove_small_components"
    }

    fn process(&self, mask: Mask) -> Result<Mask> {
        Ok(remove_small_components(&mask, self.min_size))
    }
}
