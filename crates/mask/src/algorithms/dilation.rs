use crate::{error::Result, traits::MaskProcessor, types::Mask};

/// Sliding-window OR over `[i - radius, i + radius]` along one line.
///
/// The line is the `len` elements of `src` starting at `offset` spaced by
/// `stride`; results are written to the same positions of `dst`.
fn dilate_line(src: &[u8], dst: &mut [u8], offset: usize, stride: usize, len: usize, radius: usize) {
    let at = |i: usize| offset + i * stride;

    let mut count: usize = (0..=radius.min(len - 1)).map(|j| src[at(j)] as usize).sum();
    for i in 0..len {
        dst[at(i)] = u8::from(count > 0);
        let entering = i + radius + 1;
        if entering < len {
            count += src[at(entering)] as usize;
        }
        if i >= radius {
            count -= src[at(i - radius)] as usize;
        }
    }
}

/// Square dilation as two separable box-max passes.
///
/// Runs in O(width * height) for any radius. `radius == 0` returns the input.
pub fn dilate(mask: &Mask, radius: u32) -> Mask {
    let (width, height) = (mask.width() as usize, mask.height() as usize);
    if radius == 0 || width == 0 || height == 0 {
        return mask.clone();
    }
    let radius = radius as usize;

    let mut horizontal = vec![0u8; width * height];
    for y in 0..height {
        dilate_line(mask.pixels(), &mut horizontal, y * width, 1, width, radius);
    }

    let mut out = Mask::new(mask.width(), mask.height());
    for x in 0..width {
        dilate_line(&horizontal, out.pixels_mut(), x, width, height, radius);
    }
    out
}

#[derive(Debug, Clone)]
pub struct BoxDilation {
    pub radius: u32,
}

impl MaskProcessor for BoxDilation {
    fn name(&self) -> &'static str {
        "dilate"
    }

    fn process(&self, mask: Mask) -> Result<Mask> {
        Ok(dilate(&mask, self.radius))
    }
}
