//! Conversion between [`Mask`] and transportable rasters, plus ingestion of
//! the encodings the two segmentation providers return.

use std::io::{self, Cursor, Read, Write};

use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig},
        DecodePaddingMode,
    },
    Engine,
};
use flate2::{
    read::{DeflateDecoder, ZlibDecoder},
    write::ZlibEncoder,
    Compression,
};
use image::{DynamicImage, GrayAlphaImage, ImageFormat, LumaA, Rgba, RgbaImage};
use tracing::debug;

use crate::{
    error::{DecodeError, Result},
    types::Mask,
};

/// Every n-th pixel is inspected when guessing the provider's convention
pub const SAMPLE_STRIDE: usize = 13;

const CHANNEL_LOW: u8 = 50;
const CHANNEL_HIGH: u8 = 200;
const FOREGROUND_THRESHOLD: u8 = 127;
const DEGENERATE_THRESHOLD: u8 = 200;

const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Which channel of a provider raster carries the foreground signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingConvention {
    /// Foreground iff `alpha > 127`
    Alpha,
    /// Foreground iff `luminance > 127`
    Luminance,
    /// Neither channel varies; foreground iff `luminance > 200`
    Degenerate,
}

impl EncodingConvention {
    fn is_foreground(self, pixel: &Rgba<u8>) -> bool {
        match self {
            Self::Alpha => pixel[3] > FOREGROUND_THRESHOLD,
            Self::Luminance => luminance(pixel) > FOREGROUND_THRESHOLD,
            Self::Degenerate => luminance(pixel) > DEGENERATE_THRESHOLD,
        }
    }
}

/// Rec.601 luma in integer arithmetic
fn luminance(pixel: &Rgba<u8>) -> u8 {
    let [r, g, b, _] = pixel.0;
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000) as u8
}

/// Grayscale+alpha rendering: foreground 255, background 0, alpha always 255
pub fn to_luma_alpha(mask: &Mask) -> GrayAlphaImage {
    GrayAlphaImage::from_fn(mask.width(), mask.height(), |x, y| {
        LumaA([if mask.get(x, y) { 255 } else { 0 }, 255])
    })
}

/// Encode a mask as a PNG for the image synthesis provider
pub fn encode_to_image(mask: &Mask) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageLumaA8(to_luma_alpha(mask))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Inspect a sparse sample of the raster and decide which channel is informative
pub fn detect_convention(image: &RgbaImage) -> EncodingConvention {
    let (mut alpha_min, mut alpha_max) = (u8::MAX, u8::MIN);
    let (mut luma_min, mut luma_max) = (u8::MAX, u8::MIN);

    for pixel in image.pixels().step_by(SAMPLE_STRIDE) {
        let luma = luminance(pixel);
        alpha_min = alpha_min.min(pixel[3]);
        alpha_max = alpha_max.max(pixel[3]);
        luma_min = luma_min.min(luma);
        luma_max = luma_max.max(luma);
    }

    let spans = |min: u8, max: u8| min < CHANNEL_LOW && max > CHANNEL_HIGH;
    if spans(alpha_min, alpha_max) {
        EncodingConvention::Alpha
    } else if spans(luma_min, luma_max) {
        EncodingConvention::Luminance
    } else {
        EncodingConvention::Degenerate
    }
}

/// Binarize an RGBA raster using the detected convention
pub fn mask_from_rgba(image: &RgbaImage) -> Mask {
    let convention = detect_convention(image);
    debug!(?convention, width = image.width(), height = image.height(), "Decoding provider mask");

    let mut mask = Mask::new(image.width(), image.height());
    for (dst, pixel) in mask.pixels_mut().iter_mut().zip(image.pixels()) {
        *dst = u8::from(convention.is_foreground(pixel));
    }
    mask
}

/// Decode a PNG/JPEG/WebP mask returned by the segmentation provider
pub fn decode_provider_mask(bytes: &[u8]) -> std::result::Result<Mask, DecodeError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(DecodeError::EmptyRaster);
    }
    Ok(mask_from_rgba(&image))
}

fn is_zlib_stream(bytes: &[u8]) -> bool {
    match bytes {
        [cmf, flg, ..] => cmf & 0x0F == 8 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

/// Inflate at most `limit` bytes. The buffer grows with the actual output,
/// so a huge declared shape never reserves memory up front.
fn inflate(compressed: &[u8], limit: usize) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    if is_zlib_stream(compressed) {
        ZlibDecoder::new(compressed)
            .take(limit as u64)
            .read_to_end(&mut out)?;
    } else {
        DeflateDecoder::new(compressed)
            .take(limit as u64)
            .read_to_end(&mut out)?;
    }
    Ok(out)
}

/// Decode a point-prompt candidate: base64 → inflate → one byte per pixel.
///
/// Bytes past `width * height` are ignored; a shorter buffer is an error.
pub fn decode_point_prompt_mask(
    payload: &str,
    width: u32,
    height: u32,
) -> std::result::Result<Mask, DecodeError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .ok_or(DecodeError::Oversized { width, height })?;
    let cleaned: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let compressed = PAYLOAD_ENGINE.decode(cleaned)?;
    let raw = inflate(&compressed, expected)?;

    if raw.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: raw.len(),
        });
    }

    let mut mask = Mask::new(width, height);
    for (dst, &src) in mask.pixels_mut().iter_mut().zip(&raw) {
        *dst = u8::from(src != 0);
    }
    Ok(mask)
}

/// Produce a payload in the point-prompt provider's format (zlib, padded base64)
pub fn encode_point_prompt_mask(mask: &Mask) -> io::Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(mask.pixels())?;
    let compressed = encoder.finish()?;
    Ok(PAYLOAD_ENGINE.encode(compressed))
}
