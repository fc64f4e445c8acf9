use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Invalid mask: {0}")]
    Validation(String),

    #[error("Invalid mask shape: width={width}, height={height}")]
    InvalidShape { width: f64, height: f64 },

    #[error("No candidate masks returned for the point prompt")]
    NoCandidates,

    #[error("Mask dimensions differ: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Failed to decode mask: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to encode mask image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failures while turning a provider payload into a [`crate::Mask`].
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to inflate payload: {0}")]
    Inflate(#[from] std::io::Error),

    #[error("Payload too short: expected {expected} bytes, inflated {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Unreadable raster: {0}")]
    Raster(#[from] image::ImageError),

    #[error("Raster has no pixels")]
    EmptyRaster,

    #[error("Raster of {width}x{height} pixels is not addressable")]
    Oversized { width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, MaskError>;
