//! QR code generation with optional logo watermarking.
//!
//! The [`qr`] module turns a payload into a PNG or SVG symbol at an exact
//! pixel width. The [`watermark`] module overlays a logo in the middle of an
//! encoded symbol without ever failing the overall generation, and
//! [`generate`] ties the two together.

pub mod color;
pub mod generate;
pub mod logo;
pub mod output;
pub mod qr;
pub mod rasterize;
pub mod style;
pub mod surface;
pub mod watermark;

// Re-exports for convenience
pub use color::Color;
pub use generate::{GenerateRequest, generate};
pub use logo::{DecodeFailure, LogoSource};
pub use output::{EncodedImage, OutputFormat};
pub use qr::{EncodeRequest, Symbol, SymbolInfo, encode, encode_symbol};
pub use style::{ErrorCorrection, QrStyle};
pub use surface::{RgbaSurface, Surface};
pub use watermark::{Compositor, LogoGeometry, WatermarkConfig, WatermarkRequest};

/// Errors that block generation and are reported to the caller.
///
/// Logo problems never surface here; see [`DecodeFailure`].
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("Payload of {len} bytes is too long to encode at error correction level {level}")]
    Encoding { len: usize, level: ErrorCorrection },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Image export error: {0}")]
    Export(#[from] image::ImageError),
}

/// Result type alias for qr-engine operations.
pub type Result<T> = std::result::Result<T, QrError>;
