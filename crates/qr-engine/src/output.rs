//! Encoded image values produced by the encoder and the compositor.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::QrError;
use crate::logo::DecodeFailure;
use crate::rasterize;

/// Image encoding of an [`EncodedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG pixels.
    #[default]
    Raster,
    /// SVG markup.
    Vector,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raster => f.write_str("raster"),
            Self::Vector => f.write_str("vector"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raster" | "png" => Ok(Self::Raster),
            "vector" | "svg" => Ok(Self::Vector),
            other => Err(QrError::InvalidParameter(format!(
                "unknown output format {other:?}"
            ))),
        }
    }
}

/// An immutable encoded image plus its format and nominal square width.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data: Vec<u8>,
    format: OutputFormat,
    pixel_width: u32,
}

impl EncodedImage {
    /// Wrap PNG bytes.
    pub fn raster(png: Vec<u8>, pixel_width: u32) -> Self {
        Self {
            data: png,
            format: OutputFormat::Raster,
            pixel_width,
        }
    }

    /// Wrap SVG markup.
    pub fn vector(svg: String, pixel_width: u32) -> Self {
        Self {
            data: svg.into_bytes(),
            format: OutputFormat::Vector,
            pixel_width,
        }
    }

    /// Encode an RGBA buffer as PNG.
    pub fn from_rgba(img: &RgbaImage) -> Result<Self, QrError> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(Self::raster(buf, img.width()))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    pub fn is_raster(&self) -> bool {
        self.format == OutputFormat::Raster
    }

    /// SVG markup, if this is a vector image.
    pub fn as_svg(&self) -> Option<&str> {
        match self.format {
            OutputFormat::Vector => std::str::from_utf8(&self.data).ok(),
            OutputFormat::Raster => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self.format {
            OutputFormat::Raster => "image/png",
            OutputFormat::Vector => "image/svg+xml",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self.format {
            OutputFormat::Raster => "png",
            OutputFormat::Vector => "svg",
        }
    }

    /// Embeddable `data:` URL, as used by `<img src>` previews.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.data))
    }

    /// Decode into a `pixel_width × pixel_width` RGBA buffer.
    ///
    /// Vector images are rasterized at their nominal width.
    pub fn to_rgba(&self) -> Result<RgbaImage, DecodeFailure> {
        match self.format {
            OutputFormat::Raster => Ok(image::load_from_memory(&self.data)?.to_rgba8()),
            OutputFormat::Vector => {
                let svg = std::str::from_utf8(&self.data)
                    .map_err(|e| DecodeFailure::Rasterize(e.to_string()))?;
                rasterize::rasterize_svg(svg, self.pixel_width)
            }
        }
    }

    /// Convert to a raster image. Raster images are returned as a copy.
    pub fn rasterize(&self) -> Result<EncodedImage, DecodeFailure> {
        match self.format {
            OutputFormat::Raster => Ok(self.clone()),
            OutputFormat::Vector => {
                let pixels = self.to_rgba()?;
                Self::from_rgba(&pixels).map_err(|e| DecodeFailure::Rasterize(e.to_string()))
            }
        }
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("format", &self.format)
            .field("pixel_width", &self.pixel_width)
            .field("bytes", &self.data.len())
            .finish()
    }
}
