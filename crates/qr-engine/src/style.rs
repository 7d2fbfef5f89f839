//! Styling options shared by the encoder and the generation pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::QrError;
use crate::color::Color;
use crate::output::OutputFormat;

/// Default quiet-zone width in modules (the QR standard minimum).
pub const DEFAULT_MARGIN: u32 = 4;

/// Default rendered width in pixels.
pub const DEFAULT_PIXEL_WIDTH: u32 = 200;

/// Largest accepted width in pixels. A raster at this width is 256 MiB.
pub const MAX_PIXEL_WIDTH: u32 = 8192;

/// QR error-correction strength.
///
/// Higher levels recover from more damage at the cost of capacity:
/// roughly 7%, 15%, 25% and 30% of codewords respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
    Low,
    #[default]
    Medium,
    Quartile,
    High,
}

impl ErrorCorrection {
    pub(crate) fn to_ec_level(self) -> qrcode::EcLevel {
        match self {
            Self::Low => qrcode::EcLevel::L,
            Self::Medium => qrcode::EcLevel::M,
            Self::Quartile => qrcode::EcLevel::Q,
            Self::High => qrcode::EcLevel::H,
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::Low => "L",
            Self::Medium => "M",
            Self::Quartile => "Q",
            Self::High => "H",
        };
        f.write_str(letter)
    }
}

impl FromStr for ErrorCorrection {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Self::Low),
            "m" | "medium" => Ok(Self::Medium),
            "q" | "quartile" => Ok(Self::Quartile),
            "h" | "high" => Ok(Self::High),
            other => Err(QrError::InvalidParameter(format!(
                "unknown error correction level {other:?}"
            ))),
        }
    }
}

/// Visual and format options for one generated code.
///
/// Deserializes from the camelCase style objects the dashboard sends, e.g.
/// `{"pixelWidth": 300, "moduleColor": "#1d4ed8"}`. Missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QrStyle {
    pub pixel_width: u32,
    pub module_color: Color,
    pub background_color: Color,
    pub margin_modules: u32,
    pub error_correction: ErrorCorrection,
    pub output_format: OutputFormat,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            pixel_width: DEFAULT_PIXEL_WIDTH,
            module_color: Color::BLACK,
            background_color: Color::WHITE,
            margin_modules: DEFAULT_MARGIN,
            error_correction: ErrorCorrection::default(),
            output_format: OutputFormat::default(),
        }
    }
}

impl QrStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the output width in pixels.
    pub fn with_pixel_width(mut self, val: u32) -> Self {
        self.pixel_width = val;
        self
    }

    /// Builder: set the color of dark modules.
    pub fn with_module_color(mut self, val: Color) -> Self {
        self.module_color = val;
        self
    }

    /// Builder: set the color of light modules and the quiet zone.
    pub fn with_background_color(mut self, val: Color) -> Self {
        self.background_color = val;
        self
    }

    /// Builder: set the quiet-zone width in modules.
    pub fn with_margin(mut self, val: u32) -> Self {
        self.margin_modules = val;
        self
    }

    /// Builder: set the requested error-correction level.
    pub fn with_error_correction(mut self, val: ErrorCorrection) -> Self {
        self.error_correction = val;
        self
    }

    /// Builder: set the output encoding.
    pub fn with_output_format(mut self, val: OutputFormat) -> Self {
        self.output_format = val;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_correction_parses_names_and_letters() {
        assert_eq!("H".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::High);
        assert_eq!(
            "quartile".parse::<ErrorCorrection>().unwrap(),
            ErrorCorrection::Quartile
        );
        assert_eq!(" low ".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::Low);
        assert!("x".parse::<ErrorCorrection>().is_err());
    }

    #[test]
    fn style_defaults() {
        let style = QrStyle::default();
        assert_eq!(style.pixel_width, 200);
        assert_eq!(style.margin_modules, 4);
        assert_eq!(style.module_color, Color::BLACK);
        assert_eq!(style.background_color, Color::WHITE);
        assert_eq!(style.error_correction, ErrorCorrection::Medium);
        assert_eq!(style.output_format, OutputFormat::Raster);
    }

    #[test]
    fn style_deserializes_partial_camel_case() {
        let style: QrStyle = serde_json::from_str(
            r##"{"pixelWidth": 320, "moduleColor": "#1d4ed8", "errorCorrection": "quartile", "outputFormat": "vector"}"##,
        )
        .unwrap();
        assert_eq!(style.pixel_width, 320);
        assert_eq!(style.module_color, Color::rgb(0x1d, 0x4e, 0xd8));
        assert_eq!(style.background_color, Color::WHITE);
        assert_eq!(style.error_correction, ErrorCorrection::Quartile);
        assert_eq!(style.output_format, OutputFormat::Vector);
    }

    #[test]
    fn style_rejects_bad_color() {
        let result = serde_json::from_str::<QrStyle>(r##"{"moduleColor": "#12"}"##);
        assert!(result.is_err());
    }
}
