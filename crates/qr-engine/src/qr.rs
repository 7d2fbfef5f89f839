//! QR symbol encoding and rendering.
//!
//! A payload is first turned into a module matrix ([`Symbol`]) at the
//! smallest version that fits the requested error-correction level, then
//! rendered to PNG or SVG at an exact pixel width.

use std::fmt::Write as _;

use image::RgbaImage;
use qrcode::types::QrError as SymbolError;
use qrcode::{QrCode, Version};
use tracing::debug;

use crate::output::{EncodedImage, OutputFormat};
use crate::style::{ErrorCorrection, MAX_PIXEL_WIDTH, QrStyle};
use crate::surface::RgbaSurface;
use crate::{QrError, Result};

/// A payload plus the style it should be rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    pub payload: String,
    pub style: QrStyle,
}

impl EncodeRequest {
    pub fn new(payload: impl Into<String>, style: QrStyle) -> Self {
        Self {
            payload: payload.into(),
            style,
        }
    }
}

/// Diagnostics about the chosen symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolInfo {
    /// QR version, 1..=40.
    pub version: i16,
    /// Modules per side, excluding the quiet zone.
    pub modules: u32,
    pub error_correction: ErrorCorrection,
}

/// An encoded QR module matrix, independent of any output format.
#[derive(Debug, Clone)]
pub struct Symbol {
    width: u32,
    dark: Vec<bool>,
    info: SymbolInfo,
}

/// Encode `payload` into a module matrix.
///
/// Fails with [`QrError::Encoding`] when the payload does not fit even the
/// largest version at `level`.
pub fn encode_symbol(payload: &str, level: ErrorCorrection) -> Result<Symbol> {
    if payload.is_empty() {
        return Err(QrError::InvalidParameter("payload must not be empty".into()));
    }

    let code = QrCode::with_error_correction_level(payload.as_bytes(), level.to_ec_level())
        .map_err(|e| match e {
            SymbolError::DataTooLong => QrError::Encoding {
                len: payload.len(),
                level,
            },
            other => QrError::InvalidParameter(format!("cannot encode payload: {other}")),
        })?;

    let version = match code.version() {
        Version::Normal(v) | Version::Micro(v) => v,
    };
    let width = code.width() as u32;
    let dark = code
        .to_colors()
        .into_iter()
        .map(|c| c == qrcode::Color::Dark)
        .collect();

    debug!(version, modules = width, level = %level, "Encoded QR symbol");

    Ok(Symbol {
        width,
        dark,
        info: SymbolInfo {
            version,
            modules: width,
            error_correction: level,
        },
    })
}

/// Encode and render a request in its requested output format.
pub fn encode(request: &EncodeRequest) -> Result<EncodedImage> {
    if request.style.pixel_width == 0 {
        return Err(QrError::InvalidParameter("pixel width must be positive".into()));
    }

    let symbol = encode_symbol(&request.payload, request.style.error_correction)?;
    match request.style.output_format {
        OutputFormat::Raster => symbol.render_raster(&request.style),
        OutputFormat::Vector => symbol.render_vector(&request.style),
    }
}

impl Symbol {
    pub fn info(&self) -> SymbolInfo {
        self.info
    }

    /// Modules per side, excluding the quiet zone.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Whether the module at `(x, y)` is dark. Out-of-range modules are light.
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.width && self.dark[(y * self.width + x) as usize]
    }

    /// Modules per side including a quiet zone of `margin` modules, or
    /// `None` if that does not fit in a `u32`.
    pub fn total_modules(&self, margin: u32) -> Option<u32> {
        margin.checked_mul(2)?.checked_add(self.width)
    }

    fn is_dark_in_frame(&self, x: u32, y: u32, margin: u32) -> bool {
        x >= margin && y >= margin && self.is_dark(x - margin, y - margin)
    }

    fn check_fits(&self, style: &QrStyle) -> Result<u32> {
        if style.pixel_width > MAX_PIXEL_WIDTH {
            return Err(QrError::InvalidParameter(format!(
                "pixel width {} exceeds the maximum of {MAX_PIXEL_WIDTH}",
                style.pixel_width
            )));
        }
        let total = self.total_modules(style.margin_modules).ok_or_else(|| {
            QrError::InvalidParameter(format!(
                "margin of {} modules is too large",
                style.margin_modules
            ))
        })?;
        if style.pixel_width < total {
            return Err(QrError::InvalidParameter(format!(
                "pixel width {} is smaller than the {total} modules of a version {} symbol",
                style.pixel_width, self.info.version
            )));
        }
        Ok(total)
    }

    /// Render to an RGBA buffer of exactly `pixel_width × pixel_width`.
    ///
    /// Pixel `p` maps to module `floor(p · total / pixel_width)`, so modules
    /// differ by at most one pixel when the width is not a multiple of the
    /// module count.
    pub fn to_rgba(&self, style: &QrStyle) -> Result<RgbaImage> {
        let total = self.check_fits(style)?;
        let width = style.pixel_width;
        let margin = style.margin_modules;
        let dark = style.module_color.to_rgba();
        let light = style.background_color.to_rgba();

        let to_module = |p: u32| (u64::from(p) * u64::from(total) / u64::from(width)) as u32;

        let mut img = RgbaSurface::try_new(width, width)
            .ok_or_else(|| {
                QrError::InvalidParameter(format!(
                    "cannot allocate a {width}x{width} raster"
                ))
            })?
            .into_image();
        for (px, py, pixel) in img.enumerate_pixels_mut() {
            *pixel = if self.is_dark_in_frame(to_module(px), to_module(py), margin) {
                dark
            } else {
                light
            };
        }
        Ok(img)
    }

    /// Render as PNG.
    pub fn render_raster(&self, style: &QrStyle) -> Result<EncodedImage> {
        let pixels = self.to_rgba(style)?;
        EncodedImage::from_rgba(&pixels)
    }

    /// Render as SVG with one unit per module.
    ///
    /// Horizontal runs of dark modules are merged into single subpaths.
    pub fn render_vector(&self, style: &QrStyle) -> Result<EncodedImage> {
        let total = self.check_fits(style)?;
        let margin = style.margin_modules;

        let mut path = String::new();
        for y in 0..self.width {
            let mut x = 0;
            while x < self.width {
                if !self.is_dark(x, y) {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < self.width && self.is_dark(x, y) {
                    x += 1;
                }
                let run = x - start;
                let _ = write!(path, "M{} {}h{run}v1h-{run}z", start + margin, y + margin);
            }
        }

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{w}" viewBox="0 0 {total} {total}" shape-rendering="crispEdges">"#,
            w = style.pixel_width
        );
        if style.background_color.a > 0 {
            let _ = write!(
                svg,
                r#"<path{} d="M0 0h{total}v{total}H0z"/>"#,
                fill_attrs(style.background_color)
            );
        }
        if !path.is_empty() {
            let _ = write!(
                svg,
                r#"<path{} d="{path}"/>"#,
                fill_attrs(style.module_color)
            );
        }
        svg.push_str("</svg>\n");

        Ok(EncodedImage::vector(svg, style.pixel_width))
    }
}

fn fill_attrs(color: crate::Color) -> String {
    if color.is_opaque() {
        format!(r#" fill="{}""#, color.to_hex_rgb())
    } else {
        format!(
            r#" fill="{}" fill-opacity="{:.3}""#,
            color.to_hex_rgb(),
            color.opacity()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use image::Rgba;

    /// Pixel coordinate at the center of frame module `m`.
    fn module_center(m: u32, total: u32, width: u32) -> u32 {
        (2 * m + 1) * width / (2 * total)
    }

    fn raster_style(width: u32) -> QrStyle {
        QrStyle::default()
            .with_pixel_width(width)
            .with_error_correction(ErrorCorrection::High)
    }

    #[test]
    fn encode_produces_exact_square_png() {
        let request = EncodeRequest::new("https://example.com", raster_style(200));
        let img = encode(&request).unwrap();
        assert!(img.is_raster());
        assert_eq!(img.pixel_width(), 200);
        let pixels = img.to_rgba().unwrap();
        assert_eq!(pixels.dimensions(), (200, 200));
    }

    #[test]
    fn short_payload_picks_small_version() {
        let symbol = encode_symbol("test", ErrorCorrection::Low).unwrap();
        assert_eq!(symbol.info().version, 1);
        assert_eq!(symbol.width(), 21);
    }

    #[test]
    fn higher_level_needs_larger_symbol() {
        let payload = "https://lunr.to/abc123";
        let low = encode_symbol(payload, ErrorCorrection::Low).unwrap();
        let high = encode_symbol(payload, ErrorCorrection::High).unwrap();
        assert!(high.info().version > low.info().version);
        assert_eq!(high.info().error_correction, ErrorCorrection::High);
    }

    #[test]
    fn raster_places_modules_and_quiet_zone() {
        let style = raster_style(200)
            .with_module_color(Color::rgb(0, 0, 255))
            .with_background_color(Color::rgb(255, 255, 0));
        let symbol = encode_symbol("https://lunr.to/abc123", style.error_correction).unwrap();
        let img = symbol.to_rgba(&style).unwrap();
        let total = symbol.total_modules(4).unwrap();

        // Quiet zone corners are background.
        assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 0, 255]));
        assert_eq!(*img.get_pixel(199, 199), Rgba([255, 255, 0, 255]));

        // Finder pattern: dark outer ring, light separator ring, dark core.
        let c = |m| module_center(m, total, 200);
        assert_eq!(*img.get_pixel(c(4), c(4)), Rgba([0, 0, 255, 255]));
        assert_eq!(*img.get_pixel(c(5), c(5)), Rgba([255, 255, 0, 255]));
        assert_eq!(*img.get_pixel(c(7), c(7)), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn raster_matches_matrix_everywhere() {
        let style = raster_style(300).with_margin(2);
        let symbol = encode_symbol("matrix check", style.error_correction).unwrap();
        let img = symbol.to_rgba(&style).unwrap();
        let total = symbol.total_modules(2).unwrap();
        for my in 0..symbol.width() {
            for mx in 0..symbol.width() {
                let px = module_center(mx + 2, total, 300);
                let py = module_center(my + 2, total, 300);
                let expected = if symbol.is_dark(mx, my) { 0 } else { 255 };
                assert_eq!(img.get_pixel(px, py)[0], expected, "module ({mx}, {my})");
            }
        }
    }

    #[test]
    fn transparent_background_is_preserved() {
        let style = raster_style(100).with_background_color(Color::rgba(0, 0, 0, 0));
        let img = encode(&EncodeRequest::new("alpha", style)).unwrap();
        let pixels = img.to_rgba().unwrap();
        assert_eq!(pixels.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn zero_margin_starts_with_finder() {
        let style = raster_style(210).with_margin(0);
        let img = encode(&EncodeRequest::new("edge", style)).unwrap();
        let pixels = img.to_rgba().unwrap();
        assert_eq!(*pixels.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn rejects_empty_payload_and_bad_width() {
        let empty = EncodeRequest::new("", raster_style(200));
        assert!(matches!(encode(&empty), Err(QrError::InvalidParameter(_))));

        let zero = EncodeRequest::new("x", raster_style(0));
        assert!(matches!(encode(&zero), Err(QrError::InvalidParameter(_))));

        // Version 1 with a 4-module margin needs 29 pixels.
        let narrow = EncodeRequest::new(
            "x",
            raster_style(28).with_error_correction(ErrorCorrection::Low),
        );
        assert!(matches!(encode(&narrow), Err(QrError::InvalidParameter(_))));
        let just_fits = EncodeRequest::new(
            "x",
            raster_style(29).with_error_correction(ErrorCorrection::Low),
        );
        assert!(encode(&just_fits).is_ok());
    }

    #[test]
    fn huge_margin_is_invalid_parameter() {
        let symbol = encode_symbol("x", ErrorCorrection::Low).unwrap();
        assert_eq!(symbol.total_modules(u32::MAX / 2 + 1), None);

        for format in [OutputFormat::Raster, OutputFormat::Vector] {
            let style = raster_style(200)
                .with_margin(u32::MAX / 2 + 1)
                .with_output_format(format);
            let result = encode(&EncodeRequest::new("x", style));
            assert!(
                matches!(result, Err(QrError::InvalidParameter(_))),
                "{format}"
            );
        }
    }

    #[test]
    fn width_above_maximum_is_invalid_parameter() {
        for width in [MAX_PIXEL_WIDTH + 1, u32::MAX] {
            let result = encode(&EncodeRequest::new("x", raster_style(width)));
            assert!(matches!(result, Err(QrError::InvalidParameter(_))), "{width}");
        }

        let vector = raster_style(u32::MAX).with_output_format(OutputFormat::Vector);
        assert!(matches!(
            encode(&EncodeRequest::new("x", vector)),
            Err(QrError::InvalidParameter(_))
        ));
    }

    #[test]
    fn oversized_payload_is_encoding_error() {
        let payload = "a".repeat(3000);
        let err = encode(&EncodeRequest::new(payload, raster_style(200))).unwrap_err();
        assert!(matches!(
            err,
            QrError::Encoding {
                len: 3000,
                level: ErrorCorrection::High
            }
        ));
    }

    #[test]
    fn vector_output_describes_same_symbol() {
        let style = raster_style(250)
            .with_output_format(OutputFormat::Vector)
            .with_module_color(Color::rgb(0x1d, 0x4e, 0xd8));
        let img = encode(&EncodeRequest::new("https://lunr.to/abc123", style)).unwrap();
        assert_eq!(img.format(), OutputFormat::Vector);
        let svg = img.as_svg().unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="250""#));
        assert!(svg.contains(r#"viewBox="0 0 37 37""#));
        assert!(svg.contains("#1d4ed8"));
        assert!(svg.contains("#ffffff"));
        // Top-left finder row starts at the margin and runs seven modules.
        assert!(svg.contains("M4 4h7v1h-7z"));
    }

    #[test]
    fn vector_alpha_becomes_opacity() {
        let style = raster_style(200)
            .with_output_format(OutputFormat::Vector)
            .with_module_color(Color::rgba(0, 0, 0, 128))
            .with_background_color(Color::rgba(255, 255, 255, 0));
        let img = encode(&EncodeRequest::new("opacity", style)).unwrap();
        let svg = img.as_svg().unwrap();
        assert!(svg.contains(r#"fill-opacity="0.502""#));
        assert!(!svg.contains("#ffffff"), "transparent background is omitted");
    }

    #[test]
    fn vector_rasterizes_to_requested_width() {
        let style = raster_style(200).with_output_format(OutputFormat::Vector);
        let img = encode(&EncodeRequest::new("https://lunr.to/abc123", style)).unwrap();
        let raster = img.rasterize().unwrap();
        assert!(raster.is_raster());
        let pixels = raster.to_rgba().unwrap();
        assert_eq!(pixels.dimensions(), (200, 200));
        assert_eq!(*pixels.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        // Center of the top-left finder core.
        let c = module_center(7, 37, 200);
        assert_eq!(*pixels.get_pixel(c, c), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn encoding_is_deterministic() {
        let request = EncodeRequest::new("https://lunr.to/abc123", raster_style(200));
        assert_eq!(encode(&request).unwrap(), encode(&request).unwrap());
    }
}
