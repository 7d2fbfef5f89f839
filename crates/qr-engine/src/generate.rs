//! One-call generation: encode, then watermark when a logo is requested.

use tracing::debug;

use crate::Result;
use crate::logo::LogoSource;
use crate::output::EncodedImage;
use crate::qr::{self, EncodeRequest};
use crate::style::{ErrorCorrection, QrStyle};
use crate::watermark::{Compositor, WatermarkRequest};

/// Everything needed to produce one final image.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub payload: String,
    pub style: QrStyle,
    pub logo: Option<LogoSource>,
    pub apply_logo: bool,
}

impl GenerateRequest {
    pub fn new(payload: impl Into<String>, style: QrStyle) -> Self {
        Self {
            payload: payload.into(),
            style,
            logo: None,
            apply_logo: false,
        }
    }

    /// Builder: attach a logo and enable watermarking.
    pub fn with_logo(mut self, logo: LogoSource) -> Self {
        self.logo = Some(logo);
        self.apply_logo = true;
        self
    }

    /// Builder: toggle watermarking without dropping the logo.
    pub fn with_apply_logo(mut self, val: bool) -> Self {
        self.apply_logo = val;
        self
    }

    /// Whether a logo will be composited.
    pub fn wants_logo(&self) -> bool {
        self.apply_logo && self.logo.is_some()
    }

    /// The style actually used for encoding: HIGH error correction whenever
    /// a logo will cover part of the symbol.
    pub fn effective_style(&self) -> QrStyle {
        if self.wants_logo() {
            self.style
                .clone()
                .with_error_correction(ErrorCorrection::High)
        } else {
            self.style.clone()
        }
    }
}

/// Encode `request` and composite its logo, if any.
///
/// Encoding errors are returned before any drawing happens. Logo problems
/// never fail the call; the undecorated symbol is returned instead. With a
/// logo requested the result is always raster.
pub async fn generate(request: GenerateRequest, compositor: &Compositor) -> Result<EncodedImage> {
    let style = request.effective_style();
    if style.error_correction != request.style.error_correction {
        debug!(
            requested = %request.style.error_correction,
            "Raising error correction to H for logo"
        );
    }

    let base = qr::encode(&EncodeRequest::new(request.payload, style.clone()))?;

    let logo = match request.logo {
        Some(logo) if request.apply_logo => logo,
        _ => return Ok(base),
    };

    let watermark = WatermarkRequest::new(base, style.background_color)
        .with_logo(logo)
        .with_force_raster(true);
    Ok(compositor.composite(watermark).await)
}
