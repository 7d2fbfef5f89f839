//! Logo watermarking for encoded QR symbols.
//!
//! The compositor centers a logo on the symbol over a small square in the
//! background color. The logo occludes a region well inside what HIGH error
//! correction can recover, so the code stays scannable.
//!
//! Any failure on the way (logo fetch or decode, base decode, surface
//! allocation, export) yields the undecorated base image instead of an
//! error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

use crate::color::Color;
use crate::logo::{self, DecodeFailure, LogoSource};
use crate::output::EncodedImage;
use crate::surface::{RgbaSurface, Surface};

/// Logo side length as a fraction of the symbol width.
pub const DEFAULT_LOGO_RATIO: f64 = 0.15;

/// Backdrop padding on each side as a fraction of the logo size.
pub const DEFAULT_PADDING_RATIO: f64 = 0.15;

/// Upper bound on each decode step.
pub const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for the compositor.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkConfig {
    /// Logo side as a fraction of the symbol width.
    pub logo_ratio: f64,
    /// Padding around the logo as a fraction of the logo side.
    pub padding_ratio: f64,
    /// Timeout applied to the logo decode and the base decode separately.
    /// `None` waits indefinitely.
    pub decode_timeout: Option<Duration>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            logo_ratio: DEFAULT_LOGO_RATIO,
            padding_ratio: DEFAULT_PADDING_RATIO,
            decode_timeout: Some(DEFAULT_DECODE_TIMEOUT),
        }
    }
}

impl WatermarkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the logo ratio (clamped to `0.0..=1.0`).
    pub fn with_logo_ratio(mut self, val: f64) -> Self {
        self.logo_ratio = val.clamp(0.0, 1.0);
        self
    }

    /// Builder: set the padding ratio (clamped to `0.0..=1.0`).
    pub fn with_padding_ratio(mut self, val: f64) -> Self {
        self.padding_ratio = val.clamp(0.0, 1.0);
        self
    }

    /// Builder: set or disable the decode timeout.
    pub fn with_decode_timeout(mut self, val: Option<Duration>) -> Self {
        self.decode_timeout = val;
        self
    }
}

/// Placement of the logo and its backdrop on a `width × width` symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoGeometry {
    pub logo_size: u32,
    pub padding: u32,
    pub logo_x: i32,
    pub logo_y: i32,
}

impl LogoGeometry {
    pub fn compute(width: u32, config: &WatermarkConfig) -> Self {
        let logo_size = (config.logo_ratio * f64::from(width)).floor() as u32;
        let padding = (config.padding_ratio * f64::from(logo_size)).floor() as u32;
        let offset = (width.saturating_sub(logo_size) / 2) as i32;
        Self {
            logo_size,
            padding,
            logo_x: offset,
            logo_y: offset,
        }
    }

    /// Top-left corner of the background square.
    pub fn backdrop_origin(&self) -> (i32, i32) {
        let p = self.padding as i32;
        (self.logo_x - p, self.logo_y - p)
    }

    /// Side length of the background square.
    pub fn backdrop_size(&self) -> u32 {
        self.logo_size + 2 * self.padding
    }
}

/// Input to [`Compositor::composite`].
#[derive(Debug, Clone)]
pub struct WatermarkRequest {
    pub base: EncodedImage,
    pub logo: Option<LogoSource>,
    pub apply: bool,
    /// Fill for the square behind the logo; normally the symbol's light color.
    pub background_color: Color,
    /// Rasterize a vector base even when no logo ends up being drawn.
    pub force_raster: bool,
}

impl WatermarkRequest {
    pub fn new(base: EncodedImage, background_color: Color) -> Self {
        Self {
            base,
            logo: None,
            apply: false,
            background_color,
            force_raster: false,
        }
    }

    /// Builder: attach a logo and enable watermarking.
    pub fn with_logo(mut self, logo: LogoSource) -> Self {
        self.logo = Some(logo);
        self.apply = true;
        self
    }

    /// Builder: toggle watermarking without dropping the logo.
    pub fn with_apply(mut self, val: bool) -> Self {
        self.apply = val;
        self
    }

    /// Builder: always return a raster image.
    pub fn with_force_raster(mut self, val: bool) -> Self {
        self.force_raster = val;
        self
    }
}

/// Overlays logos on encoded symbols.
///
/// Stateless apart from its configuration; every call allocates its own
/// surface, so one compositor can serve concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    config: WatermarkConfig,
}

impl Compositor {
    pub fn new(config: WatermarkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Produce the final image for `request`. Never fails.
    pub async fn composite(&self, request: WatermarkRequest) -> EncodedImage {
        let WatermarkRequest {
            base,
            logo,
            apply,
            background_color,
            force_raster,
        } = request;

        let logo = match logo {
            Some(logo) if apply => logo,
            _ => {
                debug!(apply, "No logo to apply, passing base through");
                return self.pass_through(base, force_raster).await;
            }
        };

        let width = base.pixel_width();
        let (logo_img, base_img) = tokio::join!(
            self.bounded(logo::load_logo(&logo)),
            self.bounded(decode_base(&base)),
        );

        let logo_img = match logo_img {
            Ok(img) => img,
            Err(e) => {
                warn!(error = %e, "Logo unavailable, returning undecorated symbol");
                return self.pass_through(base, force_raster).await;
            }
        };
        let base_img = match base_img {
            Ok(img) => img,
            Err(e) => {
                warn!(error = %e, "Base image could not be decoded, returning it unchanged");
                return base;
            }
        };

        let geometry = LogoGeometry::compute(width, &self.config);
        debug!(
            width,
            logo_size = geometry.logo_size,
            padding = geometry.padding,
            logo_x = geometry.logo_x,
            "Compositing logo"
        );

        let drawn = tokio::task::spawn_blocking(move || {
            render(width, &base_img, &logo_img, &geometry, background_color)
                .map(|pixels| EncodedImage::from_rgba(&pixels))
        })
        .await;

        match drawn {
            Ok(Some(Ok(img))) => img,
            Ok(Some(Err(e))) => {
                warn!(error = %e, "Composite export failed, returning undecorated symbol");
                self.pass_through(base, force_raster).await
            }
            Ok(None) => {
                warn!(width, "Drawing surface unavailable, returning undecorated symbol");
                self.pass_through(base, force_raster).await
            }
            Err(e) => {
                warn!(error = %e, "Compositing task failed, returning undecorated symbol");
                self.pass_through(base, force_raster).await
            }
        }
    }

    /// Return `base` as-is, rasterizing a vector base when `force_raster`
    /// is set. A vector that cannot be rasterized is returned unchanged.
    async fn pass_through(&self, base: EncodedImage, force_raster: bool) -> EncodedImage {
        if !force_raster || base.is_raster() {
            return base;
        }

        let vector = base.clone();
        let rasterized = self
            .bounded(async move {
                tokio::task::spawn_blocking(move || vector.rasterize())
                    .await
                    .map_err(|e| DecodeFailure::Task(e.to_string()))?
            })
            .await;

        match rasterized {
            Ok(img) => img,
            Err(e) => {
                warn!(error = %e, "Vector base could not be rasterized, returning it unchanged");
                base
            }
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, DecodeFailure>>,
    ) -> Result<T, DecodeFailure> {
        match self.config.decode_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or(Err(DecodeFailure::Timeout(limit))),
            None => fut.await,
        }
    }
}

/// Decode the base symbol into pixels on the blocking pool.
async fn decode_base(base: &EncodedImage) -> Result<DynamicImage, DecodeFailure> {
    let base = base.clone();
    let pixels = tokio::task::spawn_blocking(move || base.to_rgba())
        .await
        .map_err(|e| DecodeFailure::Task(e.to_string()))??;
    Ok(DynamicImage::ImageRgba8(pixels))
}

/// Draw the watermarked symbol onto a fresh surface.
fn render(
    width: u32,
    base: &DynamicImage,
    logo: &Arc<DynamicImage>,
    geometry: &LogoGeometry,
    background: Color,
) -> Option<RgbaImage> {
    let mut surface = RgbaSurface::try_new(width, width)?;
    paint(&mut surface, width, base, logo, geometry, background);
    Some(surface.into_image())
}

/// Paint in layer order: base, backdrop, logo.
pub fn paint<S: Surface>(
    surface: &mut S,
    width: u32,
    base: &DynamicImage,
    logo: &DynamicImage,
    geometry: &LogoGeometry,
    background: Color,
) {
    surface.clear();
    surface.blit(base, 0, 0, width, width);

    let (bx, by) = geometry.backdrop_origin();
    let side = geometry.backdrop_size();
    surface.fill_rect(bx, by, side, side, background);

    surface.blit(
        logo,
        geometry.logo_x,
        geometry.logo_y,
        geometry.logo_size,
        geometry.logo_size,
    );
}
