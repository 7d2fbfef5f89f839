//! Pixel surfaces for compositing.
//!
//! [`Surface`] is the small drawing API the watermark compositor needs:
//! clear, blit a scaled image, fill a rectangle. Both drawing operations
//! alpha-composite source-over and clip to the surface bounds.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_filled_rect_mut};
use imageproc::rect::Rect;

use crate::color::Color;

/// An addressable 2D pixel buffer.
pub trait Surface {
    /// Reset every pixel to fully transparent.
    fn clear(&mut self);

    /// Draw `image` scaled to `width × height` with its top-left at `(x, y)`.
    fn blit(&mut self, image: &DynamicImage, x: i32, y: i32, width: u32, height: u32);

    /// Fill a `width × height` rectangle with its top-left at `(x, y)`.
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Color);
}

/// An owned RGBA8 surface.
#[derive(Debug, Clone)]
pub struct RgbaSurface {
    buf: RgbaImage,
}

impl RgbaSurface {
    /// Allocate a transparent surface, or `None` if the buffer cannot be
    /// allocated.
    pub fn try_new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let len = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).ok()?;
        data.resize(len, 0u8);

        RgbaImage::from_raw(width, height, data).map(|buf| Self { buf })
    }

    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.buf
    }

    pub fn into_image(self) -> RgbaImage {
        self.buf
    }
}

impl Surface for RgbaSurface {
    fn clear(&mut self) {
        self.buf
            .pixels_mut()
            .for_each(|p| *p = Rgba([0, 0, 0, 0]));
    }

    fn blit(&mut self, image: &DynamicImage, x: i32, y: i32, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let scaled = if image.width() == width && image.height() == height {
            image.to_rgba8()
        } else {
            image
                .resize_exact(width, height, FilterType::Lanczos3)
                .to_rgba8()
        };
        imageops::overlay(&mut self.buf, &scaled, i64::from(x), i64::from(y));
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Color) {
        if width == 0 || height == 0 {
            return;
        }
        let rect = Rect::at(x, y).of_size(width, height);
        let mut canvas = Blend(std::mem::take(&mut self.buf));
        draw_filled_rect_mut(&mut canvas, rect, color.to_rgba());
        self.buf = canvas.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn new_surface_is_transparent() {
        let surface = RgbaSurface::try_new(4, 3).unwrap();
        assert_eq!((surface.width(), surface.height()), (4, 3));
        assert!(surface.as_image().pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn zero_sized_surface_is_unavailable() {
        assert!(RgbaSurface::try_new(0, 10).is_none());
        assert!(RgbaSurface::try_new(10, 0).is_none());
    }

    #[test]
    fn fill_rect_covers_exact_area() {
        let mut surface = RgbaSurface::try_new(10, 10).unwrap();
        surface.fill_rect(2, 3, 4, 5, Color::rgb(255, 0, 0));
        let img = surface.as_image();
        assert_eq!(*img.get_pixel(2, 3), RED);
        assert_eq!(*img.get_pixel(5, 7), RED);
        assert_eq!(*img.get_pixel(1, 3), CLEAR);
        assert_eq!(*img.get_pixel(6, 3), CLEAR);
        assert_eq!(*img.get_pixel(2, 8), CLEAR);
    }

    #[test]
    fn fill_rect_clips_out_of_bounds() {
        let mut surface = RgbaSurface::try_new(10, 10).unwrap();
        surface.fill_rect(-5, -5, 8, 8, Color::rgb(255, 0, 0));
        surface.fill_rect(8, 8, 50, 50, Color::rgb(255, 0, 0));
        let img = surface.as_image();
        assert_eq!(*img.get_pixel(0, 0), RED);
        assert_eq!(*img.get_pixel(2, 2), RED);
        assert_eq!(*img.get_pixel(3, 3), CLEAR);
        assert_eq!(*img.get_pixel(9, 9), RED);
    }

    #[test]
    fn blit_scales_into_target_box() {
        let mut surface = RgbaSurface::try_new(20, 20).unwrap();
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, RED));
        surface.blit(&src, 5, 5, 10, 10);
        let img = surface.as_image();
        assert_eq!(*img.get_pixel(5, 5), RED);
        assert_eq!(*img.get_pixel(14, 14), RED);
        assert_eq!(*img.get_pixel(4, 4), CLEAR);
        assert_eq!(*img.get_pixel(15, 15), CLEAR);
    }

    #[test]
    fn transparent_blit_keeps_destination() {
        let mut surface = RgbaSurface::try_new(4, 4).unwrap();
        surface.fill_rect(0, 0, 4, 4, Color::rgb(0, 0, 255));
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, CLEAR));
        surface.blit(&src, 0, 0, 4, 4);
        assert_eq!(*surface.as_image().get_pixel(1, 1), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn clear_resets_pixels() {
        let mut surface = RgbaSurface::try_new(4, 4).unwrap();
        surface.fill_rect(0, 0, 4, 4, Color::WHITE);
        surface.clear();
        assert!(surface.as_image().pixels().all(|p| *p == CLEAR));
    }
}
