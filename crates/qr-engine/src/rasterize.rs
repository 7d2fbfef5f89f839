//! SVG rasterization for vector QR output.

use image::RgbaImage;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use tracing::debug;

use crate::logo::DecodeFailure;

/// Render SVG markup into a `width × width` RGBA buffer.
///
/// The document is scaled so its intrinsic size fills the target width.
pub fn rasterize_svg(svg: &str, width: u32) -> Result<RgbaImage, DecodeFailure> {
    let tree = Tree::from_str(svg, &Options::default())
        .map_err(|e| DecodeFailure::Rasterize(e.to_string()))?;

    let mut pixmap = Pixmap::new(width, width).ok_or_else(|| {
        DecodeFailure::Rasterize(format!("cannot allocate {width}x{width} pixmap"))
    })?;

    let size = tree.size();
    let sx = width as f32 / size.width();
    let sy = width as f32 / size.height();
    debug!(width, sx, sy, "Rasterizing SVG");

    resvg::render(&tree, Transform::from_scale(sx, sy), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; image expects straight alpha.
    let pixels = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect::<Vec<u8>>();

    RgbaImage::from_raw(width, width, pixels)
        .ok_or_else(|| DecodeFailure::Rasterize("pixmap size mismatch".into()))
}
