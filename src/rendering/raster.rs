/// Software rasterizer: paints a display list into RGBA pixels.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::rendering::layout::RenderTree;
use crate::rendering::paint::{build_display_list, PaintCommand};
use crate::rendering::text::Typeface;

/// Largest side, in device pixels, of any canvas we are willing to allocate.
pub const MAX_CANVAS_SIDE: u32 = 16_384;

/// Turns a render tree into a raster snapshot.
///
/// `width` is the logical page width; the returned image is always at
/// logical size (`width × tree.height`) even when painting happened at a
/// higher pixel density.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, tree: &RenderTree, width: u32, scale: f32) -> Result<RgbaImage>;
}

/// Default rasterizer: paints at `scale`× and downsamples to logical size.
pub struct SoftwareRasterizer {
    face: Arc<dyn Typeface>,
}

impl SoftwareRasterizer {
    pub fn new(face: Arc<dyn Typeface>) -> Self {
        Self { face }
    }
}

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(&self, tree: &RenderTree, width: u32, scale: f32) -> Result<RgbaImage> {
        if width == 0 || tree.height == 0 {
            return Err(Error::RenderError("cannot snapshot an empty tree".into()));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::RenderError(format!("invalid scale factor {}", scale)));
        }

        let device_w = (width as f32 * scale).ceil() as u32;
        let device_h = (tree.height as f32 * scale).ceil() as u32;
        let mut canvas = allocate_canvas(device_w, device_h, [255, 255, 255, 255])
            .map_err(|e| Error::RenderError(e.to_string()))?;

        for cmd in build_display_list(tree)? {
            execute(&mut canvas, &cmd, scale, self.face.as_ref());
        }

        if device_w == width && device_h == tree.height {
            return Ok(canvas);
        }
        Ok(imageops::resize(&canvas, width, tree.height, FilterType::Triangle))
    }
}

/// Allocate an opaque canvas, failing instead of panicking on absurd sizes.
pub fn allocate_canvas(width: u32, height: u32, fill: [u8; 4]) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(Error::Context(format!("zero-sized canvas {}x{}", width, height)));
    }
    if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
        return Err(Error::Context(format!(
            "canvas {}x{} exceeds the {}px limit",
            width, height, MAX_CANVAS_SIDE
        )));
    }
    Ok(RgbaImage::from_pixel(width, height, Rgba(fill)))
}

fn execute(canvas: &mut RgbaImage, cmd: &PaintCommand, scale: f32, face: &dyn Typeface) {
    let s = |v: i32| v as f32 * scale;
    match cmd {
        PaintCommand::SolidRect { x, y, width, height, radius, rgba } => {
            fill_rounded_rect(
                canvas,
                s(*x),
                s(*y),
                *width as f32 * scale,
                *height as f32 * scale,
                *radius as f32 * scale,
                *rgba,
            );
        }
        PaintCommand::Stroke { x, y, width, height, thickness, rgba } => {
            let (x, y) = (s(*x), s(*y));
            let (w, h) = (*width as f32 * scale, *height as f32 * scale);
            let t = (*thickness as f32 * scale).max(1.0);
            fill_rounded_rect(canvas, x, y, w, t, 0.0, *rgba);
            fill_rounded_rect(canvas, x, y + h - t, w, t, 0.0, *rgba);
            fill_rounded_rect(canvas, x, y, t, h, 0.0, *rgba);
            fill_rounded_rect(canvas, x + w - t, y, t, h, 0.0, *rgba);
        }
        PaintCommand::Text { x, y, line_height, size, text, rgba, center_in } => {
            let size = size * scale;
            let mut x = s(*x);
            if let Some(box_w) = center_in {
                let text_w = face.measure(text, size);
                x += ((*box_w as f32 * scale) - text_w).max(0.0) / 2.0;
            }
            face.draw_line(canvas, x, s(*y), line_height * scale, text, size, *rgba);
        }
    }
}

/// Source-over blend of `rgba` at `coverage` (0..=1) into one pixel.
/// Out-of-bounds coordinates are ignored.
pub(crate) fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, rgba: [u8; 4], coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = (rgba[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let px = canvas.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let v = rgba[c] as f32 * alpha + px.0[c] as f32 * (1.0 - alpha);
        px.0[c] = v.round() as u8;
    }
    let a = alpha * 255.0 + px.0[3] as f32 * (1.0 - alpha);
    px.0[3] = a.round() as u8;
}

fn fill_rounded_rect(canvas: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, radius: f32, rgba: [u8; 4]) {
    let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
    let x0 = x.max(0.0).floor() as i64;
    let y0 = y.max(0.0).floor() as i64;
    let x1 = (x + w).min(canvas.width() as f32).ceil() as i64;
    let y1 = (y + h).min(canvas.height() as f32).ceil() as i64;

    for py in y0..y1 {
        let cy = py as f32 + 0.5;
        if cy < y || cy > y + h {
            continue;
        }
        for px in x0..x1 {
            let cx = px as f32 + 0.5;
            if cx < x || cx > x + w {
                continue;
            }
            if r > 0.0 {
                // distance from the nearest corner circle center
                let ccx = cx.clamp(x + r, x + w - r);
                let ccy = cy.clamp(y + r, y + h - r);
                let (dx, dy) = (cx - ccx, cy - ccy);
                if dx * dx + dy * dy > r * r {
                    continue;
                }
            }
            blend_pixel(canvas, px, py, rgba, 1.0);
        }
    }
}

/// Encode an RGBA image as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
    use image::ImageEncoder as _;

    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Default, PngFilter::Adaptive);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

/// Hex SHA-256 of encoded bytes, used for content-addressed goldens.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::{NodeKind, Rect, RenderNode};
    use crate::rendering::style::{Color, Style};
    use crate::rendering::text::CellFace;

    fn block_tree(color: Color) -> RenderTree {
        RenderTree {
            width: 64,
            height: 32,
            nodes: vec![RenderNode {
                kind: NodeKind::Container,
                rect: Rect { x: 0, y: 0, width: 64, height: 32 },
                style: Style { background: Some(color), ..Style::default() },
                text: None,
            }],
        }
    }

    #[test]
    fn rasterize_returns_logical_size_at_any_scale() {
        let r = SoftwareRasterizer::new(Arc::new(CellFace));
        let tree = block_tree(Color::rgb(10, 20, 30));
        for scale in [1.0, 2.0, 3.0] {
            let img = r.rasterize(&tree, 64, scale).unwrap();
            assert_eq!(img.dimensions(), (64, 32));
            assert_eq!(img.get_pixel(32, 16).0, [10, 20, 30, 255]);
        }
    }

    #[test]
    fn rasterize_refuses_unsafe_colors() {
        let r = SoftwareRasterizer::new(Arc::new(CellFace));
        let tree = block_tree(Color::oklch(0.7, 0.1, 120.0));
        assert!(matches!(r.rasterize(&tree, 64, 2.0), Err(Error::RenderError(_))));
    }

    #[test]
    fn rounded_corners_leave_background() {
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        fill_rounded_rect(&mut img, 0.0, 0.0, 20.0, 20.0, 8.0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(10, 10).0, [0, 0, 0, 255]);
    }

    #[test]
    fn canvas_allocation_rejects_degenerate_sizes() {
        assert!(matches!(allocate_canvas(0, 10, [0; 4]), Err(Error::Context(_))));
        assert!(matches!(allocate_canvas(10, MAX_CANVAS_SIDE + 1, [0; 4]), Err(Error::Context(_))));
        assert!(allocate_canvas(4, 4, [0; 4]).is_ok());
    }

    #[test]
    fn png_encoding_produces_signature_and_stable_digest() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(digest(&png), digest(&encode_png(&img).unwrap()));
        assert_eq!(digest(&png).len(), 64);
    }
}
