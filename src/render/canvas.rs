//! Raster surface backed by a tiny-skia pixmap.

use std::path::Path;

use image::{Rgba, RgbaImage};
use tiny_skia::{FillRule, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::{Color, Point, Surface};
use crate::error::{Error, Result};

/// Thinnest stroke drawn, in pixels.
const MIN_STROKE_WIDTH: f32 = 1.0;

/// In-memory anti-aliased canvas. Frames are encoded through `image`.
pub struct ImageSurface {
    pixmap: Pixmap,
}

impl ImageSurface {
    /// Transparent canvas of the given size, or `None` for an empty or
    /// oversized one.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Pixmap::new(width, height).map(|pixmap| Self { pixmap })
    }

    /// Straight-alpha RGBA of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Copy the frame out as an `image` buffer.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.pixmap.width(), self.pixmap.height(), |x, y| {
            Rgba(self.pixel(x, y).unwrap_or_default())
        })
    }

    /// Encode to a file; the format follows the extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_image()
            .save(path)
            .map_err(|e| Error::render(path, e.to_string()))?;
        tracing::debug!(
            "Wrote {}x{} frame to {:?}",
            self.pixmap.width(),
            self.pixmap.height(),
            path
        );
        Ok(())
    }
}

fn paint(color: Color) -> Paint<'static> {
    let [r, g, b, a] = color.to_rgba8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

impl Surface for ImageSurface {
    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn clear(&mut self, color: Color) {
        let [r, g, b, a] = color.to_rgba8();
        self.pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color) {
        if !(radius > 0.0) || color.a <= 0.0 {
            return;
        }
        // None for non-finite geometry
        let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) else {
            return;
        };
        self.pixmap.fill_path(
            &path,
            &paint(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn stroke_line(&mut self, from: Point, to: Point, width: f32, color: Color) {
        if !(width > 0.0) || color.a <= 0.0 {
            return;
        }
        let finite = [from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite());
        if !finite {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(from.x, from.y);
        pb.line_to(to.x, to.y);
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width: width.max(MIN_STROKE_WIDTH),
            line_cap: LineCap::Round,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &paint(color),
            &stroke,
            Transform::identity(),
            None,
        );
    }
}
