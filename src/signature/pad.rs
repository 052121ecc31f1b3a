/// Freehand signature raster
///
/// Strokes are rasterized straight into an RGBA buffer at device pixel
/// density. Each move draws one round-capped segment from the previous
/// point and then starts over from the new point, so no path history is
/// kept. The buffer is only PNG-encoded once, on submit.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgba, RgbaImage};

use crate::error::SignatureError;

const BLANK: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([17, 24, 39, 255]);

/// A point in window (page) coordinates, or local surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn relative_to(self, origin: Position) -> Position {
        Position::new(self.x - origin.x, self.y - origin.y)
    }
}

/// One drawn segment in logical surface coordinates, for on-screen preview
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Position,
    pub to: Position,
}

pub struct SignaturePad {
    raster: RgbaImage,
    /// Device pixels per logical pixel
    scale: f32,
    /// Logical pen width
    stroke_width: f32,
    /// Current stroke's last point, in logical coordinates
    last: Option<Position>,
    has_content: bool,
}

impl SignaturePad {
    /// A blank surface of `width` x `height` logical pixels.
    pub fn new(width: f32, height: f32, scale_factor: f32, stroke_width: f32) -> Self {
        let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        let pixel_width = (width.max(1.0) * scale).ceil() as u32;
        let pixel_height = (height.max(1.0) * scale).ceil() as u32;

        Self {
            raster: RgbaImage::from_pixel(pixel_width, pixel_height, BLANK),
            scale,
            stroke_width,
            last: None,
            has_content: false,
        }
    }

    pub fn has_content(&self) -> bool {
        self.has_content
    }

    pub fn is_drawing(&self) -> bool {
        self.last.is_some()
    }

    /// Raster size in device pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    /// Everything drawn so far, at device resolution
    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Start a stroke. `position` is in window coordinates, `origin` is the
    /// surface's top-left corner in the same space.
    pub fn pointer_down(&mut self, position: Position, origin: Position) {
        self.last = Some(position.relative_to(origin));
    }

    /// Extend the active stroke. Returns the drawn segment, or `None` when
    /// no stroke is active.
    pub fn pointer_move(&mut self, position: Position, origin: Position) -> Option<Segment> {
        let from = self.last?;
        let to = position.relative_to(origin);

        self.draw_segment(from, to);
        self.last = Some(to);
        self.has_content = true;

        Some(Segment { from, to })
    }

    /// End the active stroke; no-op when none is active.
    pub fn pointer_up(&mut self) {
        self.last = None;
    }

    /// Reset to a blank surface.
    pub fn clear(&mut self) {
        if !self.has_content && self.last.is_none() {
            return;
        }
        for pixel in self.raster.pixels_mut() {
            *pixel = BLANK;
        }
        self.last = None;
        self.has_content = false;
    }

    /// Encode the raster as a `data:image/png;base64,` URI.
    pub fn to_data_uri(&self) -> Result<String, SignatureError> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            self.raster.as_raw(),
            self.raster.width(),
            self.raster.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }

    /// Stamp discs along the segment; overlapping discs give round caps
    /// and joins.
    fn draw_segment(&mut self, from: Position, to: Position) {
        let (x0, y0) = (from.x * self.scale, from.y * self.scale);
        let (x1, y1) = (to.x * self.scale, to.y * self.scale);
        let radius = (self.stroke_width * self.scale / 2.0).max(0.5);

        let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let steps = (length / (radius / 2.0).max(0.5)).ceil().max(1.0) as u32;

        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.stamp(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t, radius);
        }
    }

    fn stamp(&mut self, cx: f32, cy: f32, radius: f32) {
        let (width, height) = self.raster.dimensions();
        let min_x = (cx - radius).floor().max(0.0) as u32;
        let min_y = (cy - radius).floor().max(0.0) as u32;
        let max_x = ((cx + radius).ceil().max(0.0) as u32).min(width);
        let max_y = ((cy + radius).ceil().max(0.0) as u32).min(height);
        let r2 = radius * radius;

        for y in min_y..max_y {
            for x in min_x..max_x {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.raster.put_pixel(x, y, INK);
                }
            }
        }
    }

    #[cfg(test)]
    fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.raster.get_pixel(x, y)
    }

    #[cfg(test)]
    fn is_blank(&self) -> bool {
        self.raster.pixels().all(|p| *p == BLANK)
    }
}

impl std::fmt::Debug for SignaturePad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignaturePad")
            .field("pixel_size", &self.pixel_size())
            .field("scale", &self.scale)
            .field("has_content", &self.has_content)
            .field("drawing", &self.is_drawing())
            .finish()
    }
}
