pub mod mapping;
pub mod raster;

use image::GrayImage;
use tracing::warn;

use crate::config::{CanvasConfig, MAX_CANVAS_SIDE};
use crate::models::{BoundingBox, Drawing, Point, Stroke};

pub use mapping::SurfaceMapping;
pub use raster::PixelBuffer;

/// Logical drawing state plus the rasterization parameters the network expects
#[derive(Debug, Clone)]
pub struct StrokeCanvas {
    drawing: Drawing,
    active: Option<Stroke>,
    stroke_width: f32,
    input_size: u32,
}

impl StrokeCanvas {
    pub fn new(config: &CanvasConfig) -> Self {
        Self::from_drawing(Drawing::new(config.width, config.height), config)
    }

    /// Resume from an existing drawing; its own logical size wins over the config's
    pub fn from_drawing(drawing: Drawing, config: &CanvasConfig) -> Self {
        Self {
            drawing,
            active: None,
            stroke_width: config.stroke_width,
            input_size: config.input_size,
        }
    }

    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        self.active.as_ref()
    }

    pub fn stroke_count(&self) -> usize {
        self.drawing.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawing.is_empty() && self.active.is_none()
    }

    pub fn start_stroke(&mut self, x: f32, y: f32) {
        if self.end_stroke() {
            warn!("Stroke started while another was active; closing the previous one");
        }
        self.active = Some(Stroke::starting_at(Point::new(x, y)));
    }

    /// Returns false when no stroke is active
    pub fn extend_stroke(&mut self, x: f32, y: f32) -> bool {
        match self.active.as_mut() {
            Some(stroke) => {
                stroke.push(Point::new(x, y));
                true
            }
            None => false,
        }
    }

    /// Commits the active stroke to the drawing; returns false when there was none
    pub fn end_stroke(&mut self) -> bool {
        match self.active.take() {
            Some(stroke) => {
                self.drawing.strokes.push(stroke);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.drawing.strokes.clear();
        self.active = None;
    }

    /// Ink bounds of closed and in-progress strokes
    pub fn bounds(&self) -> Option<BoundingBox> {
        let (w, h) = (self.drawing.width, self.drawing.height);
        BoundingBox::around(
            self.all_strokes()
                .flat_map(|s| s.points.iter())
                .map(|p| p.clamped(w, h)),
        )
    }

    fn all_strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.drawing.strokes.iter().chain(self.active.iter())
    }

    /// Capped at `MAX_CANVAS_SIDE`; strokes beyond the bitmap are clamped onto its edge
    fn bitmap_dimensions(&self) -> (u32, u32) {
        let dim = |v: f32| if v.is_finite() && v >= 1.0 { v.min(MAX_CANVAS_SIDE).ceil() as u32 } else { 1 };
        (dim(self.drawing.width), dim(self.drawing.height))
    }

    /// Full-resolution bitmap at the logical size, dark ink on white
    pub fn render_full(&self) -> GrayImage {
        let (width, height) = self.bitmap_dimensions();
        raster::render_strokes(width, height, self.all_strokes(), self.stroke_width)
    }

    /// Network input for the current strokes, including the one in progress
    pub fn rasterize(&self) -> PixelBuffer {
        if self.is_empty() {
            return PixelBuffer::blank(self.input_size);
        }
        raster::to_network_input(&self.render_full(), self.input_size)
    }
}

impl Default for StrokeCanvas {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}
