use crate::models::Point;

/// Linear scale from surface pixels to logical canvas units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMapping {
    pub surface_width: f32,
    pub surface_height: f32,
    pub logical_width: f32,
    pub logical_height: f32,
}

impl SurfaceMapping {
    pub fn new(surface: (f32, f32), logical: (f32, f32)) -> Self {
        Self {
            surface_width: surface.0,
            surface_height: surface.1,
            logical_width: logical.0,
            logical_height: logical.1,
        }
    }

    /// Surface and canvas share one coordinate space
    pub fn identity(width: f32, height: f32) -> Self {
        Self::new((width, height), (width, height))
    }

    /// Called when the surface is resized; the logical size never changes
    pub fn resize_surface(&mut self, width: f32, height: f32) {
        self.surface_width = width;
        self.surface_height = height;
    }

    pub fn to_logical(&self, x: f32, y: f32) -> Point {
        Point::new(
            scale(x, self.surface_width, self.logical_width),
            scale(y, self.surface_height, self.logical_height),
        )
        .clamped(self.logical_width, self.logical_height)
    }
}

fn scale(v: f32, from: f32, to: f32) -> f32 {
    if from > 0.0 { v * to / from } else { 0.0 }
}
