use tracing::{debug, warn};

use crate::canvas::{PixelBuffer, StrokeCanvas, SurfaceMapping};
use crate::error::ClassifyError;
use crate::models::{Drawing, Recognition};
use crate::worker::ClassifierWorker;

/// Pointer input in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
}

/// Everything one drawing screen needs: the strokes, the surface mapping and
/// the classifier worker. Input handling is synchronous; only `detect` waits.
pub struct DrawingSession {
    canvas: StrokeCanvas,
    mapping: SurfaceMapping,
    worker: ClassifierWorker,
}

impl DrawingSession {
    pub fn new(canvas: StrokeCanvas, mapping: SurfaceMapping, worker: ClassifierWorker) -> Self {
        Self {
            canvas,
            mapping,
            worker,
        }
    }

    pub fn canvas(&self) -> &StrokeCanvas {
        &self.canvas
    }

    pub fn worker(&self) -> &ClassifierWorker {
        &self.worker
    }

    pub fn resize_surface(&mut self, width: f32, height: f32) {
        self.mapping.resize_surface(width, height);
    }

    /// Returns true when the event changed the drawing
    pub fn handle_event(&mut self, event: SurfaceEvent) -> bool {
        match event {
            SurfaceEvent::Down { x, y } => {
                let p = self.mapping.to_logical(x, y);
                self.canvas.start_stroke(p.x, p.y);
                true
            }
            SurfaceEvent::Move { x, y } => {
                let p = self.mapping.to_logical(x, y);
                let extended = self.canvas.extend_stroke(p.x, p.y);
                if !extended {
                    warn!("Pointer move without an active stroke ignored");
                }
                extended
            }
            SurfaceEvent::Up => self.canvas.end_stroke(),
        }
    }

    /// Replay every stroke of a recorded drawing, already in logical coordinates
    pub fn replay(&mut self, drawing: &Drawing) {
        for stroke in &drawing.strokes {
            let mut points = stroke.points.iter();
            let Some(first) = points.next() else {
                continue;
            };
            self.canvas.start_stroke(first.x, first.y);
            for p in points {
                self.canvas.extend_stroke(p.x, p.y);
            }
            self.canvas.end_stroke();
        }
    }

    pub fn clear(&mut self) {
        self.canvas.clear();
    }

    pub fn rasterize(&self) -> PixelBuffer {
        self.canvas.rasterize()
    }

    /// Rasterize the current strokes and classify them on the worker.
    /// Results carry the ink bounds as their location.
    pub async fn detect(&self) -> Result<Vec<Recognition>, ClassifyError> {
        let pixels = self.canvas.rasterize();
        let bounds = self.canvas.bounds();
        debug!(strokes = self.canvas.stroke_count(), "Detect requested");

        let mut results = self.worker.classify(pixels.into_vec()).await?;
        for result in &mut results {
            result.location = bounds;
        }
        Ok(results)
    }

    pub async fn close(self) {
        self.worker.close().await;
    }
}
