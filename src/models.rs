use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::check_surface_size;

/// A point in logical canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Clamp into `[0, width] x [0, height]`
    pub fn clamped(&self, width: f32, height: f32) -> Point {
        Point {
            x: clamp_coord(self.x, width),
            y: clamp_coord(self.y, height),
        }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

// f32::max drops NaN, so a NaN coordinate lands on 0
fn clamp_coord(v: f32, max: f32) -> f32 {
    v.max(0.0).min(max.max(0.0))
}

/// One continuous pointer gesture, from press to release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stroke {
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn starting_at(point: Point) -> Self {
        Self {
            points: vec![point],
        }
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The full set of strokes forming the current user input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub strokes: Vec<Stroke>,
}

impl Drawing {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            strokes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(Stroke::is_empty)
    }

    /// Rejects sizes a canvas could not allocate; stroke points are clamped later
    pub fn validate(&self) -> anyhow::Result<()> {
        check_surface_size(self.width, self.height).context("Invalid drawing")
    }
}

/// Axis-aligned box in logical canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn around(points: impl IntoIterator<Item = Point>) -> Option<BoundingBox> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        Some(BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}

/// One ranked classification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    /// Raw class index as a string
    pub id: String,
    pub label: String,
    pub confidence: f32,
    pub location: Option<BoundingBox>,
}

impl Recognition {
    pub fn class_index(&self) -> Option<usize> {
        self.id.parse().ok()
    }
}

impl fmt::Display for Recognition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2}%", self.label, self.confidence * 100.0)
    }
}

/// Render results in ranked order, one `label: pct%` entry per line
pub fn format_recognitions(results: &[Recognition]) -> String {
    results
        .iter()
        .map(Recognition::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
