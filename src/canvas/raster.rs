use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use crate::models::{Point, Stroke};

const BACKGROUND: u8 = 255;
const INK: u8 = 0;

// Distance between stamped discs along a segment, in pixels
const STAMP_SPACING: f32 = 0.5;

/// Row-major network input, background = 0.0 and ink towards 1.0
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    size: u32,
    data: Vec<f32>,
}

impl PixelBuffer {
    pub fn blank(size: u32) -> Self {
        Self {
            size,
            data: vec![0.0; (size as usize) * (size as usize)],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.data.get((y * self.size + x) as usize).copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Grayscale image of the buffer (ink bright on dark), for debug output
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.size, self.size, |x, y| {
            let v = self.data[(y * self.size + x) as usize];
            Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
        })
    }
}

/// Draw strokes as dark round-capped lines on a white bitmap
pub fn render_strokes<'a>(
    width: u32,
    height: u32,
    strokes: impl IntoIterator<Item = &'a Stroke>,
    stroke_width: f32,
) -> GrayImage {
    let mut img = GrayImage::from_pixel(width, height, Luma([BACKGROUND]));
    if width == 0 || height == 0 {
        return img;
    }

    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    // A disc wider than the bitmap already covers all of it
    let max_radius = width.max(height) as f32;
    let radius = (stroke_width.max(0.0) / 2.0).round().min(max_radius) as i32;

    for stroke in strokes {
        let mut points = stroke.points.iter().map(|p| p.clamped(max_x, max_y));
        let Some(mut prev) = points.next() else {
            continue;
        };

        // Single-point strokes still leave a dot
        stamp(&mut img, prev, radius);
        for next in points {
            stamp_segment(&mut img, prev, next, radius);
            prev = next;
        }
    }

    img
}

fn stamp(img: &mut GrayImage, at: Point, radius: i32) {
    draw_filled_circle_mut(img, (at.x.round() as i32, at.y.round() as i32), radius, Luma([INK]));
}

fn stamp_segment(img: &mut GrayImage, from: Point, to: Point, radius: i32) {
    let steps = (from.distance(&to) / STAMP_SPACING).ceil().max(1.0) as u32;
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        let at = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
        stamp(img, at, radius);
    }
}

/// Per output index, the source indices it covers and how much of each
fn axis_coverage(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f64)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|o| {
            let start = o as f64 * scale;
            let end = start + scale;
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 0.0).then_some((s, overlap))
                })
                .collect()
        })
        .collect()
}

/// Area-average a grayscale bitmap down to `size x size`; values stay in 0..=255
pub fn area_downsample(img: &GrayImage, size: u32) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let mut out = Vec::with_capacity((size as usize) * (size as usize));
    if width == 0 || height == 0 || size == 0 {
        out.resize((size as usize) * (size as usize), BACKGROUND as f32);
        return out;
    }

    let cols = axis_coverage(width, size);
    let rows = axis_coverage(height, size);

    for row in &rows {
        for col in &cols {
            let mut sum = 0.0f64;
            let mut weight = 0.0f64;
            for &(y, wy) in row {
                for &(x, wx) in col {
                    let w = wx * wy;
                    sum += img.get_pixel(x, y)[0] as f64 * w;
                    weight += w;
                }
            }
            let mean = if weight > 0.0 { sum / weight } else { BACKGROUND as f64 };
            out.push(mean as f32);
        }
    }

    out
}

/// Downsample, then invert so a white page becomes 0.0 and full ink 1.0
pub fn to_network_input(img: &GrayImage, size: u32) -> PixelBuffer {
    let data = area_downsample(img, size)
        .into_iter()
        .map(|mean| (1.0 - mean / BACKGROUND as f32).clamp(0.0, 1.0))
        .collect();
    PixelBuffer { size, data }
}
