use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, `(x1, y1)` top-left and `(x2, y2)` bottom-right.
///
/// Serialized as a flat `[x1, y1, x2, y2]` array to match the detection artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area, or 0 for inverted boxes.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn intersection_area(&self, other: &BBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        if ix2 <= ix1 || iy2 <= iy1 {
            return 0.0;
        }
        (ix2 - ix1) * (iy2 - iy1)
    }

    /// Intersection over union. Exactly 0.0 when the boxes do not overlap.
    pub fn iou(&self, other: &BBox) -> f32 {
        let inter = self.intersection_area(other);
        if inter <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        BBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Four corner points of a recognized text fragment, as reported by the OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub [[f32; 2]; 4]);

impl Quad {
    /// Axis-aligned quad spanning `(x1, y1)`–`(x2, y2)`, corners clockwise from top-left.
    pub fn from_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Quad([[x1, y1], [x2, y1], [x2, y2], [x1, y2]])
    }

    /// Smallest y across the four corners (the reading-order key).
    pub fn top(&self) -> f32 {
        self.0.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min)
    }

    pub fn bottom(&self) -> f32 {
        self.0.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn height(&self) -> f32 {
        self.bottom() - self.top()
    }
}

/// Maps boxes between native image coordinates and the stretched square
/// detector input produced for one pyramid scale.
///
/// The forward path is: resize the native image by `scale`, giving
/// `scaled_width × scaled_height`, then stretch (non-uniformly) to
/// `square_size × square_size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    pub scale: f32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub square_size: u32,
}

impl ScaleTransform {
    pub fn new(native_width: u32, native_height: u32, scale: f32, square_size: u32) -> Self {
        let scaled_width = ((native_width as f32 * scale).round() as u32).max(1);
        let scaled_height = ((native_height as f32 * scale).round() as u32).max(1);
        Self { scale, scaled_width, scaled_height, square_size }
    }

    /// Per-axis factors from square-input space back to native space:
    /// `(scaled_dimension / square_size) / scale`.
    pub fn factors(&self) -> (f32, f32) {
        let side = self.square_size as f32;
        let sx = (self.scaled_width as f32 / side) / self.scale;
        let sy = (self.scaled_height as f32 / side) / self.scale;
        (sx, sy)
    }

    /// Undo the square stretch, then the pyramid scale.
    pub fn to_native(&self, b: &BBox) -> BBox {
        let (sx, sy) = self.factors();
        BBox::new(b.x1 * sx, b.y1 * sy, b.x2 * sx, b.y2 * sy)
    }

    /// Native coordinates to square-input coordinates.
    pub fn to_square(&self, b: &BBox) -> BBox {
        let (sx, sy) = self.factors();
        BBox::new(b.x1 / sx, b.y1 / sy, b.x2 / sx, b.y2 / sy)
    }
}
