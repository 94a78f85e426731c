use crate::utils::error::{IntakeError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
}

/// Freehand signature capture. Signed means at least one finished stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    strokes: Vec<Stroke>,
    current: Option<Stroke>,
}

impl SignaturePad {
    pub const DEFAULT_WIDTH: u32 = 500;
    pub const DEFAULT_HEIGHT: u32 = 200;

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            strokes: Vec::new(),
            current: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn is_signed(&self) -> bool {
        !self.strokes.is_empty()
    }

    pub fn begin_stroke(&mut self, at: Point) {
        self.current = Some(Stroke { points: vec![at] });
    }

    pub fn extend_stroke(&mut self, to: Point) {
        if let Some(stroke) = self.current.as_mut() {
            stroke.points.push(to);
        }
    }

    /// Finishes the stroke in progress. Returns whether the pad just became signed.
    pub fn end_stroke(&mut self) -> bool {
        let was_signed = self.is_signed();
        if let Some(stroke) = self.current.take() {
            self.strokes.push(stroke);
        }
        !was_signed && self.is_signed()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.current = None;
    }

    /// Replaces the pad contents with saved strokes.
    pub fn restore(&mut self, strokes: Vec<Stroke>) {
        self.current = None;
        self.strokes = strokes
            .into_iter()
            .filter(|s| !s.points.is_empty())
            .collect();
    }
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}

/// Turns captured strokes into an image.
pub trait SignatureEncoder: Send + Sync {
    fn mime_type(&self) -> &'static str;

    fn encode(&self, pad: &SignaturePad) -> Result<Vec<u8>>;

    /// Base64 data URL, the form the server expects.
    fn data_url(&self, pad: &SignaturePad) -> Result<String> {
        let bytes = self.encode(pad)?;
        Ok(format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(bytes)))
    }
}

/// Rasterises strokes into a binary PBM (P4) bitmap.
#[derive(Debug, Clone, Copy)]
pub struct BitmapEncoder {
    pen_radius: i64,
}

impl BitmapEncoder {
    pub fn new(pen_radius: u32) -> Self {
        Self {
            pen_radius: i64::from(pen_radius),
        }
    }
}

impl Default for BitmapEncoder {
    fn default() -> Self {
        Self::new(1)
    }
}

struct Bitmap {
    width: i64,
    height: i64,
    row_bytes: usize,
    bits: Vec<u8>,
}

impl Bitmap {
    fn new(width: u32, height: u32) -> Self {
        let row_bytes = (width as usize).div_ceil(8);
        Self {
            width: i64::from(width),
            height: i64::from(height),
            row_bytes,
            bits: vec![0; row_bytes * height as usize],
        }
    }

    fn set(&mut self, x: i64, y: i64) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let index = y as usize * self.row_bytes + (x as usize / 8);
        self.bits[index] |= 0x80 >> (x % 8);
    }

    fn stamp(&mut self, x: i64, y: i64, radius: i64) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set(x + dx, y + dy);
                }
            }
        }
    }

    // Bresenham
    fn line(&mut self, from: (i64, i64), to: (i64, i64), radius: i64) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.stamp(x, y, radius);
            if (x, y) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

impl Bitmap {
    /// Pixel for a pad point, pulled in to just outside the canvas so a
    /// wild coordinate cannot stretch a line across millions of pixels.
    fn pixel(&self, point: &Point, margin: i64) -> (i64, i64) {
        let x = (point.x.round() as i64).clamp(-margin, self.width + margin);
        let y = (point.y.round() as i64).clamp(-margin, self.height + margin);
        (x, y)
    }
}

impl SignatureEncoder for BitmapEncoder {
    fn mime_type(&self) -> &'static str {
        "image/x-portable-bitmap"
    }

    fn encode(&self, pad: &SignaturePad) -> Result<Vec<u8>> {
        if pad.width() == 0 || pad.height() == 0 {
            return Err(IntakeError::validation(
                "signature",
                "Signature pad has no drawable area",
            ));
        }

        let mut bitmap = Bitmap::new(pad.width(), pad.height());
        let margin = self.pen_radius + 1;
        for stroke in pad.strokes() {
            let points: Vec<_> = stroke
                .points
                .iter()
                .map(|point| bitmap.pixel(point, margin))
                .collect();
            let mut points = points.into_iter();
            let Some(mut previous) = points.next() else {
                continue;
            };
            bitmap.stamp(previous.0, previous.1, self.pen_radius);
            for next in points {
                bitmap.line(previous, next, self.pen_radius);
                previous = next;
            }
        }

        let mut out = format!("P4\n{} {}\n", pad.width(), pad.height()).into_bytes();
        out.extend_from_slice(&bitmap.bits);
        Ok(out)
    }
}
