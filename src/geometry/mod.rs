//! Normalized field coordinates and their projection onto rendering surfaces.
//!
//! Player positions are stored as fractions of field width/height with the
//! y axis pointing up (y=0 bottom edge, y=1 top edge). Screen and print
//! surfaces both have a top-left origin with y pointing down, so every
//! projection inverts y. This module is the single place that inversion
//! happens.

/// Aspect ratio of a standard football pitch (105m x 68m).
pub const PITCH_ASPECT: f64 = 105.0 / 68.0;

/// A point in surface space (pixels or millimeters, top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A rendering surface with positive, finite dimensions.
///
/// Construction fails for degenerate surfaces, so projections can never
/// divide by zero or produce NaN/Infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    width: f64,
    height: f64,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Option<Self> {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            Some(Self { width, height })
        } else {
            None
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Project a normalized coordinate pair into surface space.
    ///
    /// Out-of-range inputs are projected as-is and land outside the surface.
    pub fn project(&self, norm_x: f64, norm_y: f64) -> Point {
        Point {
            x: norm_x * self.width,
            y: (1.0 - norm_y) * self.height,
        }
    }

    /// Inverse of [`project`](Self::project), used for drag-end updates.
    pub fn unproject(&self, point: Point) -> (f64, f64) {
        (point.x / self.width, 1.0 - point.y / self.height)
    }
}

/// Largest (width, height) with a 105:68 aspect ratio fitting inside the
/// given area, shrinking whichever dimension is the binding constraint.
pub fn fit_pitch(avail_width: f64, avail_height: f64) -> (f64, f64) {
    let mut width = avail_width;
    let mut height = width / PITCH_ASPECT;
    if height > avail_height {
        height = avail_height;
        width = height * PITCH_ASPECT;
    }
    (width, height)
}
