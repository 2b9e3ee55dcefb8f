//! Points, geometry kinds and the coordinate quantization grid.

use std::fmt;

use crate::error::{ModelError, ModelResult};

/// Maximum number of points in any geometry.
pub const MAX_POINTS: usize = 32;

/// Width of the point-count prefix. Wide enough for `MAX_POINTS`.
pub const POINT_COUNT_BITS: u8 = 6;

/// Integer bits of a quantized coordinate (sign included).
pub const COORD_INTEGER_BITS: u8 = 16;

/// Widest supported fractional precision.
pub const MAX_PRECISION_BITS: u8 = 8;

/// A 2D point in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Snaps both coordinates to the grid, clamping to the representable range.
    #[must_use]
    pub fn snapped(self, precision_bits: u8) -> Self {
        Self {
            x: snap_coord(self.x, precision_bits),
            y: snap_coord(self.y, precision_bits),
        }
    }
}

/// Shape class of an object's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeometryKind {
    /// Closed polygon, at least three points.
    Polygon,
    /// A single location.
    Point,
}

impl GeometryKind {
    #[must_use]
    pub const fn min_points(self) -> usize {
        match self {
            Self::Polygon => 3,
            Self::Point => 1,
        }
    }

    #[must_use]
    pub const fn max_points(self) -> usize {
        match self {
            Self::Polygon => MAX_POINTS,
            Self::Point => 1,
        }
    }

    /// Checks a point count against this kind.
    pub fn check_count(self, count: usize) -> ModelResult<()> {
        if count > MAX_POINTS {
            return Err(ModelError::TooManyPoints {
                count,
                max: MAX_POINTS,
            });
        }
        if count < self.min_points() || count > self.max_points() {
            return Err(ModelError::GeometryArity { kind: self, count });
        }
        Ok(())
    }

    /// Checks count and finiteness of a whole geometry.
    pub fn validate(self, points: &[Point]) -> ModelResult<()> {
        self.check_count(points.len())?;
        match points.iter().position(|p| !p.is_finite()) {
            Some(index) => Err(ModelError::NonFiniteCoordinate { index }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polygon => write!(f, "polygon"),
            Self::Point => write!(f, "point"),
        }
    }
}

/// Total bits of one quantized coordinate.
#[must_use]
pub const fn coord_bits(precision_bits: u8) -> u8 {
    COORD_INTEGER_BITS + precision_bits
}

/// Inclusive range of quantized coordinate values.
#[must_use]
pub const fn coord_range(precision_bits: u8) -> (i64, i64) {
    let half = 1i64 << (coord_bits(precision_bits) - 1);
    (-half, half - 1)
}

/// Quantizes a coordinate to fixed point. `None` if it is not finite or
/// falls outside the representable range.
#[must_use]
pub fn quantize_coord(value: f32, precision_bits: u8) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = (f64::from(value) * f64::from(1u32 << precision_bits)).round();
    let (min, max) = coord_range(precision_bits);
    if scaled < min as f64 || scaled > max as f64 {
        return None;
    }
    Some(scaled as i64)
}

/// Inverse of [`quantize_coord`]. Exact for every representable value.
#[must_use]
pub fn dequantize_coord(q: i64, precision_bits: u8) -> f32 {
    (q as f64 / f64::from(1u32 << precision_bits)) as f32
}

/// Snaps a coordinate to the grid. Non-finite values become zero and values
/// outside the range are clamped.
#[must_use]
pub fn snap_coord(value: f32, precision_bits: u8) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let (min, max) = coord_range(precision_bits);
    let scaled = (f64::from(value) * f64::from(1u32 << precision_bits)).round();
    let clamped = scaled.clamp(min as f64, max as f64) as i64;
    dequantize_coord(clamped, precision_bits)
}

/// Vertex average of a geometry. Empty input yields the origin.
#[must_use]
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::ZERO;
    }
    let (sx, sy) = points.iter().fold((0.0f64, 0.0f64), |(sx, sy), p| {
        (sx + f64::from(p.x), sy + f64::from(p.y))
    });
    let n = points.len() as f64;
    Point::new((sx / n) as f32, (sy / n) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_count_prefix_fits_max() {
        assert!(MAX_POINTS < 1 << POINT_COUNT_BITS);
    }

    #[test]
    fn polygon_arity() {
        assert!(GeometryKind::Polygon.check_count(3).is_ok());
        assert!(GeometryKind::Polygon.check_count(32).is_ok());
        assert!(matches!(
            GeometryKind::Polygon.check_count(2),
            Err(ModelError::GeometryArity { count: 2, .. })
        ));
        assert!(matches!(
            GeometryKind::Polygon.check_count(33),
            Err(ModelError::TooManyPoints { count: 33, .. })
        ));
    }

    #[test]
    fn point_arity() {
        assert!(GeometryKind::Point.check_count(1).is_ok());
        assert!(GeometryKind::Point.check_count(0).is_err());
        assert!(GeometryKind::Point.check_count(2).is_err());
    }

    #[test]
    fn validate_rejects_nan() {
        let pts = [Point::new(0.0, 0.0), Point::new(f32::NAN, 1.0), Point::ZERO];
        assert_eq!(
            GeometryKind::Polygon.validate(&pts),
            Err(ModelError::NonFiniteCoordinate { index: 1 })
        );
    }

    #[test]
    fn quantize_roundtrip_on_grid() {
        let q = quantize_coord(12.25, 2).unwrap();
        assert_eq!(q, 49);
        assert_eq!(dequantize_coord(q, 2), 12.25);
    }

    #[test]
    fn quantize_range_edges() {
        let (min, max) = coord_range(0);
        assert_eq!((min, max), (-32768, 32767));
        assert_eq!(quantize_coord(32767.0, 0), Some(32767));
        assert_eq!(quantize_coord(32768.0, 0), None);
        assert_eq!(quantize_coord(f32::INFINITY, 0), None);
    }

    #[test]
    fn snap_clamps_and_zeroes() {
        assert_eq!(snap_coord(1.0e9, 0), 32767.0);
        assert_eq!(snap_coord(f32::NAN, 4), 0.0);
        assert_eq!(snap_coord(0.26, 2), 0.25);
    }

    #[test]
    fn centroid_of_square() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert_eq!(centroid(&square), Point::new(5.0, 5.0));
        assert_eq!(centroid(&[]), Point::ZERO);
    }
}
