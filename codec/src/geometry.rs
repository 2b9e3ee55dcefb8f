//! Geometry codec: point lists as signed fixed-point coordinates.
//!
//! Layout: a `POINT_COUNT_BITS` wide count, then for each point the x and y
//! coordinates as two's-complement fields of `COORD_INTEGER_BITS +
//! precision_bits` bits. The count prefix makes the encoding self-delimiting.

use bitstream::{BitReader, BitWriter};
use model::{
    coord_bits, dequantize_coord, quantize_coord, GeometryKind, ModelError, Point,
    MAX_POINTS, MAX_PRECISION_BITS, POINT_COUNT_BITS,
};

use crate::error::{CodecError, CodecResult};

/// Encodes and decodes geometry at a fixed precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryCodec {
    precision_bits: u8,
}

impl GeometryCodec {
    /// Creates a codec with `precision_bits` fractional bits (0..=8).
    pub fn new(precision_bits: u8) -> CodecResult<Self> {
        if precision_bits > MAX_PRECISION_BITS {
            return Err(ModelError::InvalidPrecision {
                bits: precision_bits,
                max: MAX_PRECISION_BITS,
            }
            .into());
        }
        Ok(Self { precision_bits })
    }

    #[must_use]
    pub const fn precision_bits(&self) -> u8 {
        self.precision_bits
    }

    /// Bits used by `point_count` points, prefix included.
    #[must_use]
    pub const fn encoded_bits(&self, point_count: usize) -> usize {
        POINT_COUNT_BITS as usize + point_count * 2 * coord_bits(self.precision_bits) as usize
    }

    /// Writes `points`. Coordinates are rounded to the grid.
    pub fn encode(&self, points: &[Point], writer: &mut BitWriter) -> CodecResult<()> {
        if points.len() > MAX_POINTS {
            return Err(CodecError::MalformedGeometry {
                count: points.len(),
            });
        }
        // Quantize everything first so a bad coordinate leaves the writer untouched.
        let quantized = self.quantize_raw(points)?;
        writer.write_bits(points.len() as u64, POINT_COUNT_BITS)?;
        let bits = coord_bits(self.precision_bits);
        for (x, y) in quantized {
            writer.write_signed(x, bits)?;
            writer.write_signed(y, bits)?;
        }
        Ok(())
    }

    /// Reads a geometry of the given kind.
    pub fn decode(&self, reader: &mut BitReader<'_>, kind: GeometryKind) -> CodecResult<Vec<Point>> {
        let count = reader.read_bits(POINT_COUNT_BITS)? as usize;
        if count > MAX_POINTS || kind.check_count(count).is_err() {
            return Err(CodecError::MalformedGeometry { count });
        }
        let bits = coord_bits(self.precision_bits);
        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            let x = reader.read_signed(bits)?;
            let y = reader.read_signed(bits)?;
            points.push(Point::new(
                dequantize_coord(x, self.precision_bits),
                dequantize_coord(y, self.precision_bits),
            ));
        }
        Ok(points)
    }

    /// Snaps points to the grid. Fails on coordinates outside the range.
    pub fn quantize_points(&self, points: &[Point]) -> CodecResult<Vec<Point>> {
        Ok(self
            .quantize_raw(points)?
            .into_iter()
            .map(|(x, y)| {
                Point::new(
                    dequantize_coord(x, self.precision_bits),
                    dequantize_coord(y, self.precision_bits),
                )
            })
            .collect())
    }

    fn quantize_raw(&self, points: &[Point]) -> CodecResult<Vec<(i64, i64)>> {
        points
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let x = quantize_coord(p.x, self.precision_bits);
                let y = quantize_coord(p.y, self.precision_bits);
                x.zip(y)
                    .ok_or(CodecError::CoordinateOutOfRange { point: index })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream::BitError;

    fn roundtrip(codec: GeometryCodec, points: &[Point], kind: GeometryKind) -> Vec<Point> {
        let mut writer = BitWriter::new();
        codec.encode(points, &mut writer).unwrap();
        assert_eq!(writer.bits_written(), codec.encoded_bits(points.len()));
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        codec.decode(&mut reader, kind).unwrap()
    }

    #[test]
    fn triangle_roundtrip() {
        let codec = GeometryCodec::new(2).unwrap();
        let tri = vec![
            Point::new(0.0, 0.0),
            Point::new(-12.75, 3.5),
            Point::new(32767.75, -32768.0),
        ];
        assert_eq!(roundtrip(codec, &tri, GeometryKind::Polygon), tri);
    }

    #[test]
    fn point_roundtrip_without_fraction() {
        let codec = GeometryCodec::new(0).unwrap();
        let pt = vec![Point::new(2550.0, -765.0)];
        assert_eq!(roundtrip(codec, &pt, GeometryKind::Point), pt);
    }

    #[test]
    fn encode_rounds_to_grid() {
        let codec = GeometryCodec::new(1).unwrap();
        let got = roundtrip(codec, &[Point::new(1.3, 1.8)], GeometryKind::Point);
        assert_eq!(got, vec![Point::new(1.5, 2.0)]);
    }

    #[test]
    fn rejects_precision_above_max() {
        assert!(matches!(
            GeometryCodec::new(9),
            Err(CodecError::Model(ModelError::InvalidPrecision { bits: 9, .. }))
        ));
    }

    #[test]
    fn encode_rejects_out_of_range_and_nan() {
        let codec = GeometryCodec::new(0).unwrap();
        let mut writer = BitWriter::new();
        let err = codec
            .encode(&[Point::ZERO, Point::new(40_000.0, 0.0)], &mut writer)
            .unwrap_err();
        assert_eq!(err, CodecError::CoordinateOutOfRange { point: 1 });
        assert_eq!(writer.bits_written(), 0);

        let err = codec
            .encode(&[Point::new(f32::NAN, 0.0)], &mut writer)
            .unwrap_err();
        assert_eq!(err, CodecError::CoordinateOutOfRange { point: 0 });
    }

    #[test]
    fn encode_rejects_too_many_points() {
        let codec = GeometryCodec::new(0).unwrap();
        let points = vec![Point::ZERO; MAX_POINTS + 1];
        let mut writer = BitWriter::new();
        assert_eq!(
            codec.encode(&points, &mut writer),
            Err(CodecError::MalformedGeometry {
                count: MAX_POINTS + 1
            })
        );
    }

    #[test]
    fn decode_rejects_oversized_prefix() {
        let codec = GeometryCodec::new(0).unwrap();
        let mut writer = BitWriter::new();
        writer.write_bits(40, POINT_COUNT_BITS).unwrap();
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(
            codec.decode(&mut reader, GeometryKind::Polygon),
            Err(CodecError::MalformedGeometry { count: 40 })
        );
    }

    #[test]
    fn decode_rejects_count_wrong_for_kind() {
        let codec = GeometryCodec::new(0).unwrap();
        let mut writer = BitWriter::new();
        codec
            .encode(&[Point::ZERO, Point::new(1.0, 1.0)], &mut writer)
            .unwrap();
        let bytes = writer.finish();
        assert_eq!(
            codec.decode(&mut BitReader::new(&bytes), GeometryKind::Point),
            Err(CodecError::MalformedGeometry { count: 2 })
        );
        assert_eq!(
            codec.decode(&mut BitReader::new(&bytes), GeometryKind::Polygon),
            Err(CodecError::MalformedGeometry { count: 2 })
        );
    }

    #[test]
    fn decode_truncated_is_bitstream_error() {
        let codec = GeometryCodec::new(3).unwrap();
        let mut writer = BitWriter::new();
        writer.write_bits(3, POINT_COUNT_BITS).unwrap();
        let bytes = writer.finish();
        let err = codec
            .decode(&mut BitReader::new(&bytes), GeometryKind::Polygon)
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Bitstream(BitError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn quantize_points_snaps() {
        let codec = GeometryCodec::new(2).unwrap();
        let snapped = codec
            .quantize_points(&[Point::new(0.1, 0.2), Point::new(-0.4, 7.9)])
            .unwrap();
        assert_eq!(snapped, vec![Point::new(0.0, 0.25), Point::new(-0.5, 8.0)]);
    }
}
