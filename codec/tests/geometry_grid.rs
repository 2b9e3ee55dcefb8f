use bitstream::{BitReader, BitWriter};
use codec::{CodecError, GeometryCodec};
use model::{GeometryKind, Point, MAX_POINTS, MAX_PRECISION_BITS};
use proptest::prelude::*;

fn grid_point(precision: u8) -> impl Strategy<Value = Point> {
    let scale = f64::from(1u32 << precision);
    let limit = (1i64 << 15) - 1;
    (-limit..limit, -limit..limit, 0..(1i64 << precision)).prop_map(move |(x, y, frac)| {
        let offset = frac as f64 / scale;
        Point::new((x as f64 + offset) as f32, (y as f64 - offset) as f32)
    })
}

proptest! {
    #[test]
    fn grid_points_survive_exactly(
        precision in 0u8..=MAX_PRECISION_BITS,
        count in 3usize..=MAX_POINTS,
        seed in any::<u64>(),
    ) {
        let codec = GeometryCodec::new(precision).unwrap();
        let points: Vec<Point> = (0..count)
            .map(|i| {
                let step = ((seed >> (i % 48)) & 0xFF) as f32;
                Point::new(step - 100.0, i as f32 * 0.5)
            })
            .collect();
        let snapped = codec.quantize_points(&points).unwrap();

        let mut writer = BitWriter::new();
        codec.encode(&snapped, &mut writer).unwrap();
        prop_assert_eq!(writer.bits_written(), codec.encoded_bits(count));
        let bytes = writer.finish();
        let decoded = codec
            .decode(&mut BitReader::new(&bytes), GeometryKind::Polygon)
            .unwrap();
        prop_assert_eq!(decoded, snapped);
    }

    #[test]
    fn arbitrary_grid_point_roundtrips(
        (precision, point) in (0u8..=MAX_PRECISION_BITS)
            .prop_flat_map(|precision| (Just(precision), grid_point(precision))),
    ) {
        let codec = GeometryCodec::new(precision).unwrap();
        let mut writer = BitWriter::new();
        codec.encode(&[point], &mut writer).unwrap();
        let bytes = writer.finish();
        let decoded = codec
            .decode(&mut BitReader::new(&bytes), GeometryKind::Point)
            .unwrap();
        prop_assert_eq!(decoded, vec![point]);
    }

    #[test]
    fn quantize_is_idempotent(x in -30000.0f32..30000.0, y in -30000.0f32..30000.0) {
        let codec = GeometryCodec::new(2).unwrap();
        let once = codec.quantize_points(&[Point::new(x, y)]).unwrap();
        let twice = codec.quantize_points(&once).unwrap();
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn oversized_count_prefix_is_malformed() {
    let codec = GeometryCodec::new(0).unwrap();
    let mut writer = BitWriter::new();
    writer.write_bits(33, model::POINT_COUNT_BITS).unwrap();
    let bytes = writer.finish();
    assert_eq!(
        codec.decode(&mut BitReader::new(&bytes), GeometryKind::Polygon),
        Err(CodecError::MalformedGeometry { count: 33 })
    );
}

#[test]
fn point_geometry_rejects_polygon_arity() {
    let codec = GeometryCodec::new(0).unwrap();
    let square = [
        Point::new(0.0, 0.0),
        Point::new(1.0, 0.0),
        Point::new(1.0, 1.0),
        Point::new(0.0, 1.0),
    ];
    let mut writer = BitWriter::new();
    codec.encode(&square, &mut writer).unwrap();
    let bytes = writer.finish();
    assert_eq!(
        codec.decode(&mut BitReader::new(&bytes), GeometryKind::Point),
        Err(CodecError::MalformedGeometry { count: 4 })
    );
}

#[test]
fn out_of_range_coordinate_leaves_writer_untouched() {
    let codec = GeometryCodec::new(8).unwrap();
    let mut writer = BitWriter::new();
    let err = codec
        .encode(&[Point::new(0.0, 0.0), Point::new(40_000.0, 0.0)], &mut writer)
        .unwrap_err();
    assert_eq!(err, CodecError::CoordinateOutOfRange { point: 1 });
    assert_eq!(writer.bits_written(), 0);
}

#[test]
fn finest_precision_keeps_range_extremes() {
    let codec = GeometryCodec::new(MAX_PRECISION_BITS).unwrap();
    let step = 1.0 / 256.0;
    let points = vec![
        Point::new(32768.0 - step, -32768.0),
        Point::new(-32768.0, 32768.0 - step),
        Point::new(step, -step),
    ];
    let mut writer = BitWriter::new();
    codec.encode(&points, &mut writer).unwrap();
    let bytes = writer.finish();
    let decoded = codec
        .decode(&mut BitReader::new(&bytes), GeometryKind::Polygon)
        .unwrap();
    assert_eq!(decoded, points);

    let mut writer = BitWriter::new();
    assert!(matches!(
        codec.encode(&[Point::new(32768.0, 0.0)], &mut writer),
        Err(CodecError::CoordinateOutOfRange { .. })
    ));
}
