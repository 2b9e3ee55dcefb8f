#![no_main]

use bitstream::{BitReader, BitWriter};
use codec::GeometryCodec;
use libfuzzer_sys::fuzz_target;
use model::GeometryKind;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let precision = selector % 9;
    let kind = if selector & 0x80 == 0 {
        GeometryKind::Polygon
    } else {
        GeometryKind::Point
    };
    let Ok(codec) = GeometryCodec::new(precision) else {
        return;
    };

    let mut reader = BitReader::new(rest);
    let Ok(points) = codec.decode(&mut reader, kind) else {
        return;
    };

    // Anything that decodes must re-encode to the same points.
    let mut writer = BitWriter::new();
    codec
        .encode(&points, &mut writer)
        .expect("decoded geometry re-encodes");
    let bytes = writer.finish();
    let mut reader = BitReader::new(&bytes);
    let again = codec.decode(&mut reader, kind).expect("re-encoded geometry decodes");
    assert_eq!(points, again);
});
