use bitstream::{BitError, BitReader, BitWriter};

#[test]
fn writer_roundtrip_flags_and_bits() {
    let mut writer = BitWriter::new();
    writer.write_bits(0b1010, 4).unwrap();
    writer.write_bits(0xAB, 8).unwrap();
    let bytes = writer.finish();

    let mut reader = BitReader::new(&bytes);
    assert_eq!(reader.read_bits(4).unwrap(), 0b1010);
    assert_eq!(reader.read_bits(8).unwrap(), 0xAB);
}

#[test]
fn signed_coordinates_span_byte_boundaries() {
    // 18-bit fields, as used for quarter-unit coordinates.
    let values = [-131_072i64, -1, 0, 1, 131_071];
    let mut writer = BitWriter::with_capacity(16);
    writer.write_bool(true);
    for value in values {
        writer.write_signed(value, 18).unwrap();
    }
    assert_eq!(writer.bits_written(), 1 + 18 * values.len());
    let bytes = writer.finish();

    let mut reader = BitReader::new(&bytes);
    assert!(reader.read_bool().unwrap());
    for value in values {
        assert_eq!(reader.read_signed(18).unwrap(), value);
    }
    assert!(reader.bits_remaining() < 8);
}

#[test]
fn truncated_buffer_reports_eof() {
    let mut writer = BitWriter::new();
    writer.write_bits(0xDEAD_BEEF, 32).unwrap();
    let bytes = writer.finish();

    let mut reader = BitReader::new(&bytes[..3]);
    assert!(matches!(
        reader.read_bits(32),
        Err(BitError::UnexpectedEof {
            requested: 32,
            available: 24
        })
    ));
}
