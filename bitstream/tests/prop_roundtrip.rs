use bitstream::{BitReader, BitWriter};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Bool(bool),
    Bits { bits: u8, value: u64 },
    Signed { bits: u8, value: i64 },
    UnitFloat { bits: u8, quantized: u64 },
}

fn mask_value(bits: u8, value: u64) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

fn clamp_signed(bits: u8, value: i64) -> i64 {
    if bits >= 64 {
        return value;
    }
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    value.clamp(min, max)
}

fn unit_value(bits: u8, quantized: u64) -> f32 {
    let max = (1u64 << bits) - 1;
    (quantized as f64 / max as f64) as f32
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Bool),
        (1u8..=64, any::<u64>()).prop_map(|(bits, value)| Op::Bits {
            bits,
            value: mask_value(bits, value),
        }),
        (1u8..=64, any::<i64>()).prop_map(|(bits, value)| Op::Signed {
            bits,
            value: clamp_signed(bits, value),
        }),
        (1u8..=16, any::<u64>()).prop_map(|(bits, raw)| Op::UnitFloat {
            bits,
            quantized: mask_value(bits, raw),
        }),
    ]
}

fn op_bits(op: &Op) -> usize {
    match op {
        Op::Bool(_) => 1,
        Op::Bits { bits, .. } | Op::Signed { bits, .. } | Op::UnitFloat { bits, .. } => {
            usize::from(*bits)
        }
    }
}

proptest! {
    #[test]
    fn prop_roundtrip_ops(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut writer = BitWriter::new();
        for op in &ops {
            match op {
                Op::Bool(b) => writer.write_bool(*b),
                Op::Bits { bits, value } => writer.write_bits(*value, *bits).unwrap(),
                Op::Signed { bits, value } => writer.write_signed(*value, *bits).unwrap(),
                Op::UnitFloat { bits, quantized } => writer
                    .write_unit_float(unit_value(*bits, *quantized), *bits)
                    .unwrap(),
            }
        }
        let total: usize = ops.iter().map(op_bits).sum();
        prop_assert_eq!(writer.bits_written(), total);

        let bytes = writer.finish();
        prop_assert_eq!(bytes.len(), total.div_ceil(8));
        let mut reader = BitReader::new(&bytes);

        for op in &ops {
            match op {
                Op::Bool(b) => prop_assert_eq!(reader.read_bool().unwrap(), *b),
                Op::Bits { bits, value } => {
                    prop_assert_eq!(reader.read_bits(*bits).unwrap(), *value);
                }
                Op::Signed { bits, value } => {
                    prop_assert_eq!(reader.read_signed(*bits).unwrap(), *value);
                }
                Op::UnitFloat { bits, quantized } => {
                    prop_assert_eq!(
                        reader.read_unit_float(*bits).unwrap(),
                        unit_value(*bits, *quantized)
                    );
                }
            }
        }
        prop_assert!(reader.bits_remaining() < 8);
    }
}
