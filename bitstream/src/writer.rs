//! Bit-level writer for encoding packed binary data.

use crate::error::{BitError, BitResult};
use crate::MAX_UNIT_FLOAT_BITS;

/// A bit-level writer for encoding packed binary data.
///
/// Writes are accumulated in an internal growable buffer. Call
/// [`finish`](Self::finish) to get the final byte buffer.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    /// The accumulated bytes.
    bytes: Vec<u8>,
    /// Current byte being written (not yet pushed to bytes).
    current_byte: u8,
    /// Number of bits written to `current_byte` (0-7).
    bit_count: u8,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `BitWriter` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            current_byte: 0,
            bit_count: 0,
        }
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub fn bits_written(&self) -> usize {
        self.bytes.len() * 8 + self.bit_count as usize
    }

    /// Writes a single bit.
    pub fn write_bool(&mut self, value: bool) {
        self.current_byte = (self.current_byte << 1) | u8::from(value);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.bytes.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// Writes a flag bit and returns it, so callers can branch on it inline.
    pub fn write_flag(&mut self, value: bool) -> bool {
        self.write_bool(value);
        value
    }

    /// Writes up to 64 bits from an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 64`.
    /// Returns [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    pub fn write_bits(&mut self, value: u64, bits: u8) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        if bits == 0 {
            return Ok(());
        }
        if bits < 64 && value >= (1u64 << bits) {
            return Err(BitError::ValueOutOfRange { value, bits });
        }

        for i in (0..bits).rev() {
            self.write_bool((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Writes a signed integer as a two's-complement field of `bits` bits.
    pub fn write_signed(&mut self, value: i64, bits: u8) -> BitResult<()> {
        if bits == 0 || bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        if bits < 64 {
            let min = -(1i64 << (bits - 1));
            let max = (1i64 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(BitError::SignedOutOfRange { value, bits });
            }
        }
        let raw = value as u64;
        let masked = if bits == 64 {
            raw
        } else {
            raw & ((1u64 << bits) - 1)
        };
        self.write_bits(masked, bits)
    }

    /// Writes a float in `[0, 1]` quantized to `bits` bits.
    pub fn write_unit_float(&mut self, value: f32, bits: u8) -> BitResult<()> {
        if bits == 0 || bits > MAX_UNIT_FLOAT_BITS {
            return Err(BitError::InvalidBitCount {
                bits,
                max_bits: MAX_UNIT_FLOAT_BITS,
            });
        }
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(BitError::UnitFloatOutOfRange { bits });
        }
        let max = (1u64 << bits) - 1;
        let quantized = (f64::from(value) * max as f64).round() as u64;
        self.write_bits(quantized.min(max), bits)
    }

    /// Finishes writing and returns the byte buffer.
    ///
    /// If the last byte is incomplete, it is padded with zeros on the right.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.current_byte <<= 8 - self.bit_count;
            self.bytes.push(self.current_byte);
        }
        self.bytes
    }
}

/// Returns the varint length in bytes for `value`.
#[must_use]
pub const fn varu32_len(mut value: u32) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}
