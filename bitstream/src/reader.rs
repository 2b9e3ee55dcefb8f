//! Bit-level reader with bounded operations.

use crate::error::{BitError, BitResult};
use crate::MAX_UNIT_FLOAT_BITS;

/// A bit-level reader for decoding packed binary data.
///
/// All read operations are bounds-checked and return errors on failure.
/// The reader never panics on malformed input.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` from a byte slice.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Returns the number of bits remaining to read.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.data
            .len()
            .saturating_mul(8)
            .saturating_sub(self.bit_pos)
    }

    /// Returns `true` if there are no more bits to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Reads a single bit as a boolean.
    pub fn read_bool(&mut self) -> BitResult<bool> {
        self.ensure_bits(1)?;
        let byte_idx = self.bit_pos / 8;
        let bit_idx = self.bit_pos % 8;
        let bit = (self.data[byte_idx] >> (7 - bit_idx)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    /// Reads up to 64 bits as an unsigned integer.
    pub fn read_bits(&mut self, bits: u8) -> BitResult<u64> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        if bits == 0 {
            return Ok(0);
        }
        self.ensure_bits(bits as usize)?;

        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | u64::from(self.read_bool()?);
        }
        Ok(value)
    }

    /// Reads a two's-complement signed field of `bits` bits.
    pub fn read_signed(&mut self, bits: u8) -> BitResult<i64> {
        if bits == 0 || bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        let raw = self.read_bits(bits)?;
        if bits == 64 {
            return Ok(raw as i64);
        }
        let shift = 64 - u32::from(bits);
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Reads a float in `[0, 1]` quantized to `bits` bits.
    pub fn read_unit_float(&mut self, bits: u8) -> BitResult<f32> {
        if bits == 0 || bits > MAX_UNIT_FLOAT_BITS {
            return Err(BitError::InvalidBitCount {
                bits,
                max_bits: MAX_UNIT_FLOAT_BITS,
            });
        }
        let max = (1u64 << bits) - 1;
        let quantized = self.read_bits(bits)?;
        Ok((quantized as f64 / max as f64) as f32)
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if bits > available {
            return Err(BitError::UnexpectedEof {
                requested: bits,
                available,
            });
        }
        Ok(())
    }
}
