//! Core types for the codec.

use bitstream::{varu32_len, BitReader, BitWriter, BitError};

use crate::error::CodecResult;

/// Data bits per id group; the group's leading bit says whether more follow.
const GROUP_DATA_BITS: u8 = 7;
const MAX_GROUPS: usize = 5;

/// A stable replicated object identifier.
///
/// Ids are assigned by the host registry, start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ObjectId(u32);

impl ObjectId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Bits used on the wire: 8 per group of 7 significant bits.
    #[must_use]
    pub const fn encoded_bits(self) -> usize {
        varu32_len(self.0) * 8
    }

    /// Writes the id as a bit-packed varint (continuation bit, then 7 bits).
    pub fn write(self, writer: &mut BitWriter) -> CodecResult<()> {
        let mut value = self.0;
        loop {
            let group = u64::from(value & 0x7F);
            value >>= GROUP_DATA_BITS;
            writer.write_bool(value != 0);
            writer.write_bits(group, GROUP_DATA_BITS)?;
            if value == 0 {
                return Ok(());
            }
        }
    }

    pub fn read(reader: &mut BitReader<'_>) -> CodecResult<Self> {
        let mut value = 0u64;
        for group in 0..MAX_GROUPS {
            let more = reader.read_bool()?;
            let bits = reader.read_bits(GROUP_DATA_BITS)?;
            value |= bits << (group * GROUP_DATA_BITS as usize);
            if !more {
                let raw = u32::try_from(value).map_err(|_| BitError::InvalidVarint)?;
                return Ok(Self(raw));
            }
        }
        Err(BitError::InvalidVarint.into())
    }
}

impl From<u32> for ObjectId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ObjectId> for u32 {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;

    #[test]
    fn id_roundtrip_and_size() {
        for raw in [0u32, 1, 127, 128, 300, 70_000, u32::MAX] {
            let id = ObjectId::new(raw);
            let mut writer = BitWriter::new();
            writer.write_bool(true);
            id.write(&mut writer).unwrap();
            assert_eq!(writer.bits_written(), 1 + id.encoded_bits());
            let bytes = writer.finish();
            let mut reader = BitReader::new(&bytes);
            assert!(reader.read_bool().unwrap());
            assert_eq!(ObjectId::read(&mut reader).unwrap(), id);
        }
    }

    #[test]
    fn id_rejects_overlong() {
        let bytes = [0xFFu8; 8];
        let mut reader = BitReader::new(&bytes);
        assert!(matches!(
            ObjectId::read(&mut reader),
            Err(CodecError::Bitstream(BitError::InvalidVarint))
        ));
    }

    #[test]
    fn id_display() {
        assert_eq!(ObjectId::new(7).to_string(), "#7");
    }
}
