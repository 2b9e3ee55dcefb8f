//! Packet header types and constants.

/// Magic number identifying ghostwire packets.
///
/// This value is fixed and must never change across versions.
pub const MAGIC: u32 = 0x4748_5354; // "GHST" in ASCII

/// Current wire format version.
pub const VERSION: u16 = 1;

/// Header size in bytes (24 total).
pub const HEADER_SIZE: usize = 4 + 2 + 2 + 8 + 4 + 4;

/// Packet flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PacketFlags(u16);

impl PacketFlags {
    /// Packet carries ghost destroy/create/update sections.
    pub const GHOST_DATA: u16 = 1 << 0;

    /// Final packet of a connection; the observer drops every shadow.
    pub const DISCONNECT: u16 = 1 << 1;

    /// Reserved bits mask (must be zero in version 1).
    const RESERVED_MASK: u16 = !0b11;

    /// Creates new flags from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Returns `true` if this packet carries ghost sections.
    #[must_use]
    pub const fn is_ghost_data(self) -> bool {
        self.0 & Self::GHOST_DATA != 0
    }

    /// Returns `true` if this is a disconnect packet.
    #[must_use]
    pub const fn is_disconnect(self) -> bool {
        self.0 & Self::DISCONNECT != 0
    }

    /// Exactly one of `GHOST_DATA` or `DISCONNECT` is set and no reserved
    /// bits are set.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        let has_reserved = self.0 & Self::RESERVED_MASK != 0;
        (self.is_ghost_data() ^ self.is_disconnect()) && !has_reserved
    }

    /// Creates flags for a ghost data packet.
    #[must_use]
    pub const fn ghost_data() -> Self {
        Self(Self::GHOST_DATA)
    }

    /// Creates flags for a disconnect packet.
    #[must_use]
    pub const fn disconnect() -> Self {
        Self(Self::DISCONNECT)
    }
}

/// Packet header.
///
/// The magic number is validated during decoding and is not stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Wire format version.
    pub version: u16,
    /// Packet flags.
    pub flags: PacketFlags,
    /// Hash of the object type table; both sides must agree.
    pub protocol_hash: u64,
    /// Per-connection packet sequence, starting at 1.
    pub sequence: u32,
    /// Payload length in bytes.
    pub payload_len: u32,
}

impl PacketHeader {
    /// Creates a header for a ghost data packet.
    #[must_use]
    pub const fn ghost_data(protocol_hash: u64, sequence: u32, payload_len: u32) -> Self {
        Self {
            version: VERSION,
            flags: PacketFlags::ghost_data(),
            protocol_hash,
            sequence,
            payload_len,
        }
    }

    /// Creates a header for a disconnect packet. Disconnects have no payload.
    #[must_use]
    pub const fn disconnect(protocol_hash: u64, sequence: u32) -> Self {
        Self {
            version: VERSION,
            flags: PacketFlags::disconnect(),
            protocol_hash,
            sequence,
            payload_len: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_is_ghst_ascii() {
        let bytes = MAGIC.to_be_bytes();
        assert_eq!(&bytes, b"GHST");
    }

    #[test]
    fn header_size_is_correct() {
        // magic(4) + version(2) + flags(2) + protocol_hash(8) + sequence(4) + payload_len(4)
        assert_eq!(HEADER_SIZE, 24);
    }

    #[test]
    fn flags_ghost_data() {
        let flags = PacketFlags::ghost_data();
        assert!(flags.is_ghost_data());
        assert!(!flags.is_disconnect());
        assert!(flags.is_valid());
        assert_eq!(flags.raw(), 0b01);
    }

    #[test]
    fn flags_disconnect() {
        let flags = PacketFlags::disconnect();
        assert!(flags.is_disconnect());
        assert!(flags.is_valid());
    }

    #[test]
    fn flags_invalid_combinations() {
        assert!(!PacketFlags::default().is_valid());
        assert!(!PacketFlags::from_raw(0b11).is_valid());
        assert!(!PacketFlags::from_raw(0b101).is_valid());
        assert!(!PacketFlags::from_raw(0xFF01).is_valid());
    }

    #[test]
    fn header_ghost_data() {
        let header = PacketHeader::ghost_data(0x1234_5678_9ABC_DEF0, 7, 512);
        assert_eq!(header.version, VERSION);
        assert!(header.flags.is_ghost_data());
        assert_eq!(header.protocol_hash, 0x1234_5678_9ABC_DEF0);
        assert_eq!(header.sequence, 7);
        assert_eq!(header.payload_len, 512);
    }

    #[test]
    fn header_disconnect_has_no_payload() {
        let header = PacketHeader::disconnect(0xABCD, 9);
        assert!(header.flags.is_disconnect());
        assert_eq!(header.payload_len, 0);
    }

    #[test]
    fn header_const_constructible() {
        const HEADER: PacketHeader = PacketHeader::ghost_data(0, 1, 0);
        assert_eq!(HEADER.sequence, 1);
    }
}
