//! Configurable limits for bounded decoding.

/// Wire-level limits for packet encoding and decoding.
///
/// The packer never produces a packet larger than `max_packet_bytes`; the
/// decoder rejects anything that exceeds these limits before iterating.
/// Section body parsing limits belong to the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Limits {
    /// Maximum packet size in bytes, header included.
    pub max_packet_bytes: usize,

    /// Maximum number of sections in a packet.
    pub max_sections: usize,

    /// Maximum length of a single section body in bytes.
    pub max_section_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // Stay below a typical 1500 byte Ethernet MTU after IP/UDP headers.
            max_packet_bytes: 1400,

            // Destroy, create and update sections.
            max_sections: 3,
            max_section_len: 1400,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_packet_bytes: 512,
            max_sections: 3,
            max_section_len: 512,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_packet_bytes: usize::MAX,
            max_sections: usize::MAX,
            max_section_len: usize::MAX,
        }
    }
}
