//! Limits for codec-level decoding.

/// Per-packet entry limits, enforced by both the packer and the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodecLimits {
    /// Maximum number of entries in a ghost create section.
    pub max_creates: usize,
    /// Maximum number of entries in a ghost update section.
    pub max_updates: usize,
    /// Maximum number of entries in a ghost destroy section.
    pub max_destroys: usize,
    /// Maximum number of bytes in a section body.
    pub max_section_bytes: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_creates: 64,
            max_updates: 256,
            max_destroys: 256,
            max_section_bytes: 1400,
        }
    }
}

impl CodecLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_creates: 4,
            max_updates: 8,
            max_destroys: 8,
            max_section_bytes: 512,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_creates: usize::MAX,
            max_updates: usize::MAX,
            max_destroys: usize::MAX,
            max_section_bytes: usize::MAX,
        }
    }
}
