//! Error types for codec operations.

use std::fmt;

use wire::SectionTag;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding ghost data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Wire format error.
    Wire(wire::DecodeError),

    /// Wire framing failed while encoding.
    Encode(wire::EncodeError),

    /// Bitstream error.
    Bitstream(bitstream::BitError),

    /// Object violates the model.
    Model(model::ModelError),

    /// Point count prefix is out of bounds for the geometry.
    MalformedGeometry { count: usize },

    /// Coordinate is not finite or outside the fixed-point range.
    CoordinateOutOfRange { point: usize },

    /// Packet was built against a different type table.
    ProtocolMismatch { expected: u64, found: u64 },

    /// Type id with no entry in the type table.
    UnknownObjectType { raw: u8 },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Section body had trailing bits after parsing.
    TrailingSectionData {
        section: SectionTag,
        remaining_bits: usize,
    },

    /// Duplicate section encountered.
    DuplicateSection { section: SectionTag },

    /// Same object listed twice in one section.
    DuplicateObject { section: SectionTag, id: u32 },

    /// Update entry with no fields present.
    EmptyUpdate { id: u32 },

    /// A full state was expected but these fields were missing.
    IncompleteState { missing: model::UpdateMask },
}

/// Specific limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Creates,
    Updates,
    Destroys,
    SectionBytes,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire error: {e}"),
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
            Self::MalformedGeometry { count } => {
                write!(f, "malformed geometry: {count} points")
            }
            Self::CoordinateOutOfRange { point } => {
                write!(f, "coordinate of point {point} out of range")
            }
            Self::ProtocolMismatch { expected, found } => {
                write!(
                    f,
                    "protocol hash mismatch: expected 0x{expected:016X}, found 0x{found:016X}"
                )
            }
            Self::UnknownObjectType { raw } => write!(f, "unknown object type {raw}"),
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::TrailingSectionData {
                section,
                remaining_bits,
            } => {
                write!(
                    f,
                    "trailing data in section {section:?}: {remaining_bits} bits"
                )
            }
            Self::DuplicateSection { section } => {
                write!(f, "duplicate section {section:?} in packet")
            }
            Self::DuplicateObject { section, id } => {
                write!(f, "object {id} listed twice in section {section:?}")
            }
            Self::EmptyUpdate { id } => write!(f, "update for object {id} has no fields"),
            Self::IncompleteState { missing } => {
                write!(f, "incomplete object state, missing {missing:?}")
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Creates => "creates",
            Self::Updates => "updates",
            Self::Destroys => "destroys",
            Self::SectionBytes => "section bytes",
        };
        write!(f, "{name}")
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wire(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Bitstream(e) => Some(e),
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wire::DecodeError> for CodecError {
    fn from(err: wire::DecodeError) -> Self {
        Self::Wire(err)
    }
}

impl From<wire::EncodeError> for CodecError {
    fn from(err: wire::EncodeError) -> Self {
        Self::Encode(err)
    }
}

impl From<bitstream::BitError> for CodecError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Bitstream(err)
    }
}

impl From<model::ModelError> for CodecError {
    fn from(err: model::ModelError) -> Self {
        match err {
            model::ModelError::UnknownTypeId { raw } => Self::UnknownObjectType { raw },
            other => Self::Model(other),
        }
    }
}
