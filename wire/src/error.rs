//! Framing errors.

use std::fmt;

/// Result type for header and section decoding.
pub type WireResult<T> = Result<T, DecodeError>;

/// Why a datagram was not accepted as a ghostwire packet.
///
/// Every variant is raised before any section body is handed to the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Shorter than the fixed header.
    PacketTooSmall { actual: usize, required: usize },

    /// Not a ghostwire packet.
    InvalidMagic { found: u32 },

    UnsupportedVersion { found: u16 },

    /// Reserved flag bits are set.
    InvalidFlags { flags: u16 },

    /// Sequence numbers start at 1; zero is never sent.
    InvalidSequence { sequence: u32 },

    /// The header's payload length disagrees with the datagram.
    PayloadLengthMismatch { header_len: u32, actual_len: usize },

    /// Disconnect packets carry no sections.
    UnexpectedPayload { flags: u16, payload_len: u32 },

    UnknownSectionTag { tag: u8 },

    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    SectionFraming(SectionFramingError),
}

/// Which [`Limits`](crate::Limits) field was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    PacketBytes,
    SectionCount,
    SectionLength,
}

/// A section's tag or length prefix could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionFramingError {
    InvalidVarint,
    Truncated { needed: usize, available: usize },
}

/// Errors writing a header or section into a caller buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    BufferTooSmall { needed: usize, available: usize },
    /// A section body is too long for its length prefix.
    LengthOverflow { length: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketTooSmall { actual, required } => {
                write!(f, "{actual}-byte datagram is shorter than the {required}-byte header")
            }
            Self::InvalidMagic { found } => write!(f, "bad magic 0x{found:08X}"),
            Self::UnsupportedVersion { found } => write!(f, "wire version {found} not supported"),
            Self::InvalidFlags { flags } => write!(f, "reserved flag bits set in 0x{flags:04X}"),
            Self::InvalidSequence { sequence } => write!(f, "invalid packet sequence {sequence}"),
            Self::PayloadLengthMismatch {
                header_len,
                actual_len,
            } => write!(
                f,
                "header announces {header_len} payload bytes, datagram has {actual_len}"
            ),
            Self::UnexpectedPayload { flags, payload_len } => write!(
                f,
                "flags 0x{flags:04X} forbid a payload, got {payload_len} bytes"
            ),
            Self::UnknownSectionTag { tag } => write!(f, "unknown section tag {tag}"),
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => write!(f, "{kind} {actual} over limit {limit}"),
            Self::SectionFraming(_) => f.write_str("malformed section framing"),
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PacketBytes => "packet bytes",
            Self::SectionCount => "section count",
            Self::SectionLength => "section length",
        })
    }
}

impl fmt::Display for SectionFramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVarint => f.write_str("section length is not a valid varint"),
            Self::Truncated { needed, available } => {
                write!(f, "section needs {needed} bytes, {available} remain")
            }
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { needed, available } => {
                write!(f, "output buffer holds {available} bytes, {needed} needed")
            }
            Self::LengthOverflow { length } => {
                write!(f, "section body of {length} bytes cannot be framed")
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SectionFraming(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for SectionFramingError {}

impl std::error::Error for EncodeError {}

impl From<SectionFramingError> for DecodeError {
    fn from(err: SectionFramingError) -> Self {
        Self::SectionFraming(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn magic_is_shown_in_hex() {
        let err = DecodeError::InvalidMagic { found: 0x5453_4847 };
        assert_eq!(err.to_string(), "bad magic 0x54534847");
    }

    #[test]
    fn limit_message_names_the_limit() {
        let err = DecodeError::LimitsExceeded {
            kind: LimitKind::SectionCount,
            limit: 3,
            actual: 4,
        };
        assert_eq!(err.to_string(), "section count 4 over limit 3");
    }

    #[test]
    fn framing_errors_chain() {
        let err = DecodeError::from(SectionFramingError::Truncated {
            needed: 10,
            available: 4,
        });
        assert_eq!(err.to_string(), "malformed section framing");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("section needs 10 bytes, 4 remain"));
    }

    #[test]
    fn disconnect_payload_message() {
        let err = DecodeError::UnexpectedPayload {
            flags: 1,
            payload_len: 3,
        };
        assert!(err.to_string().contains("forbid a payload"));
        assert!(err.source().is_none());
    }

    #[test]
    fn encode_error_display() {
        let err = EncodeError::LengthOverflow { length: usize::MAX };
        assert!(err.to_string().starts_with("section body of"));
    }
}
