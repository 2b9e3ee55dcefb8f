//! Wire framing and packet layout for ghostwire update streams.
//!
//! This crate handles the binary wire format: packet headers, section framing,
//! and limit enforcement. It does not know about object types, only the
//! structure of packets.
//!
//! # Design Principles
//!
//! - **Stable wire format** - The format is versioned; the header is little-endian.
//! - **Bounded decoding** - All length fields are validated against limits before iteration.
//! - **No domain knowledge** - Section bodies are opaque bytes here.

mod error;
mod header;
mod limits;
mod packet;

pub use error::{DecodeError, EncodeError, LimitKind, SectionFramingError, WireResult};
pub use header::{PacketFlags, PacketHeader, HEADER_SIZE, MAGIC, VERSION};
pub use limits::Limits;
pub use packet::{
    decode_packet, decode_sections, encode_header, encode_section, section_len, SectionTag,
    WirePacket, WireSection,
};
