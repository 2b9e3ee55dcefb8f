//! Packet decoding and section framing.

use bitstream::varu32_len;

use crate::error::{DecodeError, EncodeError, LimitKind, SectionFramingError, WireResult};
use crate::header::{PacketFlags, PacketHeader, HEADER_SIZE, MAGIC, VERSION};
use crate::limits::Limits;

/// Section tags for version 1.
///
/// Sections appear in tag order: destroys first, then creates, then updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SectionTag {
    GhostDestroy = 1,
    GhostCreate = 2,
    GhostUpdate = 3,
}

impl SectionTag {
    /// Parses a section tag from a raw byte.
    pub fn parse(tag: u8) -> Result<Self, DecodeError> {
        match tag {
            1 => Ok(Self::GhostDestroy),
            2 => Ok(Self::GhostCreate),
            3 => Ok(Self::GhostUpdate),
            _ => Err(DecodeError::UnknownSectionTag { tag }),
        }
    }
}

/// A section within a wire packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireSection<'a> {
    pub tag: SectionTag,
    pub body: &'a [u8],
}

/// A decoded wire packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePacket<'a> {
    pub header: PacketHeader,
    pub sections: Vec<WireSection<'a>>,
}

/// Decodes a wire packet into header + section slices.
pub fn decode_packet<'a>(buf: &'a [u8], limits: &Limits) -> WireResult<WirePacket<'a>> {
    if buf.len() < HEADER_SIZE {
        return Err(DecodeError::PacketTooSmall {
            actual: buf.len(),
            required: HEADER_SIZE,
        });
    }
    if buf.len() > limits.max_packet_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::PacketBytes,
            limit: limits.max_packet_bytes,
            actual: buf.len(),
        });
    }

    let magic = read_u32(buf, 0);
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic { found: magic });
    }

    let version = read_u16(buf, 4);
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion { found: version });
    }

    let flags_raw = read_u16(buf, 6);
    let flags = PacketFlags::from_raw(flags_raw);
    if !flags.is_valid() {
        return Err(DecodeError::InvalidFlags { flags: flags_raw });
    }

    let protocol_hash = read_u64(buf, 8);
    let sequence = read_u32(buf, 16);
    let payload_len = read_u32(buf, 20);

    if sequence == 0 {
        return Err(DecodeError::InvalidSequence { sequence });
    }

    let actual_payload_len = buf.len() - HEADER_SIZE;
    if payload_len as usize != actual_payload_len {
        return Err(DecodeError::PayloadLengthMismatch {
            header_len: payload_len,
            actual_len: actual_payload_len,
        });
    }
    if flags.is_disconnect() && payload_len != 0 {
        return Err(DecodeError::UnexpectedPayload {
            flags: flags_raw,
            payload_len,
        });
    }

    let header = PacketHeader {
        version,
        flags,
        protocol_hash,
        sequence,
        payload_len,
    };

    let payload = &buf[HEADER_SIZE..];
    let sections = decode_sections(payload, limits)?;

    Ok(WirePacket { header, sections })
}

/// Decodes sections from a payload buffer (no packet header).
pub fn decode_sections<'a>(payload: &'a [u8], limits: &Limits) -> WireResult<Vec<WireSection<'a>>> {
    let mut offset = 0usize;
    let mut sections = Vec::new();

    while offset < payload.len() {
        if sections.len() >= limits.max_sections {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::SectionCount,
                limit: limits.max_sections,
                actual: sections.len() + 1,
            });
        }

        let tag = payload[offset];
        offset += 1;
        let (len, new_offset) = read_varu32(payload, offset)?;
        offset = new_offset;
        let len = len as usize;

        if len > limits.max_section_len {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::SectionLength,
                limit: limits.max_section_len,
                actual: len,
            });
        }
        if offset + len > payload.len() {
            return Err(DecodeError::SectionFraming(
                SectionFramingError::Truncated {
                    needed: offset + len,
                    available: payload.len(),
                },
            ));
        }

        let tag = SectionTag::parse(tag)?;
        sections.push(WireSection {
            tag,
            body: &payload[offset..offset + len],
        });
        offset += len;
    }

    Ok(sections)
}

/// Encodes a packet header into the provided output buffer.
pub fn encode_header(header: &PacketHeader, out: &mut [u8]) -> Result<usize, EncodeError> {
    if out.len() < HEADER_SIZE {
        return Err(EncodeError::BufferTooSmall {
            needed: HEADER_SIZE,
            available: out.len(),
        });
    }

    out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    out[4..6].copy_from_slice(&header.version.to_le_bytes());
    out[6..8].copy_from_slice(&header.flags.raw().to_le_bytes());
    out[8..16].copy_from_slice(&header.protocol_hash.to_le_bytes());
    out[16..20].copy_from_slice(&header.sequence.to_le_bytes());
    out[20..24].copy_from_slice(&header.payload_len.to_le_bytes());

    Ok(HEADER_SIZE)
}

/// Encodes a single section into the provided output buffer.
pub fn encode_section(tag: SectionTag, body: &[u8], out: &mut [u8]) -> Result<usize, EncodeError> {
    let len_u32 = u32::try_from(body.len())
        .map_err(|_| EncodeError::LengthOverflow { length: body.len() })?;
    let needed = section_len(body.len()).ok_or(EncodeError::LengthOverflow {
        length: body.len(),
    })?;
    if out.len() < needed {
        return Err(EncodeError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    out[0] = tag as u8;
    let mut offset = 1;
    offset += write_varu32(len_u32, &mut out[offset..]);
    out[offset..offset + body.len()].copy_from_slice(body);
    Ok(needed)
}

/// Framed size of a section with a body of `body_len` bytes.
#[must_use]
pub fn section_len(body_len: usize) -> Option<usize> {
    let len = u32::try_from(body_len).ok()?;
    Some(1 + varu32_len(len) + body_len)
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

fn read_varu32(buf: &[u8], mut offset: usize) -> Result<(u32, usize), DecodeError> {
    let mut value = 0u64;
    for shift in (0..35).step_by(7) {
        let Some(&byte) = buf.get(offset) else {
            return Err(DecodeError::SectionFraming(
                SectionFramingError::Truncated {
                    needed: offset + 1,
                    available: buf.len(),
                },
            ));
        };
        offset += 1;
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            let value = u32::try_from(value)
                .map_err(|_| DecodeError::SectionFraming(SectionFramingError::InvalidVarint))?;
            return Ok((value, offset));
        }
    }
    Err(DecodeError::SectionFraming(
        SectionFramingError::InvalidVarint,
    ))
}

fn write_varu32(mut value: u32, out: &mut [u8]) -> usize {
    let mut offset = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out[offset] = byte;
        offset += 1;
        if value == 0 {
            break;
        }
    }
    offset
}
