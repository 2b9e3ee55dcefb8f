//! Update packets: packing on the host, decoding on observers.
//!
//! Each section body is a run of entries, every entry preceded by a `1` bit
//! and the run closed by a `0` bit:
//!
//! - `GhostDestroy`: object id.
//! - `GhostCreate`: object id, type id, full state.
//! - `GhostUpdate`: object id, type id, flagged fields.
//!
//! Object ids are bit-packed varints (see [`ObjectId::write`]).

use std::collections::HashSet;

use bitstream::{varu32_len, BitReader, BitWriter};
use model::{protocol_hash, ObjectState, ObjectTypeId, UpdateMask, TYPE_ID_BITS};
use wire::{decode_packet, encode_header, encode_section, section_len, PacketHeader, SectionTag};

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::fields::{FieldDelta, FieldEncoder, ObjectView};
use crate::limits::CodecLimits;
use crate::types::ObjectId;

const SECTION_ORDER: [SectionTag; 3] = [
    SectionTag::GhostDestroy,
    SectionTag::GhostCreate,
    SectionTag::GhostUpdate,
];

const fn section_index(tag: SectionTag) -> usize {
    match tag {
        SectionTag::GhostDestroy => 0,
        SectionTag::GhostCreate => 1,
        SectionTag::GhostUpdate => 2,
    }
}

/// A decoded create entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateEntry {
    pub id: ObjectId,
    pub state: ObjectState,
}

/// A decoded update entry.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEntry {
    pub id: ObjectId,
    pub delta: FieldDelta,
}

/// A fully decoded update packet. Nothing has been applied yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedPacket {
    pub sequence: u32,
    pub disconnect: bool,
    pub destroys: Vec<ObjectId>,
    pub creates: Vec<CreateEntry>,
    pub updates: Vec<UpdateEntry>,
}

impl DecodedPacket {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destroys.is_empty() && self.creates.is_empty() && self.updates.is_empty()
    }
}

/// Packet codec bound to one precision and set of limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCodec {
    fields: FieldEncoder,
    protocol_hash: u64,
    wire_limits: wire::Limits,
    limits: CodecLimits,
}

impl UpdateCodec {
    pub fn new(
        precision_bits: u8,
        wire_limits: wire::Limits,
        limits: CodecLimits,
    ) -> CodecResult<Self> {
        Ok(Self {
            fields: FieldEncoder::new(precision_bits)?,
            protocol_hash: protocol_hash(precision_bits),
            wire_limits,
            limits,
        })
    }

    #[must_use]
    pub const fn fields(&self) -> &FieldEncoder {
        &self.fields
    }

    #[must_use]
    pub const fn protocol_hash(&self) -> u64 {
        self.protocol_hash
    }

    #[must_use]
    pub const fn wire_limits(&self) -> &wire::Limits {
        &self.wire_limits
    }

    #[must_use]
    pub const fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// Starts a ghost data packet.
    #[must_use]
    pub fn builder(&self, sequence: u32) -> PacketBuilder<'_> {
        PacketBuilder {
            codec: self,
            sequence,
            sections: Default::default(),
        }
    }

    /// Encodes a disconnect packet.
    pub fn encode_disconnect(&self, sequence: u32) -> CodecResult<Vec<u8>> {
        let header = PacketHeader::disconnect(self.protocol_hash, sequence);
        let mut out = vec![0u8; wire::HEADER_SIZE];
        encode_header(&header, &mut out)?;
        Ok(out)
    }

    /// Decodes a whole packet. Any error rejects the packet as a unit.
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<DecodedPacket> {
        let packet = decode_packet(bytes, &self.wire_limits)?;
        let header = packet.header;
        if header.protocol_hash != self.protocol_hash {
            return Err(CodecError::ProtocolMismatch {
                expected: self.protocol_hash,
                found: header.protocol_hash,
            });
        }

        let mut decoded = DecodedPacket {
            sequence: header.sequence,
            disconnect: header.flags.is_disconnect(),
            ..DecodedPacket::default()
        };
        let mut seen = [false; 3];
        for section in &packet.sections {
            let index = section_index(section.tag);
            if seen[index] {
                return Err(CodecError::DuplicateSection {
                    section: section.tag,
                });
            }
            seen[index] = true;
            if section.body.len() > self.limits.max_section_bytes {
                return Err(CodecError::LimitsExceeded {
                    kind: LimitKind::SectionBytes,
                    limit: self.limits.max_section_bytes,
                    actual: section.body.len(),
                });
            }

            let mut reader = BitReader::new(section.body);
            match section.tag {
                SectionTag::GhostDestroy => {
                    decoded.destroys = self.decode_destroys(&mut reader)?;
                }
                SectionTag::GhostCreate => {
                    decoded.creates = self.decode_creates(&mut reader)?;
                }
                SectionTag::GhostUpdate => {
                    decoded.updates = self.decode_updates(&mut reader)?;
                }
            }
            ensure_consumed(&reader, section.tag)?;
        }
        Ok(decoded)
    }

    fn decode_destroys(&self, reader: &mut BitReader<'_>) -> CodecResult<Vec<ObjectId>> {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        while reader.read_bool()? {
            check_count(LimitKind::Destroys, self.limits.max_destroys, ids.len())?;
            let id = read_unique_id(reader, &mut seen, SectionTag::GhostDestroy)?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn decode_creates(&self, reader: &mut BitReader<'_>) -> CodecResult<Vec<CreateEntry>> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        while reader.read_bool()? {
            check_count(LimitKind::Creates, self.limits.max_creates, entries.len())?;
            let id = read_unique_id(reader, &mut seen, SectionTag::GhostCreate)?;
            let type_id = read_type_id(reader)?;
            let state = self.fields.decode_full(type_id, reader)?.into_state()?;
            entries.push(CreateEntry { id, state });
        }
        Ok(entries)
    }

    fn decode_updates(&self, reader: &mut BitReader<'_>) -> CodecResult<Vec<UpdateEntry>> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        while reader.read_bool()? {
            check_count(LimitKind::Updates, self.limits.max_updates, entries.len())?;
            let id = read_unique_id(reader, &mut seen, SectionTag::GhostUpdate)?;
            let type_id = read_type_id(reader)?;
            let delta = self.fields.decode_fields(type_id, reader)?;
            if delta.is_empty() {
                return Err(CodecError::EmptyUpdate { id: id.raw() });
            }
            entries.push(UpdateEntry { id, delta });
        }
        Ok(entries)
    }
}

fn check_count(kind: LimitKind, limit: usize, current: usize) -> CodecResult<()> {
    if current >= limit {
        return Err(CodecError::LimitsExceeded {
            kind,
            limit,
            actual: current + 1,
        });
    }
    Ok(())
}

fn read_unique_id(
    reader: &mut BitReader<'_>,
    seen: &mut HashSet<ObjectId>,
    section: SectionTag,
) -> CodecResult<ObjectId> {
    let id = ObjectId::read(reader)?;
    if !seen.insert(id) {
        return Err(CodecError::DuplicateObject {
            section,
            id: id.raw(),
        });
    }
    Ok(id)
}

fn read_type_id(reader: &mut BitReader<'_>) -> CodecResult<ObjectTypeId> {
    let raw = reader.read_bits(TYPE_ID_BITS)? as u8;
    Ok(ObjectTypeId::from_raw(raw)?)
}

fn ensure_consumed(reader: &BitReader<'_>, section: SectionTag) -> CodecResult<()> {
    let remaining_bits = reader.bits_remaining();
    if remaining_bits >= 8 {
        return Err(CodecError::TrailingSectionData {
            section,
            remaining_bits,
        });
    }
    Ok(())
}

#[derive(Debug, Default)]
struct SectionBuf {
    writer: BitWriter,
    entries: usize,
}

impl SectionBuf {
    /// Body size after adding `extra_bits`, terminator included.
    fn body_bytes_with(&self, extra_bits: usize) -> usize {
        self.writer
            .bits_written()
            .saturating_add(extra_bits)
            .saturating_add(1)
            .div_ceil(8)
    }

    /// Framed size after adding `extra_bits`; empty sections are not sent.
    fn framed_len_with(&self, extra_bits: usize) -> usize {
        if self.entries == 0 && extra_bits == 0 {
            return 0;
        }
        let body = self.body_bytes_with(extra_bits);
        (1 + varu32_len(u32::try_from(body).unwrap_or(u32::MAX))).saturating_add(body)
    }
}

/// Incrementally packs entries while keeping the packet within limits.
///
/// Every `try_*` method either writes a whole entry or nothing. If one of
/// them returns an error the builder must be discarded.
#[derive(Debug)]
pub struct PacketBuilder<'a> {
    codec: &'a UpdateCodec,
    sequence: u32,
    sections: [SectionBuf; 3],
}

impl PacketBuilder<'_> {
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.entries == 0)
    }

    /// Entries written to a section so far.
    #[must_use]
    pub fn entry_count(&self, tag: SectionTag) -> usize {
        self.sections[section_index(tag)].entries
    }

    /// Current packet size in bytes, header included.
    #[must_use]
    pub fn packet_len(&self) -> usize {
        self.projected_len(SectionTag::GhostDestroy, 0)
    }

    /// Queues a destroy notice. `false` if it does not fit.
    pub fn try_destroy(&mut self, id: ObjectId) -> CodecResult<bool> {
        let tag = SectionTag::GhostDestroy;
        if !self.has_room(tag, self.codec.limits.max_destroys) {
            return Ok(false);
        }
        if !self.fits(tag, 1 + id.encoded_bits()) {
            return Ok(false);
        }
        let section = &mut self.sections[section_index(tag)];
        section.writer.write_bool(true);
        id.write(&mut section.writer)?;
        section.entries += 1;
        Ok(true)
    }

    /// Queues a create with full state. `false` if it does not fit.
    pub fn try_create(&mut self, id: ObjectId, object: ObjectView<'_>) -> CodecResult<bool> {
        let tag = SectionTag::GhostCreate;
        if !self.has_room(tag, self.codec.limits.max_creates) {
            return Ok(false);
        }
        let bits = entry_header_bits(id) + self.codec.fields.full_bits(object);
        if !self.fits(tag, bits) {
            return Ok(false);
        }
        let fields = self.codec.fields;
        let section = &mut self.sections[section_index(tag)];
        section.writer.write_bool(true);
        id.write(&mut section.writer)?;
        section
            .writer
            .write_bits(u64::from(object.type_id.raw()), TYPE_ID_BITS)?;
        fields.encode_full(object, &mut section.writer)?;
        section.entries += 1;
        Ok(true)
    }

    /// Queues as many fields of `mask` as fit. Returns the fields written;
    /// empty means no entry was written.
    pub fn try_update(
        &mut self,
        id: ObjectId,
        object: ObjectView<'_>,
        mask: UpdateMask,
    ) -> CodecResult<UpdateMask> {
        let tag = SectionTag::GhostUpdate;
        if mask.is_empty() || !self.has_room(tag, self.codec.limits.max_updates) {
            return Ok(UpdateMask::EMPTY);
        }
        let header_bits = entry_header_bits(id);
        let available = self.max_extra_bits(tag);
        let flag_bits = object.type_id.info().field_count();
        if available < header_bits + flag_bits {
            return Ok(UpdateMask::EMPTY);
        }
        let budget = available - header_bits;
        let fields = self.codec.fields;
        let planned = fields.plan_fields(object, mask, budget);
        if planned.is_empty() {
            return Ok(UpdateMask::EMPTY);
        }
        let section = &mut self.sections[section_index(tag)];
        section.writer.write_bool(true);
        id.write(&mut section.writer)?;
        section
            .writer
            .write_bits(u64::from(object.type_id.raw()), TYPE_ID_BITS)?;
        let written = fields.encode_fields(object, planned, budget, &mut section.writer)?;
        section.entries += 1;
        Ok(written)
    }

    /// Frames the sections and writes the header.
    pub fn finish(self) -> CodecResult<Vec<u8>> {
        let mut payload = Vec::with_capacity(self.packet_len());
        for (tag, section) in SECTION_ORDER.into_iter().zip(self.sections) {
            if section.entries == 0 {
                continue;
            }
            let mut writer = section.writer;
            writer.write_bool(false);
            let body = writer.finish();
            let framed_len = section_len(body.len()).ok_or(wire::EncodeError::LengthOverflow {
                length: body.len(),
            })?;
            let start = payload.len();
            payload.resize(start + framed_len, 0);
            encode_section(tag, &body, &mut payload[start..])?;
        }

        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            wire::EncodeError::LengthOverflow {
                length: payload.len(),
            }
        })?;
        let header = PacketHeader::ghost_data(self.codec.protocol_hash, self.sequence, payload_len);
        let mut out = vec![0u8; wire::HEADER_SIZE];
        encode_header(&header, &mut out)?;
        out.extend_from_slice(&payload);
        log::trace!(
            "packed packet {} with {} bytes",
            self.sequence,
            out.len()
        );
        Ok(out)
    }

    fn has_room(&self, tag: SectionTag, limit: usize) -> bool {
        self.sections[section_index(tag)].entries < limit
    }

    fn projected_len(&self, tag: SectionTag, extra_bits: usize) -> usize {
        let grown = section_index(tag);
        self.sections
            .iter()
            .enumerate()
            .map(|(index, section)| {
                section.framed_len_with(if index == grown { extra_bits } else { 0 })
            })
            .fold(wire::HEADER_SIZE, usize::saturating_add)
    }

    fn fits(&self, tag: SectionTag, extra_bits: usize) -> bool {
        let body = self.sections[section_index(tag)].body_bytes_with(extra_bits);
        let wire_limits = &self.codec.wire_limits;
        body <= wire_limits.max_section_len
            && body <= self.codec.limits.max_section_bytes
            && self.projected_len(tag, extra_bits) <= wire_limits.max_packet_bytes
    }

    /// Largest number of bits that can still be added to `tag`.
    fn max_extra_bits(&self, tag: SectionTag) -> usize {
        let mut low = 0usize;
        let mut high = self.codec.wire_limits.max_packet_bytes.saturating_mul(8);
        if !self.fits(tag, low) {
            return 0;
        }
        while low < high {
            let mid = low + (high - low).div_ceil(2);
            if self.fits(tag, mid) {
                low = mid;
            } else {
                high = mid - 1;
            }
        }
        low
    }
}

/// Entry flag, id and type id.
fn entry_header_bits(id: ObjectId) -> usize {
    1 + id.encoded_bits() + usize::from(TYPE_ID_BITS)
}
