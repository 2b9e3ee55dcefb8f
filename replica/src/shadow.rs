//! Observer-side shadow objects.
//!
//! A packet is decoded in full before anything is applied, so a malformed
//! packet never leaves shadows half updated. Application is last-writer-wins
//! per field: every shadow remembers the sequence that last wrote each field
//! and only a newer packet may overwrite it. Destroys leave tombstones so a
//! late create for a dead incarnation is recognised as stale.

use std::collections::BTreeMap;

use codec::{CreateEntry, DecodedPacket, FieldDelta, ObjectId, UpdateCodec, UpdateEntry};
use model::{
    canonical_slots, on_overlap, EffectDecision, FieldSlot, GateOutcome, ObjectState,
    ObjectTypeId, OverlapSubject,
};

use crate::config::ReplicationConfig;
use crate::error::ReplicaResult;

/// What one packet did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    pub sequence: u32,
    /// The packet closed the stream and every shadow was dropped.
    pub disconnect: bool,
    /// The packet predates a disconnect and was ignored.
    pub ignored: bool,
    pub created: usize,
    pub destroyed: usize,
    pub fields_applied: usize,
    /// Fields skipped because a newer packet already wrote them.
    pub fields_stale: usize,
    /// Creates older than the shadow or tombstone they target.
    pub stale_creates: usize,
    /// Updates for ids this store never saw created.
    pub unknown_updates: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct Shadow {
    state: ObjectState,
    created: u32,
    /// Indexed by field bit.
    field_sequences: Vec<u32>,
}

impl Shadow {
    fn new(state: ObjectState, sequence: u32) -> Self {
        let fields = state.type_id.info().field_count();
        Self {
            state,
            created: sequence,
            field_sequences: vec![sequence; fields],
        }
    }

    fn newest_write(&self) -> u32 {
        self.field_sequences
            .iter()
            .copied()
            .fold(self.created, u32::max)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Live(Shadow),
    Tombstone(u32),
}

/// Shadows of the host's objects, as seen by one observer.
#[derive(Debug, Clone)]
pub struct ShadowStore {
    codec: UpdateCodec,
    entries: BTreeMap<ObjectId, Entry>,
    disconnected_at: Option<u32>,
}

impl ShadowStore {
    pub fn new(config: &ReplicationConfig) -> ReplicaResult<Self> {
        Ok(Self {
            codec: UpdateCodec::new(
                config.precision_bits,
                config.wire_limits.clone(),
                config.codec_limits.clone(),
            )?,
            entries: BTreeMap::new(),
            disconnected_at: None,
        })
    }

    /// Decodes and applies one packet. On error nothing is changed.
    pub fn unpack_update(&mut self, bytes: &[u8]) -> ReplicaResult<ApplyReport> {
        let packet = self.codec.decode(bytes).map_err(|err| {
            log::warn!("rejected update packet: {err}");
            err
        })?;
        let report = self.apply(packet);
        log::trace!("applied packet {}: {report:?}", report.sequence);
        Ok(report)
    }

    /// Live shadow state.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&ObjectState> {
        match self.entries.get(&id) {
            Some(Entry::Live(shadow)) => Some(&shadow.state),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_tombstoned(&self, id: ObjectId) -> bool {
        matches!(self.entries.get(&id), Some(Entry::Tombstone(_)))
    }

    /// Number of live shadows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live shadows in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectState)> + '_ {
        self.entries.iter().filter_map(|(id, entry)| match entry {
            Entry::Live(shadow) => Some((*id, &shadow.state)),
            Entry::Tombstone(_) => None,
        })
    }

    #[must_use]
    pub fn find_by_type(&self, type_id: ObjectTypeId) -> Vec<ObjectId> {
        self.iter()
            .filter(|(_, state)| state.type_id == type_id)
            .map(|(id, _)| id)
            .collect()
    }

    /// Predicts the gate decision for two shadows. Observers can never turn
    /// this into an effect.
    #[must_use]
    pub fn predict_overlap(&self, zone: ObjectId, other: ObjectId) -> Option<GateOutcome> {
        let zone = self.get(zone)?;
        let other = self.get(other)?;
        let decision = if zone.type_id.info().capabilities.is_zone() {
            let subject = OverlapSubject {
                team: other.team,
                is_ship: other.type_id.info().capabilities.is_ship(),
            };
            on_overlap(zone.team, subject)
        } else {
            EffectDecision::NoEffect
        };
        Some(GateOutcome::Predicted { decision })
    }

    /// Drops every shadow and tombstone.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn apply(&mut self, packet: DecodedPacket) -> ApplyReport {
        let sequence = packet.sequence;
        let mut report = ApplyReport {
            sequence,
            ..ApplyReport::default()
        };
        if self.disconnected_at.is_some_and(|closed| sequence <= closed) {
            report.ignored = true;
            return report;
        }
        if packet.disconnect {
            self.entries.clear();
            self.disconnected_at = Some(sequence);
            report.disconnect = true;
            return report;
        }

        for id in packet.destroys {
            self.apply_destroy(sequence, id, &mut report);
        }
        for entry in packet.creates {
            self.apply_create(sequence, entry, &mut report);
        }
        for entry in packet.updates {
            self.apply_update(sequence, entry, &mut report);
        }
        report
    }

    fn apply_destroy(&mut self, sequence: u32, id: ObjectId, report: &mut ApplyReport) {
        let (newer, live) = match self.entries.get(&id) {
            Some(Entry::Live(shadow)) => (sequence > shadow.created, true),
            Some(Entry::Tombstone(at)) => (sequence > *at, false),
            None => (true, false),
        };
        if newer {
            self.entries.insert(id, Entry::Tombstone(sequence));
            if live {
                report.destroyed += 1;
            }
        }
    }

    fn apply_create(&mut self, sequence: u32, entry: CreateEntry, report: &mut ApplyReport) {
        let CreateEntry { id, state } = entry;
        match self.entries.get_mut(&id) {
            Some(Entry::Live(shadow)) if shadow.state.type_id == state.type_id => {
                if sequence <= shadow.created {
                    report.stale_creates += 1;
                    return;
                }
                shadow.created = sequence;
                for slot in canonical_slots(state.type_id.info()) {
                    let index = slot.bit_index() as usize;
                    if sequence > shadow.field_sequences[index] {
                        copy_field(&mut shadow.state, &state, slot);
                        shadow.field_sequences[index] = sequence;
                        report.fields_applied += 1;
                    } else {
                        report.fields_stale += 1;
                    }
                }
                report.created += 1;
            }
            Some(Entry::Live(shadow)) => {
                if sequence > shadow.newest_write() {
                    self.entries.insert(id, Entry::Live(Shadow::new(state, sequence)));
                    report.created += 1;
                } else {
                    report.stale_creates += 1;
                }
            }
            Some(Entry::Tombstone(at)) if *at >= sequence => report.stale_creates += 1,
            Some(Entry::Tombstone(_)) | None => {
                self.entries.insert(id, Entry::Live(Shadow::new(state, sequence)));
                report.created += 1;
            }
        }
    }

    fn apply_update(&mut self, sequence: u32, entry: UpdateEntry, report: &mut ApplyReport) {
        let UpdateEntry { id, delta } = entry;
        match self.entries.get_mut(&id) {
            Some(Entry::Live(shadow)) if shadow.state.type_id == delta.type_id => {
                for value in &delta.values {
                    let index = value.slot().bit_index() as usize;
                    match shadow.field_sequences.get_mut(index) {
                        Some(written) if sequence > *written => {
                            FieldDelta::apply_value(&mut shadow.state, value);
                            *written = sequence;
                            report.fields_applied += 1;
                        }
                        _ => report.fields_stale += 1,
                    }
                }
            }
            Some(Entry::Tombstone(_)) => report.fields_stale += delta.values.len(),
            Some(Entry::Live(_)) | None => {
                log::debug!("update for unknown {id} at packet {sequence}");
                report.unknown_updates += 1;
            }
        }
    }
}

fn copy_field(target: &mut ObjectState, source: &ObjectState, slot: FieldSlot) {
    match slot {
        FieldSlot::Team => target.team = source.team,
        FieldSlot::Geometry => target.geometry.clone_from(&source.geometry),
        FieldSlot::Scalar(index) => {
            if let (Some(to), Some(from)) = (target.scalars.get_mut(index), source.scalars.get(index)) {
                *to = *from;
            }
        }
    }
}
