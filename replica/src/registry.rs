//! Host-side object registry and per-connection ghost tracking.
//!
//! The registry owns every replicated object. For each connection it keeps a
//! ghost record per scoped object (create status plus a dirty mask), the
//! destroy notices still owed to that observer, and the contents of every
//! packet that has not been acknowledged or reported lost yet.
//!
//! Updates for an object are held back until its create is acknowledged, so
//! an observer never receives field data for a shadow it cannot have.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use codec::{ObjectId, ObjectView, UpdateCodec};
use model::{
    on_overlap, zone_effect, EffectDecision, HostAuthority, NetworkObject, ObjectTypeId,
    OverlapSubject, Point, ScalarValue, Team, UpdateMask, ZoneEffect,
};

use crate::config::ReplicationConfig;
use crate::error::{ReplicaError, ReplicaResult};

/// Connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn{}", self.0)
    }
}

/// Decides which objects a connection should see.
///
/// Objects flagged `SCOPE_ALWAYS` are in scope regardless of the answer.
pub trait ScopeQuery {
    fn in_scope(&self, connection: ConnectionId, id: ObjectId, object: &NetworkObject) -> bool;
}

/// Scope containing every registered object.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeAll;

impl ScopeQuery for ScopeAll {
    fn in_scope(&self, _: ConnectionId, _: ObjectId, _: &NetworkObject) -> bool {
        true
    }
}

/// Replication state of one object for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GhostState {
    /// Not in scope; the observer should hold no shadow.
    Unscoped,
    /// In scope, full state not yet acknowledged.
    PendingInitial,
    /// Acknowledged, with fields waiting to be sent or acknowledged.
    Dirty,
    /// Observer shadow matches the last acknowledged state.
    Clean,
}

/// What a packet carried, kept until the transport reports its fate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentRecord {
    pub destroys: Vec<ObjectId>,
    pub creates: Vec<ObjectId>,
    /// Fields actually written per object.
    pub updates: Vec<(ObjectId, UpdateMask)>,
}

impl SentRecord {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destroys.is_empty() && self.creates.is_empty() && self.updates.is_empty()
    }

    /// Fields of `id` carried by this packet.
    #[must_use]
    pub fn update_mask(&self, id: ObjectId) -> UpdateMask {
        self.updates
            .iter()
            .filter(|(entry, _)| *entry == id)
            .fold(UpdateMask::EMPTY, |mask, (_, bits)| mask | *bits)
    }
}

/// A packed update ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPacket {
    pub sequence: u32,
    pub bytes: Vec<u8>,
    pub sent: SentRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreateStatus {
    Pending,
    InFlight(u32),
    Confirmed,
}

#[derive(Debug, Clone)]
struct GhostRecord {
    create: CreateStatus,
    dirty: UpdateMask,
    /// The observer may still hold a shadow from an earlier time in scope
    /// whose destroy notice was superseded or lost.
    stale_shadow: bool,
}

impl GhostRecord {
    const fn pending(stale_shadow: bool) -> Self {
        Self {
            create: CreateStatus::Pending,
            dirty: UpdateMask::EMPTY,
            stale_shadow,
        }
    }
}

#[derive(Debug, Clone)]
struct Connection {
    next_sequence: u32,
    ghosts: BTreeMap<ObjectId, GhostRecord>,
    pending_destroys: BTreeSet<ObjectId>,
    in_flight: BTreeMap<u32, SentRecord>,
}

impl Connection {
    fn new() -> Self {
        Self {
            next_sequence: 1,
            ghosts: BTreeMap::new(),
            pending_destroys: BTreeSet::new(),
            in_flight: BTreeMap::new(),
        }
    }

    /// Drops the ghost record and owes a destroy notice if the observer may
    /// already hold a shadow.
    fn retire(&mut self, id: ObjectId) {
        if let Some(record) = self.ghosts.remove(&id) {
            if record.create != CreateStatus::Pending || record.stale_shadow {
                self.pending_destroys.insert(id);
            }
        }
    }

    fn destroy_in_flight(&self, id: ObjectId) -> bool {
        self.in_flight.values().any(|sent| sent.destroys.contains(&id))
    }

    fn in_flight_bits(&self, id: ObjectId) -> UpdateMask {
        self.in_flight
            .values()
            .fold(UpdateMask::EMPTY, |mask, sent| mask | sent.update_mask(id))
    }
}

/// Authoritative object registry for the host.
#[derive(Debug, Clone)]
pub struct Registry {
    config: ReplicationConfig,
    codec: UpdateCodec,
    objects: BTreeMap<ObjectId, NetworkObject>,
    connections: BTreeMap<ConnectionId, Connection>,
    next_object_id: u32,
    next_connection_id: u32,
}

impl Registry {
    pub fn new(config: ReplicationConfig) -> ReplicaResult<Self> {
        let codec = UpdateCodec::new(
            config.precision_bits,
            config.wire_limits.clone(),
            config.codec_limits.clone(),
        )?;
        Ok(Self {
            config,
            codec,
            objects: BTreeMap::new(),
            connections: BTreeMap::new(),
            next_object_id: 1,
            next_connection_id: 1,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    #[must_use]
    pub const fn codec(&self) -> &UpdateCodec {
        &self.codec
    }

    /// Takes ownership of `object`, snaps its geometry to the wire grid and
    /// marks it ghostable. Ids start at 1 and are never reused.
    ///
    /// The object's team must be below the configured team count, neutral
    /// or hostile.
    pub fn register(&mut self, mut object: NetworkObject) -> ReplicaResult<ObjectId> {
        if self.objects.len() >= self.config.max_objects {
            return Err(ReplicaError::CapacityExceeded {
                max: self.config.max_objects,
            });
        }
        object.team().validate(self.config.team_count)?;
        let snapped = self
            .codec
            .fields()
            .geometry()
            .quantize_points(object.geometry())?;
        object.set_geometry(snapped)?;
        object.mark_ghostable();

        let id = ObjectId::new(self.next_object_id);
        self.next_object_id = self
            .next_object_id
            .checked_add(1)
            .ok_or(ReplicaError::IdsExhausted)?;
        log::debug!("registered {} as {id}", object.type_id());
        self.objects.insert(id, object);
        Ok(id)
    }

    /// Removes an object. Every connection that may hold a shadow of it gets
    /// exactly one destroy notice; its pending field updates are discarded.
    pub fn unregister(&mut self, id: ObjectId) -> ReplicaResult<NetworkObject> {
        let object = self
            .objects
            .remove(&id)
            .ok_or(ReplicaError::UnknownObject { id })?;
        for connection in self.connections.values_mut() {
            connection.retire(id);
        }
        log::debug!("unregistered {id}");
        Ok(object)
    }

    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&NetworkObject> {
        self.objects.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &NetworkObject)> + '_ {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    /// Ids of every object of `type_id` at call time, ascending.
    #[must_use]
    pub fn find_by_type(&self, type_id: ObjectTypeId) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, object)| object.type_id() == type_id)
            .map(|(id, _)| *id)
            .collect()
    }

    /// ORs `bits` into the dirty mask of every connection tracking `id`.
    /// Bits the object's type does not have are ignored.
    pub fn mark_dirty(&mut self, id: ObjectId, bits: UpdateMask) -> ReplicaResult<()> {
        let object = self
            .objects
            .get(&id)
            .ok_or(ReplicaError::UnknownObject { id })?;
        let bits = bits & UpdateMask::all_for(object.info());
        if bits.is_empty() {
            return Ok(());
        }
        for connection in self.connections.values_mut() {
            if let Some(record) = connection.ghosts.get_mut(&id) {
                record.dirty |= bits;
            }
        }
        Ok(())
    }

    pub fn set_team(&mut self, id: ObjectId, team: Team) -> ReplicaResult<()> {
        team.validate(self.config.team_count)?;
        let changed = self.object_mut(id)?.set_team(team)?;
        self.mark_dirty(id, changed)
    }

    /// Replaces the geometry, snapped to the wire grid.
    pub fn set_geometry(&mut self, id: ObjectId, geometry: Vec<Point>) -> ReplicaResult<()> {
        let snapped = self.codec.fields().geometry().quantize_points(&geometry)?;
        let changed = self.object_mut(id)?.set_geometry(snapped)?;
        self.mark_dirty(id, changed)
    }

    pub fn set_scalar(&mut self, id: ObjectId, index: usize, value: ScalarValue) -> ReplicaResult<()> {
        let changed = self.object_mut(id)?.set_scalar(index, value)?;
        self.mark_dirty(id, changed)
    }

    /// Packing priority; higher goes first.
    pub fn set_priority(&mut self, id: ObjectId, priority: u8) -> ReplicaResult<()> {
        self.object_mut(id)?.priority = priority;
        Ok(())
    }

    pub fn set_scope_always(&mut self, id: ObjectId, enabled: bool) -> ReplicaResult<()> {
        self.object_mut(id)?.set_scope_always(enabled);
        Ok(())
    }

    /// Executes a zone effect on `target`. Only the host can call this, since
    /// only a host context hands out [`HostAuthority`].
    ///
    /// Returns `None` when the gate decides the overlap has no effect.
    pub fn apply_zone_effect(
        &mut self,
        _authority: &HostAuthority,
        zone: ObjectId,
        target: ObjectId,
    ) -> ReplicaResult<Option<ZoneEffect>> {
        let zone_object = self
            .objects
            .get(&zone)
            .ok_or(ReplicaError::UnknownObject { id: zone })?;
        let target_object = self
            .objects
            .get(&target)
            .ok_or(ReplicaError::UnknownObject { id: target })?;
        if !zone_object.info().capabilities.is_zone()
            || on_overlap(zone_object.team(), OverlapSubject::of(target_object))
                == EffectDecision::NoEffect
        {
            return Ok(None);
        }
        let Some(effect) = zone_effect(zone_object) else {
            return Ok(None);
        };
        let info = target_object.info();
        match effect {
            ZoneEffect::Slip { amount } => {
                if let Some(index) = info.scalar_index("slip") {
                    self.set_scalar(target, index, ScalarValue::Float(amount))?;
                }
            }
            ZoneEffect::Loadout => {
                if let Some(index) = info.scalar_index("in_loadout") {
                    self.set_scalar(target, index, ScalarValue::Bool(true))?;
                }
            }
            ZoneEffect::Goal { .. } => {}
        }
        log::debug!("applied {effect:?} from {zone} to {target}");
        Ok(Some(effect))
    }

    pub fn add_connection(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id = self.next_connection_id.wrapping_add(1);
        self.connections.insert(id, Connection::new());
        log::debug!("added {id}");
        id
    }

    /// Drops all state kept for a connection. Objects are untouched.
    pub fn remove_connection(&mut self, connection: ConnectionId) -> ReplicaResult<()> {
        self.connections
            .remove(&connection)
            .map(|_| log::debug!("removed {connection}"))
            .ok_or(ReplicaError::UnknownConnection { connection })
    }

    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().copied()
    }

    pub fn ghost_state(&self, connection: ConnectionId, id: ObjectId) -> ReplicaResult<GhostState> {
        let conn = self.connection(connection)?;
        let Some(record) = conn.ghosts.get(&id) else {
            return Ok(GhostState::Unscoped);
        };
        Ok(match record.create {
            CreateStatus::Pending | CreateStatus::InFlight(_) => GhostState::PendingInitial,
            CreateStatus::Confirmed => {
                if record.dirty.is_empty() && conn.in_flight_bits(id).is_empty() {
                    GhostState::Clean
                } else {
                    GhostState::Dirty
                }
            }
        })
    }

    /// Destroy notices owed to a connection and not yet in flight.
    pub fn pending_destroys(&self, connection: ConnectionId) -> ReplicaResult<Vec<ObjectId>> {
        Ok(self
            .connection(connection)?
            .pending_destroys
            .iter()
            .copied()
            .collect())
    }

    /// Packets sent on a connection whose fate is not known yet.
    pub fn in_flight_count(&self, connection: ConnectionId) -> ReplicaResult<usize> {
        Ok(self.connection(connection)?.in_flight.len())
    }

    /// Builds the next packet for a connection, or `None` if there is
    /// nothing to send. Sequences start at 1 and only advance when a packet
    /// is produced.
    pub fn pack_update(
        &mut self,
        connection: ConnectionId,
        scope: &impl ScopeQuery,
    ) -> ReplicaResult<Option<OutgoingPacket>> {
        let conn = self
            .connections
            .get_mut(&connection)
            .ok_or(ReplicaError::UnknownConnection { connection })?;
        update_scope(connection, conn, &self.objects, scope);

        let sequence = conn.next_sequence;
        let next_sequence = sequence
            .checked_add(1)
            .ok_or(ReplicaError::SequenceExhausted { connection })?;

        let mut order: Vec<(ObjectId, &NetworkObject)> =
            self.objects.iter().map(|(id, object)| (*id, object)).collect();
        order.sort_by_key(|(id, object)| (std::cmp::Reverse(object.priority), *id));

        let mut builder = self.codec.builder(sequence);
        let mut sent = SentRecord::default();

        for id in &conn.pending_destroys {
            if builder.try_destroy(*id)? {
                sent.destroys.push(*id);
            }
        }
        for (id, object) in &order {
            let pending = conn
                .ghosts
                .get(id)
                .is_some_and(|record| record.create == CreateStatus::Pending);
            if pending && builder.try_create(*id, ObjectView::from(*object))? {
                sent.creates.push(*id);
            }
        }
        for (id, object) in &order {
            let Some(record) = conn.ghosts.get(id) else {
                continue;
            };
            if record.create != CreateStatus::Confirmed || record.dirty.is_empty() {
                continue;
            }
            let written = builder.try_update(*id, ObjectView::from(*object), record.dirty)?;
            if !written.is_empty() {
                sent.updates.push((*id, written));
            }
        }

        if builder.is_empty() {
            return Ok(None);
        }
        let bytes = builder.finish()?;

        for id in &sent.destroys {
            conn.pending_destroys.remove(id);
        }
        for id in &sent.creates {
            if let Some(record) = conn.ghosts.get_mut(id) {
                record.create = CreateStatus::InFlight(sequence);
                record.dirty = UpdateMask::EMPTY;
            }
        }
        for (id, written) in &sent.updates {
            if let Some(record) = conn.ghosts.get_mut(id) {
                record.dirty = record.dirty.difference(*written);
            }
        }
        conn.next_sequence = next_sequence;
        conn.in_flight.insert(sequence, sent.clone());
        log::trace!(
            "{connection} packet {sequence}: {} destroys, {} creates, {} updates, {} bytes",
            sent.destroys.len(),
            sent.creates.len(),
            sent.updates.len(),
            bytes.len()
        );
        Ok(Some(OutgoingPacket {
            sequence,
            bytes,
            sent,
        }))
    }

    /// The transport delivered `sequence`. Its fields are done, its creates
    /// are confirmed and its destroy notices are complete.
    pub fn on_packet_delivered(&mut self, connection: ConnectionId, sequence: u32) -> ReplicaResult<()> {
        let conn = self.connection_mut(connection)?;
        let Some(sent) = conn.in_flight.remove(&sequence) else {
            log::debug!("{connection}: delivery of unknown packet {sequence}");
            return Ok(());
        };
        for id in &sent.creates {
            if let Some(record) = conn.ghosts.get_mut(id) {
                if record.create == CreateStatus::InFlight(sequence) {
                    record.create = CreateStatus::Confirmed;
                }
            }
        }
        Ok(())
    }

    /// The transport lost `sequence`. Its fields go back into the dirty
    /// masks, its creates become pending again and its destroy notices are
    /// requeued. If the object came back into scope meanwhile the notice is
    /// not resent; the record remembers the old shadow instead.
    pub fn on_packet_dropped(&mut self, connection: ConnectionId, sequence: u32) -> ReplicaResult<()> {
        let conn = self.connection_mut(connection)?;
        let Some(sent) = conn.in_flight.remove(&sequence) else {
            log::debug!("{connection}: drop of unknown packet {sequence}");
            return Ok(());
        };
        for id in &sent.destroys {
            match conn.ghosts.get_mut(id) {
                Some(record) => record.stale_shadow = true,
                None => {
                    conn.pending_destroys.insert(*id);
                }
            }
        }
        for id in &sent.creates {
            if let Some(record) = conn.ghosts.get_mut(id) {
                if record.create == CreateStatus::InFlight(sequence) {
                    record.create = CreateStatus::Pending;
                }
            }
        }
        for (id, bits) in &sent.updates {
            if let Some(record) = conn.ghosts.get_mut(id) {
                record.dirty |= *bits;
            }
        }
        Ok(())
    }

    /// Emits the final packet of a connection and forgets it.
    pub fn pack_disconnect(&mut self, connection: ConnectionId) -> ReplicaResult<Vec<u8>> {
        let sequence = self.connection(connection)?.next_sequence;
        let bytes = self.codec.encode_disconnect(sequence)?;
        self.connections.remove(&connection);
        log::debug!("{connection} disconnected at packet {sequence}");
        Ok(bytes)
    }

    fn object_mut(&mut self, id: ObjectId) -> ReplicaResult<&mut NetworkObject> {
        self.objects
            .get_mut(&id)
            .ok_or(ReplicaError::UnknownObject { id })
    }

    fn connection(&self, connection: ConnectionId) -> ReplicaResult<&Connection> {
        self.connections
            .get(&connection)
            .ok_or(ReplicaError::UnknownConnection { connection })
    }

    fn connection_mut(&mut self, connection: ConnectionId) -> ReplicaResult<&mut Connection> {
        self.connections
            .get_mut(&connection)
            .ok_or(ReplicaError::UnknownConnection { connection })
    }
}

fn update_scope(
    connection: ConnectionId,
    conn: &mut Connection,
    objects: &BTreeMap<ObjectId, NetworkObject>,
    scope: &impl ScopeQuery,
) {
    for (id, object) in objects {
        let flags = object.ghost_flags();
        let wanted = flags.is_ghostable()
            && (flags.is_scope_always() || scope.in_scope(connection, *id, object));
        let tracked = conn.ghosts.contains_key(id);
        if wanted && !tracked {
            // A fresh create supersedes any notice not yet sent.
            let unsent = conn.pending_destroys.remove(id);
            let stale_shadow = unsent || conn.destroy_in_flight(*id);
            conn.ghosts.insert(*id, GhostRecord::pending(stale_shadow));
            log::debug!("{id} entered scope of {connection}");
        } else if !wanted && tracked {
            conn.retire(*id);
            log::debug!("{id} left scope of {connection}");
        }
    }
}
