//! Field delta encoding.
//!
//! Fields are written in canonical order (team, geometry, scalars). A delta
//! carries one presence bit per field of the object's type followed by the
//! value when present; a full state carries every value without flags.

use bitstream::{BitReader, BitWriter};
use model::{
    canonical_slots, FieldSlot, NetworkObject, ObjectState, ObjectTypeId, Point, ScalarCodec,
    ScalarValue, Team, UpdateMask, TEAM_BITS,
};

use crate::error::{CodecError, CodecResult};
use crate::geometry::GeometryCodec;

/// Borrowed view of an object's replicated fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectView<'a> {
    pub type_id: ObjectTypeId,
    pub team: Team,
    pub geometry: &'a [Point],
    pub scalars: &'a [ScalarValue],
}

impl<'a> From<&'a NetworkObject> for ObjectView<'a> {
    fn from(object: &'a NetworkObject) -> Self {
        Self {
            type_id: object.type_id(),
            team: object.team(),
            geometry: object.geometry(),
            scalars: object.scalars(),
        }
    }
}

impl<'a> From<&'a ObjectState> for ObjectView<'a> {
    fn from(state: &'a ObjectState) -> Self {
        Self {
            type_id: state.type_id,
            team: state.team,
            geometry: &state.geometry,
            scalars: &state.scalars,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Team(Team),
    Geometry(Vec<Point>),
    Scalar(usize, ScalarValue),
}

impl FieldValue {
    #[must_use]
    pub const fn slot(&self) -> FieldSlot {
        match self {
            Self::Team(_) => FieldSlot::Team,
            Self::Geometry(_) => FieldSlot::Geometry,
            Self::Scalar(index, _) => FieldSlot::Scalar(*index),
        }
    }
}

/// Decoded fields of one object, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDelta {
    pub type_id: ObjectTypeId,
    pub values: Vec<FieldValue>,
}

impl FieldDelta {
    /// Bits of the fields present.
    #[must_use]
    pub fn mask(&self) -> UpdateMask {
        self.values
            .iter()
            .fold(UpdateMask::EMPTY, |mask, value| mask | value.slot().mask())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes one field into a state of the same type.
    pub fn apply_value(state: &mut ObjectState, value: &FieldValue) {
        match value {
            FieldValue::Team(team) => state.team = *team,
            FieldValue::Geometry(points) => state.geometry.clone_from(points),
            FieldValue::Scalar(index, scalar) => {
                if let Some(slot) = state.scalars.get_mut(*index) {
                    *slot = *scalar;
                }
            }
        }
    }

    /// Builds a state from a delta that carries every field.
    pub fn into_state(self) -> CodecResult<ObjectState> {
        let info = self.type_id.info();
        let mut state = ObjectState {
            type_id: self.type_id,
            team: Team::NEUTRAL,
            geometry: Vec::new(),
            scalars: info.default_scalars(),
        };
        let missing = UpdateMask::all_for(info).difference(self.mask());
        if !missing.is_empty() {
            return Err(CodecError::IncompleteState { missing });
        }
        for value in &self.values {
            Self::apply_value(&mut state, value);
        }
        state.validate()?;
        Ok(state)
    }
}

/// Encodes and decodes object fields at a fixed geometry precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEncoder {
    geometry: GeometryCodec,
}

impl FieldEncoder {
    pub fn new(precision_bits: u8) -> CodecResult<Self> {
        Ok(Self {
            geometry: GeometryCodec::new(precision_bits)?,
        })
    }

    #[must_use]
    pub const fn geometry(&self) -> &GeometryCodec {
        &self.geometry
    }

    /// Fields that differ between two snapshots once both are on the wire grid.
    #[must_use]
    pub fn diff_mask(&self, previous: &ObjectState, current: &ObjectState) -> UpdateMask {
        let info = current.type_id.info();
        if previous.type_id != current.type_id {
            return UpdateMask::all_for(info);
        }
        let mut mask = UpdateMask::EMPTY;
        if previous.team != current.team {
            mask |= UpdateMask::TEAM;
        }
        if !self.same_geometry(&previous.geometry, &current.geometry) {
            mask |= UpdateMask::GEOMETRY;
        }
        for (index, def) in info.scalars.iter().enumerate() {
            let a = previous.scalars.get(index).and_then(|v| def.codec.quantize(*v));
            let b = current.scalars.get(index).and_then(|v| def.codec.quantize(*v));
            if a != b || a.is_none() {
                mask |= UpdateMask::scalar(index);
            }
        }
        mask
    }

    fn same_geometry(&self, a: &[Point], b: &[Point]) -> bool {
        match (
            self.geometry.quantize_points(a),
            self.geometry.quantize_points(b),
        ) {
            (Ok(qa), Ok(qb)) => qa == qb,
            _ => a == b,
        }
    }

    /// Encoded size of one field value, presence flag excluded.
    #[must_use]
    pub fn field_bits(&self, object: ObjectView<'_>, slot: FieldSlot) -> usize {
        match slot {
            FieldSlot::Team => usize::from(TEAM_BITS),
            FieldSlot::Geometry => self.geometry.encoded_bits(object.geometry.len()),
            FieldSlot::Scalar(index) => object
                .type_id
                .info()
                .scalars
                .get(index)
                .map_or(0, |def| usize::from(def.codec.bits())),
        }
    }

    /// Size of a full state.
    #[must_use]
    pub fn full_bits(&self, object: ObjectView<'_>) -> usize {
        canonical_slots(object.type_id.info())
            .map(|slot| self.field_bits(object, slot))
            .sum()
    }

    /// Fields of `mask` that `encode_fields` would write within `budget_bits`
    /// (presence flags included). Fields are taken in canonical order and a
    /// field that does not fit is skipped, leaving room for later ones.
    #[must_use]
    pub fn plan_fields(&self, object: ObjectView<'_>, mask: UpdateMask, budget_bits: usize) -> UpdateMask {
        let info = object.type_id.info();
        let mut remaining = budget_bits.saturating_sub(info.field_count());
        let mut planned = UpdateMask::EMPTY;
        for slot in mask.slots(info) {
            let bits = self.field_bits(object, slot);
            if bits <= remaining {
                remaining -= bits;
                planned |= slot.mask();
            }
        }
        planned
    }

    /// Writes a presence flag for every field of the type, followed by the
    /// value for each field in `mask` that fits the budget. Returns the bits
    /// actually written.
    pub fn encode_fields(
        &self,
        object: ObjectView<'_>,
        mask: UpdateMask,
        budget_bits: usize,
        writer: &mut BitWriter,
    ) -> CodecResult<UpdateMask> {
        let planned = self.plan_fields(object, mask, budget_bits);
        for slot in canonical_slots(object.type_id.info()) {
            if writer.write_flag(planned.contains(slot.mask())) {
                self.write_field(object, slot, writer)?;
            }
        }
        Ok(planned)
    }

    /// Writes every field without presence flags.
    pub fn encode_full(&self, object: ObjectView<'_>, writer: &mut BitWriter) -> CodecResult<()> {
        for slot in canonical_slots(object.type_id.info()) {
            self.write_field(object, slot, writer)?;
        }
        Ok(())
    }

    /// Reads a flagged delta for an object of `type_id`.
    pub fn decode_fields(
        &self,
        type_id: ObjectTypeId,
        reader: &mut BitReader<'_>,
    ) -> CodecResult<FieldDelta> {
        let mut values = Vec::new();
        for slot in canonical_slots(type_id.info()) {
            if reader.read_bool()? {
                values.push(self.read_field(type_id, slot, reader)?);
            }
        }
        Ok(FieldDelta { type_id, values })
    }

    /// Reads a full state for an object of `type_id`.
    pub fn decode_full(
        &self,
        type_id: ObjectTypeId,
        reader: &mut BitReader<'_>,
    ) -> CodecResult<FieldDelta> {
        let values = canonical_slots(type_id.info())
            .map(|slot| self.read_field(type_id, slot, reader))
            .collect::<CodecResult<Vec<_>>>()?;
        Ok(FieldDelta { type_id, values })
    }

    fn write_field(
        &self,
        object: ObjectView<'_>,
        slot: FieldSlot,
        writer: &mut BitWriter,
    ) -> CodecResult<()> {
        match slot {
            FieldSlot::Team => {
                if !object.team.fits_wire() {
                    return Err(model::ModelError::InvalidTeam {
                        team: i32::from(object.team.index()),
                        team_count: model::MAX_TEAMS,
                    }
                    .into());
                }
                writer.write_bits(u64::from(object.team.to_wire()), TEAM_BITS)?;
            }
            FieldSlot::Geometry => self.geometry.encode(object.geometry, writer)?,
            FieldSlot::Scalar(index) => {
                let info = object.type_id.info();
                let def = info.scalars.get(index);
                let value = object.scalars.get(index);
                let (Some(def), Some(value)) = (def, value) else {
                    return Err(model::ModelError::UnknownScalar {
                        type_id: object.type_id,
                        index,
                    }
                    .into());
                };
                match (def.codec, *value) {
                    (ScalarCodec::Bool, ScalarValue::Bool(b)) => writer.write_bool(b),
                    (ScalarCodec::UnitFloat { bits }, ScalarValue::Float(v)) => {
                        writer.write_unit_float(v, bits)?;
                    }
                    _ => {
                        return Err(model::ModelError::ScalarTypeMismatch {
                            type_id: object.type_id,
                            index,
                        }
                        .into())
                    }
                }
            }
        }
        Ok(())
    }

    fn read_field(
        &self,
        type_id: ObjectTypeId,
        slot: FieldSlot,
        reader: &mut BitReader<'_>,
    ) -> CodecResult<FieldValue> {
        let info = type_id.info();
        Ok(match slot {
            FieldSlot::Team => {
                let raw = reader.read_bits(TEAM_BITS)? as u8;
                FieldValue::Team(Team::from_wire(raw)?)
            }
            FieldSlot::Geometry => {
                FieldValue::Geometry(self.geometry.decode(reader, info.geometry)?)
            }
            FieldSlot::Scalar(index) => {
                let def = info
                    .scalars
                    .get(index)
                    .ok_or(model::ModelError::UnknownScalar { type_id, index })?;
                let value = match def.codec {
                    ScalarCodec::Bool => ScalarValue::Bool(reader.read_bool()?),
                    ScalarCodec::UnitFloat { bits } => {
                        ScalarValue::Float(reader.read_unit_float(bits)?)
                    }
                };
                FieldValue::Scalar(index, value)
            }
        })
    }
}
