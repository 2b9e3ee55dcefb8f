//! Replicated objects and their value snapshots.

use crate::error::{ModelError, ModelResult};
use crate::geometry::{centroid, Point};
use crate::mask::{FieldSlot, UpdateMask};
use crate::team::Team;
use crate::types::{ObjectTypeId, ScalarValue, TypeInfo};

/// Replication flags of an object.
///
/// `GHOSTABLE` can be set but there is no way to clear it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct GhostFlags(u8);

impl GhostFlags {
    /// Object exists as shadows on observers.
    pub const GHOSTABLE: u8 = 1 << 0;
    /// Object is in scope for every connection.
    pub const SCOPE_ALWAYS: u8 = 1 << 1;

    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_ghostable(self) -> bool {
        self.0 & Self::GHOSTABLE != 0
    }

    #[must_use]
    pub const fn is_scope_always(self) -> bool {
        self.0 & Self::SCOPE_ALWAYS != 0
    }
}

/// Value snapshot of an object's replicated fields.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectState {
    pub type_id: ObjectTypeId,
    pub team: Team,
    pub geometry: Vec<Point>,
    pub scalars: Vec<ScalarValue>,
}

impl ObjectState {
    /// Checks geometry and scalars against the type table.
    pub fn validate(&self) -> ModelResult<()> {
        let info = self.type_id.info();
        info.geometry.validate(&self.geometry)?;
        if self.scalars.len() != info.scalars.len() {
            return Err(ModelError::ScalarCount {
                type_id: self.type_id,
                expected: info.scalars.len(),
                actual: self.scalars.len(),
            });
        }
        for (index, value) in self.scalars.iter().enumerate() {
            check_scalar(info, index, *value)?;
        }
        Ok(())
    }

    /// Bit set of fields that differ from `other`. Types must match.
    #[must_use]
    pub fn changed_fields(&self, other: &Self) -> UpdateMask {
        let mut mask = UpdateMask::EMPTY;
        if self.type_id != other.type_id {
            return UpdateMask::all_for(self.type_id.info());
        }
        if self.team != other.team {
            mask |= UpdateMask::TEAM;
        }
        if self.geometry != other.geometry {
            mask |= UpdateMask::GEOMETRY;
        }
        for (index, (a, b)) in self.scalars.iter().zip(&other.scalars).enumerate() {
            if a != b {
                mask |= UpdateMask::scalar(index);
            }
        }
        mask
    }
}

/// An entity participating in replication.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkObject {
    type_id: ObjectTypeId,
    team: Team,
    geometry: Vec<Point>,
    scalars: Vec<ScalarValue>,
    ghost_flags: GhostFlags,
    /// Packing priority; higher is packed first.
    pub priority: u8,
}

impl NetworkObject {
    /// Creates an object with default scalars.
    pub fn new(type_id: ObjectTypeId, team: Team, geometry: Vec<Point>) -> ModelResult<Self> {
        let info = type_id.info();
        info.geometry.validate(&geometry)?;
        if !team.fits_wire() {
            return Err(ModelError::InvalidTeam {
                team: i32::from(team.index()),
                team_count: crate::MAX_TEAMS,
            });
        }
        Ok(Self {
            type_id,
            team,
            geometry,
            scalars: info.default_scalars(),
            ghost_flags: GhostFlags::default(),
            priority: info.priority,
        })
    }

    /// Builds an object from a snapshot.
    pub fn from_state(state: ObjectState) -> ModelResult<Self> {
        state.validate()?;
        let mut object = Self::new(state.type_id, state.team, state.geometry)?;
        object.scalars = state.scalars;
        Ok(object)
    }

    #[must_use]
    pub const fn type_id(&self) -> ObjectTypeId {
        self.type_id
    }

    #[must_use]
    pub fn info(&self) -> &'static TypeInfo {
        self.type_id.info()
    }

    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    #[must_use]
    pub fn geometry(&self) -> &[Point] {
        &self.geometry
    }

    #[must_use]
    pub fn scalars(&self) -> &[ScalarValue] {
        &self.scalars
    }

    #[must_use]
    pub fn scalar(&self, index: usize) -> Option<ScalarValue> {
        self.scalars.get(index).copied()
    }

    #[must_use]
    pub fn scalar_by_name(&self, name: &str) -> Option<ScalarValue> {
        self.info()
            .scalar_index(name)
            .and_then(|index| self.scalar(index))
    }

    /// Vertex average of the geometry.
    #[must_use]
    pub fn location(&self) -> Point {
        centroid(&self.geometry)
    }

    #[must_use]
    pub const fn ghost_flags(&self) -> GhostFlags {
        self.ghost_flags
    }

    /// Sets `GHOSTABLE`. Called when the object is added to the game.
    pub fn mark_ghostable(&mut self) {
        self.ghost_flags.0 |= GhostFlags::GHOSTABLE;
    }

    pub fn set_scope_always(&mut self, enabled: bool) {
        if enabled {
            self.ghost_flags.0 |= GhostFlags::SCOPE_ALWAYS;
        } else {
            self.ghost_flags.0 &= !GhostFlags::SCOPE_ALWAYS;
        }
    }

    /// Sets the team. Returns the dirty bit, empty if nothing changed.
    pub fn set_team(&mut self, team: Team) -> ModelResult<UpdateMask> {
        if !team.fits_wire() {
            return Err(ModelError::InvalidTeam {
                team: i32::from(team.index()),
                team_count: crate::MAX_TEAMS,
            });
        }
        Ok(replace_if_changed(&mut self.team, team, FieldSlot::Team))
    }

    /// Replaces the geometry. Returns the dirty bit, empty if nothing changed.
    pub fn set_geometry(&mut self, geometry: Vec<Point>) -> ModelResult<UpdateMask> {
        self.info().geometry.validate(&geometry)?;
        Ok(replace_if_changed(
            &mut self.geometry,
            geometry,
            FieldSlot::Geometry,
        ))
    }

    /// Sets scalar `index`, quantized to its codec.
    pub fn set_scalar(&mut self, index: usize, value: ScalarValue) -> ModelResult<UpdateMask> {
        let value = check_scalar(self.info(), index, value)?;
        let slot = &mut self.scalars[index];
        Ok(replace_if_changed(slot, value, FieldSlot::Scalar(index)))
    }

    /// Snapshot of the replicated fields.
    #[must_use]
    pub fn state(&self) -> ObjectState {
        ObjectState {
            type_id: self.type_id,
            team: self.team,
            geometry: self.geometry.clone(),
            scalars: self.scalars.clone(),
        }
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T, field: FieldSlot) -> UpdateMask {
    if *slot == value {
        UpdateMask::EMPTY
    } else {
        *slot = value;
        field.mask()
    }
}

/// Validates and quantizes a scalar against its declaration.
fn check_scalar(info: &TypeInfo, index: usize, value: ScalarValue) -> ModelResult<ScalarValue> {
    let def = info.scalars.get(index).ok_or(ModelError::UnknownScalar {
        type_id: info.id,
        index,
    })?;
    let same_kind = matches!(
        (def.default, value),
        (ScalarValue::Bool(_), ScalarValue::Bool(_)) | (ScalarValue::Float(_), ScalarValue::Float(_))
    );
    if !same_kind {
        return Err(ModelError::ScalarTypeMismatch {
            type_id: info.id,
            index,
        });
    }
    def.codec.quantize(value).ok_or(ModelError::ScalarOutOfRange {
        type_id: info.id,
        index,
    })
}
