//! Object type tables.
//!
//! Every replicated object is a [`NetworkObject`](crate::NetworkObject) whose
//! behavior is selected by an [`ObjectTypeId`]. Each id maps to a static
//! [`TypeInfo`] describing capabilities, geometry, scalar fields and the
//! level-file construction rules. Field order on the wire follows this table.

use std::fmt;

use bitstream::bits_required;

use crate::error::{ModelError, ModelResult};
use crate::geometry::GeometryKind;

/// Width of the type id on the wire.
pub const TYPE_ID_BITS: u8 = 4;

/// Object type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ObjectTypeId {
    SlipZone = 0,
    LoadoutZone = 1,
    GoalZone = 2,
    Ship = 3,
}

impl ObjectTypeId {
    /// All types in canonical order.
    pub const ALL: [Self; 4] = [Self::SlipZone, Self::LoadoutZone, Self::GoalZone, Self::Ship];

    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    pub fn from_raw(raw: u8) -> ModelResult<Self> {
        Self::ALL
            .get(usize::from(raw))
            .copied()
            .ok_or(ModelError::UnknownTypeId { raw })
    }

    /// Looks a type up by its level-file tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.info().tag == tag)
    }

    #[must_use]
    pub fn info(self) -> &'static TypeInfo {
        match self {
            Self::SlipZone => &SLIP_ZONE,
            Self::LoadoutZone => &LOADOUT_ZONE,
            Self::GoalZone => &GOAL_ZONE,
            Self::Ship => &SHIP,
        }
    }
}

impl fmt::Display for ObjectTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().tag)
    }
}

/// Capability set of an object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const IS_SHIP: u8 = 1 << 0;
    pub const HAS_TEAM: u8 = 1 << 1;
    pub const IS_ZONE: u8 = 1 << 2;

    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_ship(self) -> bool {
        self.0 & Self::IS_SHIP != 0
    }

    #[must_use]
    pub const fn has_team(self) -> bool {
        self.0 & Self::HAS_TEAM != 0
    }

    #[must_use]
    pub const fn is_zone(self) -> bool {
        self.0 & Self::IS_ZONE != 0
    }
}

/// How a scalar field is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarCodec {
    /// One bit.
    Bool,
    /// Float in `[0, 1]` quantized to `bits` bits.
    UnitFloat { bits: u8 },
}

impl ScalarCodec {
    /// Encoded width in bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bool => 1,
            Self::UnitFloat { bits } => bits,
        }
    }

    /// Snaps a value to this codec's grid. `None` if the value has the wrong
    /// type or is out of range.
    #[must_use]
    pub fn quantize(self, value: ScalarValue) -> Option<ScalarValue> {
        match (self, value) {
            (Self::Bool, ScalarValue::Bool(b)) => Some(ScalarValue::Bool(b)),
            (Self::UnitFloat { bits }, ScalarValue::Float(v)) => {
                if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                    return None;
                }
                let max = ((1u64 << bits) - 1) as f64;
                let q = (f64::from(v) * max).round();
                Some(ScalarValue::Float((q / max) as f32))
            }
            _ => None,
        }
    }

    /// Clamps a level-file number into this codec and quantizes it.
    #[must_use]
    pub fn coerce(self, value: f32) -> ScalarValue {
        match self {
            Self::Bool => ScalarValue::Bool(value != 0.0),
            Self::UnitFloat { .. } => {
                let v = if value.is_finite() {
                    value.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                self.quantize(ScalarValue::Float(v))
                    .unwrap_or(ScalarValue::Float(0.0))
            }
        }
    }
}

/// A scalar field value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarValue {
    Bool(bool),
    Float(f32),
}

impl ScalarValue {
    #[must_use]
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            Self::Float(_) => None,
        }
    }

    #[must_use]
    pub const fn as_float(self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(v),
            Self::Bool(_) => None,
        }
    }
}

/// Declaration of one scalar field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarDef {
    pub name: &'static str,
    pub codec: ScalarCodec,
    pub default: ScalarValue,
}

impl ScalarDef {
    /// Declared default on the codec grid.
    #[must_use]
    pub fn quantized_default(&self) -> ScalarValue {
        self.codec.quantize(self.default).unwrap_or(self.default)
    }
}

/// Where an object's team comes from at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamSource {
    /// Always neutral.
    Neutral,
    /// First positional level argument.
    FromArgs,
}

/// Static description of an object type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeInfo {
    pub id: ObjectTypeId,
    /// Level-file tag.
    pub tag: &'static str,
    pub capabilities: Capabilities,
    pub team_source: TeamSource,
    pub geometry: GeometryKind,
    pub scalars: &'static [ScalarDef],
    /// Minimum positional level arguments.
    pub min_args: usize,
    /// An odd positional count means the first scalar is given before the
    /// geometry. Only meaningful for types with a single scalar.
    pub leading_optional_scalar: bool,
    /// Default packing priority; higher goes first.
    pub priority: u8,
}

impl TypeInfo {
    /// Number of replicated fields: team, geometry and each scalar.
    #[must_use]
    pub const fn field_count(&self) -> usize {
        2 + self.scalars.len()
    }

    /// Default values for every scalar, in declaration order, snapped to
    /// their codecs.
    #[must_use]
    pub fn default_scalars(&self) -> Vec<ScalarValue> {
        self.scalars.iter().map(ScalarDef::quantized_default).collect()
    }

    /// Index of a scalar by name.
    #[must_use]
    pub fn scalar_index(&self, name: &str) -> Option<usize> {
        self.scalars.iter().position(|def| def.name == name)
    }
}

const _: () = assert!(bits_required(ObjectTypeId::ALL.len() as u64 - 1) <= TYPE_ID_BITS);

const UNIT_8: ScalarCodec = ScalarCodec::UnitFloat { bits: 8 };

static SLIP_ZONE: TypeInfo = TypeInfo {
    id: ObjectTypeId::SlipZone,
    tag: "SlipZone",
    capabilities: Capabilities::from_raw(Capabilities::IS_ZONE),
    team_source: TeamSource::Neutral,
    geometry: GeometryKind::Polygon,
    scalars: &[ScalarDef {
        name: "slip_amount",
        codec: UNIT_8,
        default: ScalarValue::Float(0.1),
    }],
    min_args: 6,
    leading_optional_scalar: true,
    priority: 1,
};

static LOADOUT_ZONE: TypeInfo = TypeInfo {
    id: ObjectTypeId::LoadoutZone,
    tag: "LoadoutZone",
    capabilities: Capabilities::from_raw(Capabilities::IS_ZONE | Capabilities::HAS_TEAM),
    team_source: TeamSource::FromArgs,
    geometry: GeometryKind::Polygon,
    scalars: &[],
    min_args: 7,
    leading_optional_scalar: false,
    priority: 1,
};

static GOAL_ZONE: TypeInfo = TypeInfo {
    id: ObjectTypeId::GoalZone,
    tag: "GoalZone",
    capabilities: Capabilities::from_raw(Capabilities::IS_ZONE | Capabilities::HAS_TEAM),
    team_source: TeamSource::FromArgs,
    geometry: GeometryKind::Polygon,
    scalars: &[ScalarDef {
        name: "has_flag",
        codec: ScalarCodec::Bool,
        default: ScalarValue::Bool(false),
    }],
    min_args: 7,
    leading_optional_scalar: false,
    priority: 2,
};

static SHIP: TypeInfo = TypeInfo {
    id: ObjectTypeId::Ship,
    tag: "Ship",
    capabilities: Capabilities::from_raw(Capabilities::IS_SHIP | Capabilities::HAS_TEAM),
    team_source: TeamSource::FromArgs,
    geometry: GeometryKind::Point,
    scalars: &[
        ScalarDef {
            name: "health",
            codec: UNIT_8,
            default: ScalarValue::Float(1.0),
        },
        ScalarDef {
            name: "slip",
            codec: UNIT_8,
            default: ScalarValue::Float(0.0),
        },
        ScalarDef {
            name: "in_loadout",
            codec: ScalarCodec::Bool,
            default: ScalarValue::Bool(false),
        },
    ],
    min_args: 3,
    leading_optional_scalar: false,
    priority: 3,
};
