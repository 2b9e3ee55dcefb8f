//! Replicated object model for ghostwire.
//!
//! This crate defines what gets replicated and the rules around it:
//! - Object type tables (capabilities, geometry kind, scalar fields)
//! - Teams, points and the coordinate quantization grid
//! - Per-field update masks and ghost flags
//! - The collision/team gate and the host authority token
//! - A deterministic protocol hash over the type table
//! - A read-only method registry for scripting front ends
//!
//! # Design Principles
//!
//! - **Composition over inheritance** - One object struct, behavior selected by type tables.
//! - **Explicit context** - Session state travels in a [`GameContext`], never in globals.
//! - **Structural authority** - Zone effects need a [`HostAuthority`] only a host context issues.

mod context;
mod error;
mod gate;
mod geometry;
mod hash;
mod mask;
mod object;
mod script;
mod team;
mod types;

pub use context::{GameContext, HostAuthority, Side};
pub use error::{ModelError, ModelResult};
pub use gate::{evaluate, on_overlap, zone_effect, EffectDecision, GateOutcome, OverlapSubject, ZoneEffect};
pub use geometry::{
    centroid, coord_bits, coord_range, dequantize_coord, quantize_coord, snap_coord, GeometryKind,
    Point, COORD_INTEGER_BITS, MAX_POINTS, MAX_PRECISION_BITS, POINT_COUNT_BITS,
};
pub use hash::protocol_hash;
pub use mask::{canonical_slots, FieldSlot, UpdateMask};
pub use object::{GhostFlags, NetworkObject, ObjectState};
pub use script::{MethodRegistry, ScriptFn, ScriptValue};
pub use team::{Team, MAX_TEAMS, TEAM_BITS};
pub use types::{
    Capabilities, ObjectTypeId, ScalarCodec, ScalarDef, ScalarValue, TeamSource, TypeInfo,
    TYPE_ID_BITS,
};
