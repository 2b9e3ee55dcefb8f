//! Object replication for ghostwire: decide what to send, track what arrived.
//!
//! The host side is a [`Registry`]: it owns every replicated object, tracks a
//! ghost record per (object, connection) and packs per-connection update
//! packets within the configured budgets. The transport reports each packet
//! as delivered or dropped; dropped fields are resent with current values.
//!
//! The observer side is a [`ShadowStore`]: it decodes whole packets before
//! applying them and resolves reordering and duplication with per-field
//! last-writer-wins on packet sequence numbers.
//!
//! Zone effects can only be applied through [`Registry::apply_zone_effect`],
//! which takes the host authority token.

mod config;
mod error;
mod registry;
mod shadow;

pub use config::{ReplicationConfig, DEFAULT_TEAM_COUNT};
pub use error::{ReplicaError, ReplicaResult};
pub use registry::{
    ConnectionId, GhostState, OutgoingPacket, Registry, ScopeAll, ScopeQuery, SentRecord,
};
pub use shadow::{ApplyReport, ShadowStore};
