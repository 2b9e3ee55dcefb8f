//! Geometry, field delta and update packet encoding for ghostwire.
//!
//! This crate ties together `bitstream`, `wire` and `model`:
//!
//! - [`GeometryCodec`] packs point lists onto a fixed-point grid.
//! - [`FieldEncoder`] writes full object states and flagged field deltas.
//! - [`UpdateCodec`] builds budgeted update packets and decodes them as a
//!   unit, so a malformed packet is never partially applied.
//!
//! The codec knows nothing about connections or acknowledgements; that lives
//! in the `replica` crate.

mod error;
mod fields;
mod geometry;
mod limits;
mod packet;
mod types;

pub use error::{CodecError, CodecResult, LimitKind};
pub use fields::{FieldDelta, FieldEncoder, FieldValue, ObjectView};
pub use geometry::GeometryCodec;
pub use limits::CodecLimits;
pub use packet::{CreateEntry, DecodedPacket, PacketBuilder, UpdateCodec, UpdateEntry};
pub use types::ObjectId;
pub use wire::Limits as WireLimits;
