//! Deterministic protocol hashing.

use blake3::Hasher;

use crate::geometry::{GeometryKind, COORD_INTEGER_BITS, MAX_POINTS, POINT_COUNT_BITS};
use crate::team::TEAM_BITS;
use crate::types::{ObjectTypeId, ScalarCodec, TeamSource, TYPE_ID_BITS};

/// Hash of everything that fixes the wire layout: the type table in
/// canonical order, field widths and the coordinate precision.
#[must_use]
pub fn protocol_hash(precision_bits: u8) -> u64 {
    let mut hasher = Hasher::new();
    write_u8(&mut hasher, TYPE_ID_BITS);
    write_u8(&mut hasher, TEAM_BITS);
    write_u8(&mut hasher, POINT_COUNT_BITS);
    write_u8(&mut hasher, COORD_INTEGER_BITS);
    write_u8(&mut hasher, precision_bits);
    write_u32(&mut hasher, MAX_POINTS as u32);
    write_u32(&mut hasher, ObjectTypeId::ALL.len() as u32);

    for id in ObjectTypeId::ALL {
        let info = id.info();
        write_u8(&mut hasher, id.raw());
        write_u8(&mut hasher, info.capabilities.raw());
        write_u8(
            &mut hasher,
            match info.team_source {
                TeamSource::Neutral => 0,
                TeamSource::FromArgs => 1,
            },
        );
        write_u8(
            &mut hasher,
            match info.geometry {
                GeometryKind::Polygon => 0,
                GeometryKind::Point => 1,
            },
        );
        write_u32(&mut hasher, info.scalars.len() as u32);
        for def in info.scalars {
            match def.codec {
                ScalarCodec::Bool => write_u8(&mut hasher, 0),
                ScalarCodec::UnitFloat { bits } => {
                    write_u8(&mut hasher, 1);
                    write_u8(&mut hasher, bits);
                }
            }
        }
    }

    let hash = hasher.finalize();
    let mut first = [0u8; 8];
    first.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(first)
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}
