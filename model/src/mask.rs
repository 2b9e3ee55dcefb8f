//! Per-field dirty bits.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::types::TypeInfo;

/// One replicated field of an object, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldSlot {
    Team,
    Geometry,
    Scalar(usize),
}

impl FieldSlot {
    /// Position of this field in the canonical order.
    #[must_use]
    pub const fn bit_index(self) -> u32 {
        match self {
            Self::Team => 0,
            Self::Geometry => 1,
            Self::Scalar(i) => 2 + i as u32,
        }
    }

    #[must_use]
    pub const fn mask(self) -> UpdateMask {
        UpdateMask(1 << self.bit_index())
    }
}

/// Bitset of dirty fields: bit 0 team, bit 1 geometry, bit `2 + i` scalar `i`.
///
/// Masks only ever grow through `|`; bits leave a mask when the packer moves
/// them into an in-flight record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct UpdateMask(u32);

impl UpdateMask {
    pub const EMPTY: Self = Self(0);
    pub const TEAM: Self = FieldSlot::Team.mask();
    pub const GEOMETRY: Self = FieldSlot::Geometry.mask();

    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Bit for scalar `index`.
    #[must_use]
    pub const fn scalar(index: usize) -> Self {
        FieldSlot::Scalar(index).mask()
    }

    /// Every field of a type.
    #[must_use]
    pub const fn all_for(info: &TypeInfo) -> Self {
        Self((1u32 << info.field_count()) - 1)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Bits of `self` not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Set fields in canonical order, limited to the fields of `info`.
    pub fn slots(self, info: &TypeInfo) -> impl Iterator<Item = FieldSlot> + '_ {
        canonical_slots(info).filter(move |slot| self.contains(slot.mask()))
    }
}

/// All fields of a type in canonical order.
pub fn canonical_slots(info: &TypeInfo) -> impl Iterator<Item = FieldSlot> + '_ {
    [FieldSlot::Team, FieldSlot::Geometry]
        .into_iter()
        .chain((0..info.scalars.len()).map(FieldSlot::Scalar))
}

impl BitOr for UpdateMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for UpdateMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for UpdateMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for UpdateMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UpdateMask({:#b})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectTypeId;

    #[test]
    fn canonical_bit_layout() {
        assert_eq!(UpdateMask::TEAM.raw(), 0b1);
        assert_eq!(UpdateMask::GEOMETRY.raw(), 0b10);
        assert_eq!(UpdateMask::scalar(0).raw(), 0b100);
        assert_eq!(UpdateMask::scalar(2).raw(), 0b10000);
    }

    #[test]
    fn all_for_covers_type_fields() {
        let ship = ObjectTypeId::Ship.info();
        assert_eq!(UpdateMask::all_for(ship).raw(), 0b11111);
        let loadout = ObjectTypeId::LoadoutZone.info();
        assert_eq!(UpdateMask::all_for(loadout).raw(), 0b11);
    }

    #[test]
    fn union_never_loses_bits() {
        let mut mask = UpdateMask::TEAM;
        mask |= UpdateMask::scalar(1);
        mask |= UpdateMask::TEAM;
        assert!(mask.contains(UpdateMask::TEAM));
        assert!(mask.contains(UpdateMask::scalar(1)));
        assert_eq!(mask.count(), 2);
    }

    #[test]
    fn difference_and_intersects() {
        let mask = UpdateMask::TEAM | UpdateMask::GEOMETRY;
        assert_eq!(mask.difference(UpdateMask::TEAM), UpdateMask::GEOMETRY);
        assert!(mask.intersects(UpdateMask::GEOMETRY));
        assert!(!mask.intersects(UpdateMask::scalar(0)));
    }

    #[test]
    fn slots_in_canonical_order() {
        let ship = ObjectTypeId::Ship.info();
        let mask = UpdateMask::scalar(2) | UpdateMask::TEAM | UpdateMask::from_raw(1 << 20);
        let slots: Vec<_> = mask.slots(ship).collect();
        assert_eq!(slots, vec![FieldSlot::Team, FieldSlot::Scalar(2)]);
    }
}
