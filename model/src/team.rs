//! Team identifiers.

use std::fmt;

use crate::error::{ModelError, ModelResult};

/// Maximum number of playable teams. `team + 2` must fit in [`TEAM_BITS`].
pub const MAX_TEAMS: u8 = 14;

/// Width of the team field on the wire.
pub const TEAM_BITS: u8 = 4;

/// A team index, or one of the neutral/hostile sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Team(i8);

impl Team {
    /// Affects everybody.
    pub const NEUTRAL: Self = Self(-1);

    /// Affects nobody.
    pub const HOSTILE: Self = Self(-2);

    /// Creates a team from a raw index. Not validated.
    #[must_use]
    pub const fn new(index: i8) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> i8 {
        self.0
    }

    #[must_use]
    pub const fn is_neutral(self) -> bool {
        self.0 == Self::NEUTRAL.0
    }

    #[must_use]
    pub const fn is_hostile(self) -> bool {
        self.0 == Self::HOSTILE.0
    }

    /// Returns `true` for a playable team index (not a sentinel).
    #[must_use]
    pub const fn is_playable(self) -> bool {
        self.0 >= 0
    }

    /// Parses a team from a level-file integer.
    pub fn from_index(index: i32, team_count: u8) -> ModelResult<Self> {
        let team = i8::try_from(index).map_err(|_| ModelError::InvalidTeam {
            team: index,
            team_count,
        })?;
        Self(team).validate(team_count)
    }

    /// Checks the team against the number of declared teams.
    pub fn validate(self, team_count: u8) -> ModelResult<Self> {
        let ok = self.is_neutral()
            || self.is_hostile()
            || (self.is_playable() && (self.0 as u8) < team_count.min(MAX_TEAMS));
        if ok {
            Ok(self)
        } else {
            Err(ModelError::InvalidTeam {
                team: i32::from(self.0),
                team_count,
            })
        }
    }

    /// Wire representation (`team + 2`).
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        (self.0 as i16 + 2) as u8
    }

    /// Inverse of [`to_wire`](Self::to_wire).
    pub fn from_wire(raw: u8) -> ModelResult<Self> {
        if raw >= 1 << TEAM_BITS {
            return Err(ModelError::InvalidTeam {
                team: i32::from(raw) - 2,
                team_count: MAX_TEAMS,
            });
        }
        Ok(Self(raw as i8 - 2))
    }

    /// Returns `true` if the team can be carried in [`TEAM_BITS`].
    #[must_use]
    pub const fn fits_wire(self) -> bool {
        self.0 >= -2 && self.0 < MAX_TEAMS as i8
    }
}

impl Default for Team {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NEUTRAL => write!(f, "neutral"),
            Self::HOSTILE => write!(f, "hostile"),
            Self(index) => write!(f, "team {index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels() {
        assert!(Team::NEUTRAL.is_neutral());
        assert!(Team::HOSTILE.is_hostile());
        assert!(!Team::NEUTRAL.is_playable());
        assert!(Team::new(0).is_playable());
    }

    #[test]
    fn validate_against_team_count() {
        assert!(Team::new(1).validate(2).is_ok());
        assert!(Team::NEUTRAL.validate(2).is_ok());
        assert!(Team::HOSTILE.validate(0).is_ok());
        assert_eq!(
            Team::new(2).validate(2),
            Err(ModelError::InvalidTeam {
                team: 2,
                team_count: 2
            })
        );
        assert!(Team::new(-3).validate(2).is_err());
    }

    #[test]
    fn from_index_rejects_wide_values() {
        assert!(Team::from_index(300, 4).is_err());
        assert_eq!(Team::from_index(-1, 4).unwrap(), Team::NEUTRAL);
    }

    #[test]
    fn wire_mapping() {
        assert_eq!(Team::HOSTILE.to_wire(), 0);
        assert_eq!(Team::NEUTRAL.to_wire(), 1);
        assert_eq!(Team::new(13).to_wire(), 15);
        for raw in 0..16u8 {
            assert_eq!(Team::from_wire(raw).unwrap().to_wire(), raw);
        }
        assert!(Team::from_wire(16).is_err());
        assert!(!Team::new(14).fits_wire());
    }

    #[test]
    fn display() {
        assert_eq!(Team::NEUTRAL.to_string(), "neutral");
        assert_eq!(Team::new(3).to_string(), "team 3");
    }
}
