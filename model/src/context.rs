//! Explicit game/session context.

use crate::error::{ModelError, ModelResult};
use crate::geometry::MAX_PRECISION_BITS;
use crate::team::MAX_TEAMS;

/// Which end of the connection this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// Owns canonical state.
    Host,
    /// Holds shadows and may only predict.
    Observer,
}

/// Proof that the caller runs on the authoritative host.
///
/// Only [`GameContext::authority`] on a host context hands one out. Zone
/// effects take it by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAuthority {
    _sealed: (),
}

/// Session state shared by the gate, level loader and registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameContext {
    side: Side,
    team_count: u8,
    precision_bits: u8,
}

impl GameContext {
    /// Context for the authoritative host.
    pub fn host(team_count: u8, precision_bits: u8) -> ModelResult<Self> {
        Self::new(Side::Host, team_count, precision_bits)
    }

    /// Context for an observing client.
    pub fn observer(team_count: u8, precision_bits: u8) -> ModelResult<Self> {
        Self::new(Side::Observer, team_count, precision_bits)
    }

    fn new(side: Side, team_count: u8, precision_bits: u8) -> ModelResult<Self> {
        if team_count > MAX_TEAMS {
            return Err(ModelError::InvalidTeamCount {
                team_count,
                max: MAX_TEAMS,
            });
        }
        if precision_bits > MAX_PRECISION_BITS {
            return Err(ModelError::InvalidPrecision {
                bits: precision_bits,
                max: MAX_PRECISION_BITS,
            });
        }
        Ok(Self {
            side,
            team_count,
            precision_bits,
        })
    }

    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self.side, Side::Host)
    }

    #[must_use]
    pub const fn team_count(&self) -> u8 {
        self.team_count
    }

    #[must_use]
    pub const fn precision_bits(&self) -> u8 {
        self.precision_bits
    }

    /// The host authority token; `None` on observers.
    #[must_use]
    pub const fn authority(&self) -> Option<HostAuthority> {
        match self.side {
            Side::Host => Some(HostAuthority { _sealed: () }),
            Side::Observer => None,
        }
    }
}
