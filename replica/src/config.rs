//! Registry configuration.

use codec::CodecLimits;
use model::{GameContext, MAX_TEAMS};
use wire::Limits;

/// Playable teams when no game context says otherwise.
pub const DEFAULT_TEAM_COUNT: u8 = 2;

/// Configuration for a [`Registry`](crate::Registry) and the matching
/// [`ShadowStore`](crate::ShadowStore).
///
/// Host and observers must agree on `precision_bits`; it feeds the protocol
/// hash carried by every packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReplicationConfig {
    /// Fractional bits of quantized coordinates.
    pub precision_bits: u8,
    /// Playable teams; object teams must be below this, neutral or hostile.
    pub team_count: u8,
    pub wire_limits: Limits,
    pub codec_limits: CodecLimits,
    /// Hard cap on registered objects.
    pub max_objects: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            precision_bits: 2,
            team_count: DEFAULT_TEAM_COUNT,
            wire_limits: Limits::default(),
            codec_limits: CodecLimits::default(),
            max_objects: 4096,
        }
    }
}

impl ReplicationConfig {
    /// Small packets and entry counts, so budgeting paths run in tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            precision_bits: 2,
            team_count: MAX_TEAMS,
            wire_limits: Limits::for_testing(),
            codec_limits: CodecLimits::for_testing(),
            max_objects: 256,
        }
    }

    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            precision_bits: 8,
            team_count: MAX_TEAMS,
            wire_limits: Limits::unlimited(),
            codec_limits: CodecLimits::unlimited(),
            max_objects: usize::MAX,
        }
    }

    #[must_use]
    pub fn with_team_count(mut self, team_count: u8) -> Self {
        self.team_count = team_count;
        self
    }
}

/// Default limits, with the precision and team count of the running game.
impl From<&GameContext> for ReplicationConfig {
    fn from(ctx: &GameContext) -> Self {
        Self {
            precision_bits: ctx.precision_bits(),
            team_count: ctx.team_count(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fits_a_datagram() {
        let config = ReplicationConfig::default();
        assert_eq!(config.wire_limits.max_packet_bytes, 1400);
        assert!(config.precision_bits <= model::MAX_PRECISION_BITS);
    }

    #[test]
    fn testing_limits_are_tighter() {
        let testing = ReplicationConfig::for_testing();
        let default = ReplicationConfig::default();
        assert!(testing.wire_limits.max_packet_bytes < default.wire_limits.max_packet_bytes);
        assert!(testing.codec_limits.max_creates < default.codec_limits.max_creates);
    }

    #[test]
    fn context_sets_precision_and_teams() {
        let ctx = GameContext::host(6, 4).unwrap();
        let config = ReplicationConfig::from(&ctx);
        assert_eq!(config.precision_bits, 4);
        assert_eq!(config.team_count, 6);
        assert_eq!(config.max_objects, ReplicationConfig::default().max_objects);
    }
}
