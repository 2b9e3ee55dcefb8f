//! Level construction context.

use model::GameContext;

/// Default world units per level grid step.
pub const DEFAULT_GRID_SIZE: f32 = 255.0;

/// Teams assumed when a level declares none.
pub const DEFAULT_TEAM_COUNT: u8 = 2;

/// Settings that shape how level arguments become objects.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelContext {
    /// Level coordinates are multiplied by this before quantization.
    pub grid_size: f32,
    /// Number of playable teams; team arguments are validated against it.
    pub team_count: u8,
    /// Fractional bits of the coordinate grid geometry is snapped to.
    pub precision_bits: u8,
}

impl LevelContext {
    #[must_use]
    pub const fn new(grid_size: f32, team_count: u8, precision_bits: u8) -> Self {
        Self {
            grid_size,
            team_count,
            precision_bits,
        }
    }

    #[must_use]
    pub const fn with_grid_size(mut self, grid_size: f32) -> Self {
        self.grid_size = grid_size;
        self
    }

    #[must_use]
    pub const fn with_team_count(mut self, team_count: u8) -> Self {
        self.team_count = team_count;
        self
    }

    /// Context where level coordinates are world units.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self::new(1.0, DEFAULT_TEAM_COUNT, 2)
    }
}

impl Default for LevelContext {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE, DEFAULT_TEAM_COUNT, 2)
    }
}

impl From<&GameContext> for LevelContext {
    fn from(ctx: &GameContext) -> Self {
        Self::new(DEFAULT_GRID_SIZE, ctx.team_count(), ctx.precision_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_game_context_keeps_session_settings() {
        let game = GameContext::host(4, 3).unwrap();
        let ctx = LevelContext::from(&game);
        assert_eq!(ctx.team_count, 4);
        assert_eq!(ctx.precision_bits, 3);
        assert_eq!(ctx.grid_size, DEFAULT_GRID_SIZE);
    }

    #[test]
    fn builders_override() {
        let ctx = LevelContext::default().with_grid_size(10.0).with_team_count(5);
        assert_eq!(ctx.grid_size, 10.0);
        assert_eq!(ctx.team_count, 5);
    }
}
