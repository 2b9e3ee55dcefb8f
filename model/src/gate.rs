//! Collision/team gate: decides whether a zone overlap has an effect.

use crate::context::{GameContext, HostAuthority};
use crate::object::NetworkObject;
use crate::team::Team;
use crate::types::ObjectTypeId;

/// Result of the overlap policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectDecision {
    NoEffect,
    ApplyZoneEffect,
}

/// The parts of the overlapping object the policy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapSubject {
    pub team: Team,
    pub is_ship: bool,
}

impl OverlapSubject {
    #[must_use]
    pub fn of(object: &NetworkObject) -> Self {
        Self {
            team: object.team(),
            is_ship: object.info().capabilities.is_ship(),
        }
    }
}

/// Overlap policy. Neutral zones affect every ship-capable object, team zones
/// affect ship-capable objects of the same team. Everything else, including
/// hostile zones, has no effect.
#[must_use]
pub const fn on_overlap(zone_team: Team, subject: OverlapSubject) -> EffectDecision {
    if !subject.is_ship {
        return EffectDecision::NoEffect;
    }
    if zone_team.is_neutral() {
        return EffectDecision::ApplyZoneEffect;
    }
    if zone_team.is_playable() && zone_team.index() == subject.team.index() {
        return EffectDecision::ApplyZoneEffect;
    }
    EffectDecision::NoEffect
}

/// Gate result tagged with where it was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Computed on the host; carries the token needed to apply the effect.
    Authoritative {
        decision: EffectDecision,
        authority: HostAuthority,
    },
    /// Computed on an observer from shadow state. Prediction only.
    Predicted { decision: EffectDecision },
}

impl GateOutcome {
    #[must_use]
    pub const fn decision(&self) -> EffectDecision {
        match *self {
            Self::Authoritative { decision, .. } | Self::Predicted { decision } => decision,
        }
    }
}

/// Evaluates an overlap between `zone` and `other` in the given context.
/// Non-zone objects never have an effect.
#[must_use]
pub fn evaluate(ctx: &GameContext, zone: &NetworkObject, other: &NetworkObject) -> GateOutcome {
    let decision = if zone.info().capabilities.is_zone() {
        on_overlap(zone.team(), OverlapSubject::of(other))
    } else {
        EffectDecision::NoEffect
    };
    match ctx.authority() {
        Some(authority) => GateOutcome::Authoritative {
            decision,
            authority,
        },
        None => GateOutcome::Predicted { decision },
    }
}

/// What applying a zone does to the overlapping ship.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneEffect {
    /// Ship `slip` is set to the zone's slip amount.
    Slip { amount: f32 },
    /// Ship `in_loadout` is set.
    Loadout,
    /// Ship entered a goal; scoring is left to game rules.
    Goal { team: Team },
}

/// The effect a zone object carries, or `None` for non-zones.
#[must_use]
pub fn zone_effect(zone: &NetworkObject) -> Option<ZoneEffect> {
    match zone.type_id() {
        ObjectTypeId::SlipZone => zone
            .scalar_by_name("slip_amount")
            .and_then(|v| v.as_float())
            .map(|amount| ZoneEffect::Slip { amount }),
        ObjectTypeId::LoadoutZone => Some(ZoneEffect::Loadout),
        ObjectTypeId::GoalZone => Some(ZoneEffect::Goal { team: zone.team() }),
        ObjectTypeId::Ship => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn ship(team: i8) -> OverlapSubject {
        OverlapSubject {
            team: Team::new(team),
            is_ship: true,
        }
    }

    #[test]
    fn neutral_zone_affects_any_ship() {
        for team in [-2, -1, 0, 1, 5] {
            assert_eq!(
                on_overlap(Team::NEUTRAL, ship(team)),
                EffectDecision::ApplyZoneEffect
            );
        }
    }

    #[test]
    fn team_zone_requires_same_team() {
        assert_eq!(on_overlap(Team::new(2), ship(3)), EffectDecision::NoEffect);
        assert_eq!(
            on_overlap(Team::new(2), ship(2)),
            EffectDecision::ApplyZoneEffect
        );
    }

    #[test]
    fn hostile_zone_and_non_ships_have_no_effect() {
        assert_eq!(on_overlap(Team::HOSTILE, ship(-2)), EffectDecision::NoEffect);
        let rock = OverlapSubject {
            team: Team::NEUTRAL,
            is_ship: false,
        };
        assert_eq!(on_overlap(Team::NEUTRAL, rock), EffectDecision::NoEffect);
    }

    #[test]
    fn evaluate_tags_side() {
        let zone = NetworkObject::new(
            ObjectTypeId::SlipZone,
            Team::NEUTRAL,
            vec![Point::ZERO, Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
        )
        .unwrap();
        let target =
            NetworkObject::new(ObjectTypeId::Ship, Team::new(1), vec![Point::ZERO]).unwrap();

        let host = GameContext::host(2, 0).unwrap();
        assert!(matches!(
            evaluate(&host, &zone, &target),
            GateOutcome::Authoritative {
                decision: EffectDecision::ApplyZoneEffect,
                ..
            }
        ));

        let observer = GameContext::observer(2, 0).unwrap();
        assert_eq!(
            evaluate(&observer, &zone, &target),
            GateOutcome::Predicted {
                decision: EffectDecision::ApplyZoneEffect
            }
        );
    }

    #[test]
    fn ship_as_zone_has_no_effect() {
        let a = NetworkObject::new(ObjectTypeId::Ship, Team::NEUTRAL, vec![Point::ZERO]).unwrap();
        let host = GameContext::host(2, 0).unwrap();
        assert_eq!(evaluate(&host, &a, &a).decision(), EffectDecision::NoEffect);
        assert_eq!(zone_effect(&a), None);
    }
}
