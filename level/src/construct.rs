//! Entity construction from level arguments.
//!
//! Arguments are whitespace-separated tokens. A token whose first character
//! is alphabetic is an optional named parameter; none are defined yet, so
//! they are dropped before positional parsing. Positional arguments are read
//! in this order:
//!
//! 1. the team, for types whose team comes from the level;
//! 2. the leading scalar, for types that declare one and only when the
//!    remaining count is odd;
//! 3. coordinate pairs in grid units.
//!
//! A malformed number never fails construction; it falls back to the field's
//! default (neutral team, zero coordinate, declared scalar default).

use model::{quantize_coord, NetworkObject, ObjectTypeId, Point, Team, TeamSource};

use crate::context::LevelContext;
use crate::error::{ConstructionError, ConstructionResult};

/// Builds an object of type `tag` from raw level tokens.
pub fn parse<S: AsRef<str>>(
    tag: &str,
    tokens: &[S],
    ctx: &LevelContext,
) -> ConstructionResult<NetworkObject> {
    let type_id = ObjectTypeId::from_tag(tag).ok_or_else(|| ConstructionError::UnknownEntity {
        tag: tag.to_owned(),
    })?;
    let info = type_id.info();

    let positional = positional_args(tokens);
    if positional.len() < info.min_args {
        return Err(ConstructionError::InsufficientArguments {
            type_id,
            required: info.min_args,
            found: positional.len(),
        });
    }

    let mut args = positional.as_slice();
    let team = match (info.team_source, args.split_first()) {
        (TeamSource::FromArgs, Some((first, rest))) => {
            args = rest;
            parse_team(first, ctx.team_count)?
        }
        _ => Team::NEUTRAL,
    };

    let mut leading = None;
    if info.leading_optional_scalar && args.len() % 2 == 1 {
        if let (Some(def), Some((first, rest))) = (info.scalars.first(), args.split_first()) {
            leading = parse_number(first).map(|value| def.codec.coerce(value));
            args = rest;
        }
    }

    let geometry = read_polygon(args, info.geometry.max_points(), ctx)?;
    let mut object = NetworkObject::new(type_id, team, geometry)?;
    if let Some(value) = leading {
        object.set_scalar(0, value)?;
    }
    Ok(object)
}

/// Reads coordinate pairs into points, scaled by the grid size and snapped
/// to the coordinate grid. Reading stops after `max_points`; a trailing odd
/// coordinate is ignored.
///
/// A well-formed coordinate that lands outside the coordinate range after
/// scaling is an error; a malformed one reads as zero.
pub fn read_polygon<S: AsRef<str>>(
    tokens: &[S],
    max_points: usize,
    ctx: &LevelContext,
) -> ConstructionResult<Vec<Point>> {
    let pairs = tokens.chunks_exact(2);
    if let [odd] = pairs.remainder() {
        log::debug!("ignoring trailing coordinate {:?}", odd.as_ref());
    }
    let available = tokens.len() / 2;
    if available > max_points {
        log::warn!("geometry truncated to {max_points} of {available} points");
    }
    pairs
        .take(max_points)
        .map(|pair| {
            let x = read_coord(pair[0].as_ref(), ctx)?;
            let y = read_coord(pair[1].as_ref(), ctx)?;
            Ok(Point::new(x, y).snapped(ctx.precision_bits))
        })
        .collect()
}

/// Returns `true` for tokens reserved as optional named parameters.
#[must_use]
pub fn is_named_token(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_alphabetic)
}

fn positional_args<S: AsRef<str>>(tokens: &[S]) -> Vec<&str> {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .filter(|token| {
            if is_named_token(token) {
                log::debug!("ignoring named parameter {token:?}");
                return false;
            }
            !token.is_empty()
        })
        .collect()
}

fn parse_number(token: &str) -> Option<f32> {
    token.parse::<f32>().ok().filter(|value| value.is_finite())
}

fn read_coord(token: &str, ctx: &LevelContext) -> ConstructionResult<f32> {
    let Some(value) = parse_number(token) else {
        return Ok(0.0);
    };
    let scaled = value * ctx.grid_size;
    if quantize_coord(scaled, ctx.precision_bits).is_none() {
        return Err(ConstructionError::CoordinateOutOfRange {
            token: token.to_owned(),
        });
    }
    Ok(scaled)
}

fn parse_team(token: &str, team_count: u8) -> ConstructionResult<Team> {
    token.parse::<i32>().map_or_else(
        |_| {
            log::debug!("malformed team {token:?}, using neutral");
            Ok(Team::NEUTRAL)
        },
        |index| Team::from_index(index, team_count).map_err(ConstructionError::from),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{ScalarValue, MAX_POINTS};

    fn ctx() -> LevelContext {
        LevelContext::for_testing()
    }

    fn slip(object: &NetworkObject) -> f32 {
        object
            .scalar_by_name("slip_amount")
            .and_then(ScalarValue::as_float)
            .unwrap()
    }

    #[test]
    fn named_tokens_do_not_count() {
        let err = parse("SlipZone", &["3.5", "A100", "0,0", "10,0", "10,10"], &ctx()).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::InsufficientArguments {
                type_id: ObjectTypeId::SlipZone,
                required: 6,
                found: 4,
            }
        );
    }

    #[test]
    fn odd_count_leads_with_slip_amount() {
        let object = parse("SlipZone", &["0.5", "0", "0", "10", "0", "10", "10"], &ctx()).unwrap();
        assert!((slip(&object) - 0.5).abs() < 0.01);
        assert_eq!(
            object.geometry(),
            &[
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0)
            ]
        );
    }

    #[test]
    fn even_count_keeps_default_slip_amount() {
        let object = parse("SlipZone", &["0", "0", "10", "0", "10", "10"], &ctx()).unwrap();
        assert!((slip(&object) - 0.1).abs() < 0.01);
        assert_eq!(object.geometry().len(), 3);
        assert!(object.team().is_neutral());
    }

    #[test]
    fn slip_amount_is_clamped() {
        let object = parse("SlipZone", &["3.5", "0", "0", "1", "0", "1", "1"], &ctx()).unwrap();
        assert_eq!(slip(&object), 1.0);
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let object = parse("SlipZone", &["?", "0", "0", "x1", "1", "0", "1", "1"], &ctx());
        // "x1" is a named token, leaving 7 positional arguments.
        let object = object.unwrap();
        assert!((slip(&object) - 0.1).abs() < 0.01);

        let object = parse("LoadoutZone", &["-", "0", "0", "2,", "0", "2", "2"], &ctx()).unwrap();
        assert!(object.team().is_neutral());
        assert_eq!(object.geometry()[1], Point::new(0.0, 0.0));
    }

    #[test]
    fn team_comes_first_for_team_types() {
        let object = parse("GoalZone", &["1", "0", "0", "4", "0", "4", "4"], &ctx()).unwrap();
        assert_eq!(object.team(), Team::new(1));
        assert_eq!(object.geometry().len(), 3);
    }

    #[test]
    fn out_of_range_team_is_rejected() {
        let err = parse("LoadoutZone", &["5", "0", "0", "4", "0", "4", "4"], &ctx()).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::InvalidTeam {
                team: 5,
                team_count: 2
            }
        );
        let hostile = parse("LoadoutZone", &["-2", "0", "0", "4", "0", "4", "4"], &ctx()).unwrap();
        assert!(hostile.team().is_hostile());
    }

    #[test]
    fn ship_reads_a_single_point() {
        let object = parse("Ship", &["0", "2.5", "-3", "9", "9"], &ctx()).unwrap();
        assert_eq!(object.geometry(), &[Point::new(2.5, -3.0)]);
        assert!(matches!(
            parse("Ship", &["0", "1"], &ctx()),
            Err(ConstructionError::InsufficientArguments { required: 3, .. })
        ));
    }

    #[test]
    fn unknown_tag() {
        assert_eq!(
            parse("Turret", &["0"], &ctx()).unwrap_err(),
            ConstructionError::UnknownEntity {
                tag: "Turret".into()
            }
        );
    }

    #[test]
    fn polygon_scales_snaps_and_truncates() {
        let ctx = LevelContext::default();
        let points = read_polygon(&["0.1", "1", "2"], MAX_POINTS, &ctx).unwrap();
        // 0.1 * 255 = 25.5 is on the quarter grid; the odd "2" is dropped.
        assert_eq!(points, vec![Point::new(25.5, 255.0)]);

        let tokens: Vec<String> = (0..80).map(|i| i.to_string()).collect();
        let truncated = read_polygon(&tokens, MAX_POINTS, &LevelContext::for_testing()).unwrap();
        assert_eq!(truncated.len(), MAX_POINTS);

        let snapped = read_polygon(&["0.33", "0.9"], 1, &LevelContext::for_testing()).unwrap();
        assert_eq!(snapped, vec![Point::new(0.25, 1.0)]);
    }

    #[test]
    fn coordinates_past_the_grid_range_are_rejected() {
        let ctx = LevelContext::default();
        // 128 * 255 = 32640 still fits; 200 * 255 does not.
        let edge = read_polygon(&["128", "-128"], MAX_POINTS, &ctx).unwrap();
        assert_eq!(edge, vec![Point::new(32640.0, -32640.0)]);

        let err = read_polygon(&["0", "0", "200", "0"], MAX_POINTS, &ctx).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::CoordinateOutOfRange {
                token: "200".into()
            }
        );
        assert!(parse("LoadoutZone", &["0", "0", "0", "200", "0", "200", "200"], &ctx).is_err());

        // Malformed still means zero, never out of range.
        assert_eq!(
            read_polygon(&["1e99", "?"], MAX_POINTS, &ctx).unwrap(),
            vec![Point::ZERO]
        );
    }

    #[test]
    fn named_token_classification() {
        assert!(is_named_token("A100"));
        assert!(is_named_token("Speed=3"));
        assert!(!is_named_token("-3"));
        assert!(!is_named_token("0,0"));
        assert!(!is_named_token(""));
    }
}
